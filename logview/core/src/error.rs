//! Crate-level error type

use thiserror::Error;

use crate::config::ConfigError;
use crate::discovery::DiscoveryError;
use crate::transport::TransportError;

/// Any error the viewer can hand back to a caller
#[derive(Debug, Error)]
pub enum LogviewError {
    /// Configuration could not be loaded or is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A transport could not be set up
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Pod discovery failed
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}
