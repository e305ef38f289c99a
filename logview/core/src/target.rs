//! Log Target
//!
//! The immutable tuple that fully determines what is being streamed right
//! now, and its pure translation into the streaming endpoint's query.

use reqwest::Url;

use crate::selection::Selection;
use crate::transport::TransportError;

/// What to stream right now
///
/// Derived from the viewer props and the selection state; never stored as
/// a source of truth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogTarget {
    /// Cluster context
    pub context_id: String,
    /// Namespace scope
    pub namespace: String,
    /// Selected pods
    pub pods: Selection,
    /// Selected containers
    pub containers: Selection,
    /// Label selector for a dynamic (controller-owned) pod set
    pub group_selector: Option<String>,
    /// Ask the server to prepend timestamps
    pub show_timestamps: bool,
    /// Ask the server to prefix lines with their source
    pub show_source_prefix: bool,
}

impl LogTarget {
    /// A target is valid iff both pods and containers are non-empty
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.pods.is_empty() && !self.containers.is_empty()
    }

    /// Derive the streaming endpoint query
    #[must_use]
    pub fn query(&self) -> StreamQuery {
        StreamQuery::from_target(self)
    }

    /// Containers the stream is scoped to
    ///
    /// A change here restarts the stream on a fresh surface.
    #[must_use]
    pub fn container_set(&self) -> &Selection {
        &self.containers
    }
}

/// Query parameters for the streaming endpoint
///
/// Parameter order is fixed: `context`, `namespace`, `pod`, `container`,
/// `timestamps`, `prefix`, then `selector` when one is set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamQuery {
    pairs: Vec<(&'static str, String)>,
}

impl StreamQuery {
    /// Build the query for a target
    #[must_use]
    pub fn from_target(target: &LogTarget) -> Self {
        let mut pairs = vec![
            ("context", target.context_id.clone()),
            ("namespace", target.namespace.clone()),
            ("pod", target.pods.to_wire()),
            ("container", target.containers.to_wire()),
            ("timestamps", target.show_timestamps.to_string()),
            ("prefix", target.show_source_prefix.to_string()),
        ];
        if let Some(selector) = target.group_selector.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("selector", selector.to_string()));
        }
        Self { pairs }
    }

    /// All parameters in wire order
    #[must_use]
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    /// Look up a parameter value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attach the query to the streaming endpoint URL
    pub fn to_url(&self, endpoint: &str) -> Result<Url, TransportError> {
        Url::parse_with_params(endpoint, self.pairs.iter().map(|(k, v)| (*k, v.as_str())))
            .map_err(|e| TransportError::InvalidEndpoint(format!("{endpoint}: {e}")))
    }
}
