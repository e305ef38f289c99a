//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

use logview_core::{ConfigOverrides, PodInfo, ViewerProps};

/// logview - live logs from one or many pods
#[derive(Parser, Debug, Clone)]
#[command(name = "logview")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Cluster context
    #[arg(long, env = "LOGVIEW_CONTEXT", default_value = "default")]
    pub context: String,

    /// Namespace
    #[arg(short = 'n', long, env = "LOGVIEW_NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Pod to stream (repeatable); omit to discover pods
    #[arg(short = 'p', long = "pod", value_name = "NAME[:STATUS]", value_parser = parse_pod)]
    pub pods: Vec<PodInfo>,

    /// Regular container (repeatable); omit to discover containers
    #[arg(short = 'c', long = "container", value_name = "NAME")]
    pub containers: Vec<String>,

    /// Init container (repeatable)
    #[arg(long = "init-container", value_name = "NAME")]
    pub init_containers: Vec<String>,

    /// Label selector of a controller-owned pod set
    #[arg(short = 'l', long, value_name = "SELECTOR")]
    pub selector: Option<String>,

    /// Show the pod picker
    #[arg(long)]
    pub pod_picker: bool,

    /// Title of the log pane
    #[arg(long, default_value = "Logs")]
    pub title: String,

    /// WebSocket endpoint of the log multiplexer
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Base URL of the pod listing API
    #[arg(long, value_name = "URL")]
    pub api_base: Option<String>,

    /// Connection timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub connect_timeout_ms: Option<u64>,

    /// Start with timestamps on
    #[arg(long)]
    pub timestamps: bool,

    /// Start with line wrapping on
    #[arg(long)]
    pub wrap: bool,

    /// Configuration file path
    #[arg(long, env = "LOGVIEW_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write logs to this file (nothing is logged otherwise)
    #[arg(long, env = "LOGVIEW_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOGVIEW_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

fn parse_pod(value: &str) -> Result<PodInfo, String> {
    let (name, status) = match value.split_once(':') {
        Some((name, status)) => (name, Some(status)),
        None => (value, None),
    };
    if name.is_empty() {
        return Err(format!("invalid pod '{value}': name is empty"));
    }
    Ok(match status.filter(|s| !s.is_empty()) {
        Some(status) => PodInfo::new(name, status),
        None => PodInfo::named(name),
    })
}

impl Args {
    /// Viewer props described by the arguments
    #[must_use]
    pub fn props(&self) -> ViewerProps {
        let mut props = ViewerProps::new(&self.context, &self.namespace)
            .with_containers(self.containers.iter().cloned())
            .with_init_containers(self.init_containers.iter().cloned())
            .with_pod_selector(self.pod_picker)
            .with_title(&self.title);
        if !self.pods.is_empty() {
            props = props.with_pods(self.pods.clone());
        }
        if let Some(selector) = &self.selector {
            props = props.with_selector(selector);
        }
        props
    }

    /// Configuration overrides given on the command line
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(endpoint) = &self.endpoint {
            overrides = overrides.with_endpoint(endpoint.clone());
        }
        if let Some(api_base) = &self.api_base {
            overrides = overrides.with_api_base(api_base.clone());
        }
        if let Some(ms) = self.connect_timeout_ms {
            overrides = overrides.with_connect_timeout_ms(ms);
        }
        if self.timestamps {
            overrides = overrides.with_timestamps(true);
        }
        if self.wrap {
            overrides = overrides.with_wrap(true);
        }
        overrides
    }
}
