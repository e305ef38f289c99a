//! Selection State
//!
//! The user's current choice of pods, containers and display toggles. This is
//! the only mutable source of truth in the viewer; the stream target and the
//! connection are derived from it.
//!
//! # Defaults
//!
//! - Single fixed pod (no picker): that pod is selected
//! - Pod picker shown: every pod (`ALL`)
//! - Containers: every regular container, init containers opt-in
//! - Source prefix: on once more than one stream can be interleaved

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire literal meaning "every available pod/container"
pub const ALL_SENTINEL: &str = "ALL";

/// A pod or container selection
///
/// `Items` keeps insertion order and never holds duplicates. An empty
/// `Items` means nothing is selected, which makes the target invalid.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selection {
    /// Every available name
    All,
    /// An explicit, ordered set of names
    Items(Vec<String>),
}

impl Default for Selection {
    fn default() -> Self {
        Self::none()
    }
}

impl Selection {
    /// An empty selection
    #[must_use]
    pub fn none() -> Self {
        Self::Items(Vec::new())
    }

    /// Build an explicit selection, dropping duplicates but keeping order
    pub fn from_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for item in items {
            let name = item.into();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Self::Items(names)
    }

    /// Whether this is the `ALL` sentinel
    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Whether nothing is selected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Items(items) if items.is_empty())
    }

    /// Whether more than one source can be streamed
    #[must_use]
    pub fn is_multiple(&self) -> bool {
        match self {
            Self::All => true,
            Self::Items(items) => items.len() > 1,
        }
    }

    /// Whether `name` is part of the selection
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Items(items) => items.iter().any(|item| item == name),
        }
    }

    /// Explicitly selected names (empty for `ALL`)
    #[must_use]
    pub fn items(&self) -> &[String] {
        match self {
            Self::All => &[],
            Self::Items(items) => items,
        }
    }

    /// Flip `name` in or out of the selection
    ///
    /// Toggling a name while `ALL` is selected expands `ALL` into every
    /// name in `available` except the toggled one.
    pub fn toggle(&mut self, name: &str, available: &[String]) {
        match self {
            Self::All => {
                *self = Self::from_items(available.iter().filter(|n| n.as_str() != name).cloned());
            }
            Self::Items(items) => {
                if let Some(pos) = items.iter().position(|item| item == name) {
                    items.remove(pos);
                } else {
                    items.push(name.to_string());
                }
            }
        }
    }

    /// Query-string form: the `ALL` literal or a comma-joined list
    #[must_use]
    pub fn to_wire(&self) -> String {
        match self {
            Self::All => ALL_SENTINEL.to_string(),
            Self::Items(items) => items.join(","),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// A pod the caller (or discovery) offered for selection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodInfo {
    /// Pod name
    pub name: String,
    /// Phase as reported by the cluster (e.g. "Running")
    pub status: Option<String>,
}

impl PodInfo {
    /// Create pod info with a status
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Some(status.into()),
        }
    }

    /// Create pod info without a known status
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: None,
        }
    }
}

/// Grouping of a container in the picker
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Regular application container
    Regular,
    /// Init container (grouped separately, not distinguished on the wire)
    Init,
}

/// A container offered for selection
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Container name
    pub name: String,
    /// Regular or init
    pub kind: ContainerKind,
}

impl ContainerInfo {
    /// A regular container
    pub fn regular(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ContainerKind::Regular,
        }
    }

    /// An init container
    pub fn init(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ContainerKind::Init,
        }
    }

    /// Whether this is an init container
    #[must_use]
    pub fn is_init(&self) -> bool {
        self.kind == ContainerKind::Init
    }
}

/// Display toggles used when a viewer opens
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDefaults {
    /// Ask the server to prepend timestamps
    pub timestamps: bool,
    /// Reflow long lines at the grid edge
    pub wrap: bool,
}

/// The user's current choices
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionState {
    pods: Selection,
    containers: Selection,
    show_timestamps: bool,
    show_source_prefix: bool,
    wrap_lines: bool,
}

impl SelectionState {
    /// Compute the opening selection for a viewer
    #[must_use]
    pub fn initial(
        pods: &[PodInfo],
        containers: &[ContainerInfo],
        show_pod_selector: bool,
        defaults: DisplayDefaults,
    ) -> Self {
        let pods = Self::default_pods(pods, show_pod_selector);
        let show_source_prefix = containers.len() > 1 || show_pod_selector || pods.is_multiple();
        Self {
            pods,
            containers: Self::default_containers(containers),
            show_timestamps: defaults.timestamps,
            show_source_prefix,
            wrap_lines: defaults.wrap,
        }
    }

    /// Default pod selection for the given options
    #[must_use]
    pub fn default_pods(pods: &[PodInfo], show_pod_selector: bool) -> Selection {
        match pods {
            [only] if !show_pod_selector => Selection::from_items([only.name.clone()]),
            _ => Selection::All,
        }
    }

    /// Default container selection: all regular containers, or the init
    /// containers when there is nothing else
    ///
    /// Init containers are opt-in otherwise. They usually exit before the
    /// pod is ready, so streaming them by default would open the view on a
    /// finished log and interleave setup output with the workload's own.
    #[must_use]
    pub fn default_containers(containers: &[ContainerInfo]) -> Selection {
        let regular: Vec<&str> = containers
            .iter()
            .filter(|c| !c.is_init())
            .map(|c| c.name.as_str())
            .collect();
        if regular.is_empty() {
            Selection::from_items(containers.iter().map(|c| c.name.clone()))
        } else {
            Selection::from_items(regular)
        }
    }

    /// Selected pods
    #[must_use]
    pub fn pods(&self) -> &Selection {
        &self.pods
    }

    /// Selected containers
    #[must_use]
    pub fn containers(&self) -> &Selection {
        &self.containers
    }

    /// Whether timestamps are requested
    #[must_use]
    pub fn show_timestamps(&self) -> bool {
        self.show_timestamps
    }

    /// Whether lines are prefixed with their source
    #[must_use]
    pub fn show_source_prefix(&self) -> bool {
        self.show_source_prefix
    }

    /// Whether long lines reflow at the grid edge
    #[must_use]
    pub fn wrap_lines(&self) -> bool {
        self.wrap_lines
    }

    /// Replace the pod selection
    ///
    /// Selecting several pods (or `ALL`) forces the source prefix on. This
    /// only ever turns the prefix on; the user may switch it off again.
    pub fn select_pods(&mut self, pods: Selection) {
        if pods.is_multiple() && !self.show_source_prefix {
            tracing::debug!(pods = %pods, "multiple pods selected, enabling source prefix");
            self.show_source_prefix = true;
        }
        self.pods = pods;
    }

    /// Toggle one pod in or out of the selection
    pub fn toggle_pod(&mut self, name: &str, available: &[PodInfo]) {
        let names: Vec<String> = available.iter().map(|p| p.name.clone()).collect();
        let mut pods = self.pods.clone();
        pods.toggle(name, &names);
        self.select_pods(pods);
    }

    /// Select every pod
    pub fn select_all_pods(&mut self) {
        self.select_pods(Selection::All);
    }

    /// Replace the container selection
    pub fn select_containers(&mut self, containers: Selection) {
        self.containers = containers;
    }

    /// Toggle one container in or out of the selection
    pub fn toggle_container(&mut self, name: &str, available: &[ContainerInfo]) {
        let names: Vec<String> = available.iter().map(|c| c.name.clone()).collect();
        self.containers.toggle(name, &names);
    }

    /// Select every container
    pub fn select_all_containers(&mut self) {
        self.containers = Selection::All;
    }

    /// Set the timestamp toggle
    pub fn set_timestamps(&mut self, enabled: bool) {
        self.show_timestamps = enabled;
    }

    /// Set the source prefix toggle
    pub fn set_source_prefix(&mut self, enabled: bool) {
        self.show_source_prefix = enabled;
    }

    /// Set the wrap toggle
    pub fn set_wrap(&mut self, enabled: bool) {
        self.wrap_lines = enabled;
    }
}

/// Split container options into (regular, init) groups for display
#[must_use]
pub fn group_containers(containers: &[ContainerInfo]) -> (Vec<&ContainerInfo>, Vec<&ContainerInfo>) {
    containers.iter().partition(|c| !c.is_init())
}
