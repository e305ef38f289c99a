//! Viewer Shell
//!
//! Composes selection, surface, resize coordinator and connection manager
//! behind an open/close lifecycle.
//!
//! # Lifecycle
//!
//! Opening creates a fresh session: selection defaults, a new surface, a
//! resize coordinator and an idle connection manager. The first connection
//! waits for `initial_connect_delay` so the host has a chance to report its
//! geometry; selection changes made in that window are simply kept and the
//! latest target is applied once the session becomes ready.
//!
//! Closing tears the session down in dependency order: connection, then
//! surface, then the resize observer. Nothing survives into the next open.
//!
//! When the selected container set changes, the surface is disposed and
//! recreated (new [`SurfaceId`]) before reconnecting, since the stream is
//! effectively restarting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::discovery::{merge_containers, DiscoveredPod, DiscoveryError, PodDiscovery};
use crate::resize::ResizeCoordinator;
use crate::selection::{ContainerInfo, DisplayDefaults, PodInfo, Selection, SelectionState};
use crate::streaming::{ConnectionState, ConnectionStats, StreamConnectionManager};
use crate::surface::{
    CellMetrics, HostGeometry, SizingPolicy, SurfaceId, TerminalSurface, DEFAULT_SCROLLBACK_LINES,
};
use crate::target::LogTarget;
use crate::transport::{Generation, LogTransport};

#[cfg(feature = "websocket")]
use crate::{
    config::LogviewConfig, discovery::HttpPodDiscovery, error::LogviewError,
    transport::WebSocketTransport,
};

// ============================================================================
// Props and settings
// ============================================================================

/// What the caller asks the viewer to show
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewerProps {
    /// Whether the viewer is open
    pub open: bool,
    /// Cluster context
    pub context: String,
    /// Namespace
    pub namespace: String,
    /// Regular container names
    pub containers: Vec<String>,
    /// Init container names
    pub init_containers: Vec<String>,
    /// Static pod list; `None` means "discover"
    pub pods: Option<Vec<PodInfo>>,
    /// Label selector for a controller-owned pod set
    pub selector: Option<String>,
    /// Offer a pod picker
    pub show_pod_selector: bool,
    /// Display title
    pub title: String,
}

impl ViewerProps {
    /// Props for an open viewer on `context`/`namespace`
    #[must_use]
    pub fn new(context: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            open: true,
            context: context.into(),
            namespace: namespace.into(),
            containers: Vec::new(),
            init_containers: Vec::new(),
            pods: None,
            selector: None,
            show_pod_selector: false,
            title: "Logs".to_string(),
        }
    }

    /// Set the regular containers
    #[must_use]
    pub fn with_containers<I, S>(mut self, containers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.containers = containers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the init containers
    #[must_use]
    pub fn with_init_containers<I, S>(mut self, containers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.init_containers = containers.into_iter().map(Into::into).collect();
        self
    }

    /// Set a static pod list
    #[must_use]
    pub fn with_pods(mut self, pods: Vec<PodInfo>) -> Self {
        self.pods = Some(pods);
        self
    }

    /// Set a label selector
    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Show or hide the pod picker
    #[must_use]
    pub fn with_pod_selector(mut self, show: bool) -> Self {
        self.show_pod_selector = show;
        self
    }

    /// Set the title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the open flag
    #[must_use]
    pub fn with_open(mut self, open: bool) -> Self {
        self.open = open;
        self
    }

    /// Container picker entries: regular first, then init
    #[must_use]
    pub fn container_infos(&self) -> Vec<ContainerInfo> {
        self.containers
            .iter()
            .map(|name| ContainerInfo::regular(name.clone()))
            .chain(self.init_containers.iter().map(|name| ContainerInfo::init(name.clone())))
            .collect()
    }

    /// Whether pods or containers have to be looked up
    #[must_use]
    pub fn needs_discovery(&self) -> bool {
        self.pods.is_none() || (self.containers.is_empty() && self.init_containers.is_empty())
    }
}

/// Tunables that do not come from props
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewerSettings {
    /// Wait between opening and the first connection
    pub initial_connect_delay: Duration,
    /// Lines kept per surface
    pub scrollback_lines: usize,
    /// Toggles a new session starts with
    pub display: DisplayDefaults,
    /// Cell size of the host
    pub cell_metrics: CellMetrics,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            initial_connect_delay: Duration::from_millis(100),
            scrollback_lines: DEFAULT_SCROLLBACK_LINES,
            display: DisplayDefaults::default(),
            cell_metrics: CellMetrics::default(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

type DiscoveryResult = Result<Vec<DiscoveredPod>, DiscoveryError>;

struct DiscoveryTask {
    rx: oneshot::Receiver<DiscoveryResult>,
    handle: JoinHandle<()>,
}

impl Drop for DiscoveryTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn spawn_discovery(discovery: &Arc<dyn PodDiscovery>, props: &ViewerProps) -> Option<DiscoveryTask> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::warn!("no async runtime, pod discovery skipped");
        return None;
    };
    let (tx, rx) = oneshot::channel();
    let discovery = Arc::clone(discovery);
    let context = props.context.clone();
    let namespace = props.namespace.clone();
    let selector = props.selector.clone();

    tracing::debug!(%context, %namespace, selector = ?selector, "starting pod discovery");
    let handle = runtime.spawn(async move {
        let result = discovery
            .discover(&context, &namespace, selector.as_deref())
            .await;
        let _ = tx.send(result);
    });
    Some(DiscoveryTask { rx, handle })
}

/// Everything that lives exactly as long as the viewer is open
struct ViewerSession<T: LogTransport> {
    selection: SelectionState,
    pod_options: Vec<PodInfo>,
    container_options: Vec<ContainerInfo>,
    surface: TerminalSurface,
    /// Container selection the current surface was created for
    surface_containers: Selection,
    scrollback_lines: usize,
    resize: ResizeCoordinator,
    manager: StreamConnectionManager<T>,
    ready_at: Instant,
    ready: bool,
    discovery: Option<DiscoveryTask>,
}

impl<T: LogTransport> ViewerSession<T> {
    fn start(
        props: &ViewerProps,
        settings: &ViewerSettings,
        transport: T,
        surface_id: SurfaceId,
        now: Instant,
    ) -> Self {
        let pod_options = props.pods.clone().unwrap_or_default();
        let container_options = props.container_infos();
        let selection = SelectionState::initial(
            &pod_options,
            &container_options,
            props.show_pod_selector,
            settings.display,
        );
        let policy = SizingPolicy::from_wrap(selection.wrap_lines());
        let resize = ResizeCoordinator::new(policy, settings.cell_metrics);

        Self {
            surface_containers: selection.containers().clone(),
            selection,
            pod_options,
            container_options,
            surface: TerminalSurface::new(surface_id, settings.scrollback_lines).with_policy(policy),
            scrollback_lines: settings.scrollback_lines,
            resize,
            manager: StreamConnectionManager::new(transport),
            ready_at: now + settings.initial_connect_delay,
            ready: false,
            discovery: None,
        }
    }

    fn target(&self, props: &ViewerProps) -> LogTarget {
        LogTarget {
            context_id: props.context.clone(),
            namespace: props.namespace.clone(),
            pods: self.selection.pods().clone(),
            containers: self.selection.containers().clone(),
            group_selector: props.selector.clone(),
            show_timestamps: self.selection.show_timestamps(),
            show_source_prefix: self.selection.show_source_prefix(),
        }
    }

    /// Bring the connection in line with the current selection
    fn sync(&mut self, props: &ViewerProps, surface_ids: &mut u64) {
        if !self.ready {
            return;
        }
        let target = self.target(props);
        if target.container_set() != &self.surface_containers {
            *surface_ids += 1;
            self.recreate_surface(SurfaceId(*surface_ids), target.container_set().clone());
        }
        self.manager.apply_target(Some(&target), &mut self.surface);
    }

    fn recreate_surface(&mut self, id: SurfaceId, containers: Selection) {
        self.manager.shutdown();
        self.surface.dispose();
        self.surface =
            TerminalSurface::new(id, self.scrollback_lines).with_policy(self.resize.policy());
        self.resize.refit(&mut self.surface);
        self.surface_containers = containers;
        tracing::debug!(surface = id.0, containers = %self.surface_containers, "terminal surface recreated");
    }

    fn take_discovery_result(&mut self) -> Option<DiscoveryResult> {
        let task = self.discovery.as_mut()?;
        match task.rx.try_recv() {
            Ok(result) => {
                self.discovery = None;
                Some(result)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                tracing::warn!("pod discovery task ended without a result");
                self.discovery = None;
                None
            }
        }
    }

    fn apply_discovered(&mut self, props: &ViewerProps, pods: &[DiscoveredPod]) {
        if props.pods.is_none() {
            self.pod_options = pods.iter().map(DiscoveredPod::pod_info).collect();
        }
        if props.containers.is_empty() && props.init_containers.is_empty() {
            let options = merge_containers(pods);
            if options != self.container_options {
                self.container_options = options;
                self.selection
                    .select_containers(SelectionState::default_containers(&self.container_options));
                if self.container_options.len() > 1 {
                    self.selection.set_source_prefix(true);
                }
            }
        }
        tracing::info!(
            pods = self.pod_options.len(),
            containers = self.container_options.len(),
            "pod discovery finished"
        );
    }

    /// Teardown in dependency order: connection, surface, observers
    fn end(&mut self) {
        self.manager.shutdown();
        self.surface.dispose();
        self.resize.detach();
        self.discovery = None;
    }
}

// ============================================================================
// Viewer
// ============================================================================

/// The log viewer component
///
/// Single-threaded: every method runs on the caller's loop and returns
/// without waiting on the network.
pub struct LogViewer<T: LogTransport + Clone> {
    transport: T,
    settings: ViewerSettings,
    discovery: Option<Arc<dyn PodDiscovery>>,
    props: Option<ViewerProps>,
    session: Option<ViewerSession<T>>,
    surface_ids: u64,
}

impl<T: LogTransport + Clone> LogViewer<T> {
    /// Create a closed viewer
    #[must_use]
    pub fn new(transport: T, settings: ViewerSettings) -> Self {
        Self {
            transport,
            settings,
            discovery: None,
            props: None,
            session: None,
            surface_ids: 0,
        }
    }

    /// Use `discovery` to populate pickers when props lack pods or containers
    #[must_use]
    pub fn with_discovery(mut self, discovery: Arc<dyn PodDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Open with `props` (forces `props.open`)
    pub fn open(&mut self, props: ViewerProps) {
        self.set_props(props.with_open(true));
    }

    /// Close the viewer
    ///
    /// Closes the connection and disposes the surface before returning,
    /// whatever state the connection was in.
    pub fn close(&mut self) {
        if let Some(props) = self.props.as_mut() {
            props.open = false;
        }
        self.end_session();
    }

    /// Apply new props
    ///
    /// Handles open/close transitions. While open, a change of context,
    /// namespace, containers or pods is a target change.
    pub fn set_props(&mut self, props: ViewerProps) {
        if !props.open {
            self.props = Some(props);
            self.end_session();
            return;
        }
        if self.session.is_none() {
            self.start_session(props);
            return;
        }

        let Some(old) = self.props.replace(props) else {
            return;
        };
        let (Some(session), Some(new)) = (self.session.as_mut(), self.props.as_ref()) else {
            return;
        };

        if old.containers != new.containers || old.init_containers != new.init_containers {
            session.container_options = new.container_infos();
            session
                .selection
                .select_containers(SelectionState::default_containers(&session.container_options));
        }
        if old.pods != new.pods || old.show_pod_selector != new.show_pod_selector {
            session.pod_options = new.pods.clone().unwrap_or_default();
            session.selection.select_pods(SelectionState::default_pods(
                &session.pod_options,
                new.show_pod_selector,
            ));
        }
        let scope_changed = old.context != new.context
            || old.namespace != new.namespace
            || old.selector != new.selector;
        if scope_changed && new.needs_discovery() {
            if let Some(discovery) = &self.discovery {
                session.discovery = spawn_discovery(discovery, new);
            }
        }

        session.sync(new, &mut self.surface_ids);
    }

    fn start_session(&mut self, props: ViewerProps) {
        self.surface_ids += 1;
        let mut session = ViewerSession::start(
            &props,
            &self.settings,
            self.transport.clone(),
            SurfaceId(self.surface_ids),
            Instant::now(),
        );
        if props.needs_discovery() {
            if let Some(discovery) = &self.discovery {
                session.discovery = spawn_discovery(discovery, &props);
            }
        }
        tracing::info!(
            context = %props.context,
            namespace = %props.namespace,
            title = %props.title,
            "log viewer opened"
        );
        self.session = Some(session);
        self.props = Some(props);
    }

    fn end_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.end();
            tracing::info!("log viewer closed");
        }
    }

    /// Drive the viewer: readiness, discovery results, transport events
    ///
    /// Returns the number of transport events applied.
    pub fn poll(&mut self) -> usize {
        self.poll_at(Instant::now())
    }

    /// [`poll`](Self::poll) with an explicit clock
    pub fn poll_at(&mut self, now: Instant) -> usize {
        let (Some(session), Some(props)) = (self.session.as_mut(), self.props.as_ref()) else {
            return 0;
        };

        match session.take_discovery_result() {
            Some(Ok(pods)) => {
                session.apply_discovered(props, &pods);
                session.sync(props, &mut self.surface_ids);
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "pod discovery failed, keeping previous options");
            }
            None => {}
        }

        if !session.ready && now >= session.ready_at {
            session.ready = true;
            tracing::debug!("log viewer ready, applying latest target");
            session.sync(props, &mut self.surface_ids);
        }

        if session.ready {
            session.manager.poll(&mut session.surface)
        } else {
            0
        }
    }

    fn update<F>(&mut self, change: F)
    where
        F: FnOnce(&mut ViewerSession<T>),
    {
        let (Some(session), Some(props)) = (self.session.as_mut(), self.props.as_ref()) else {
            return;
        };
        change(session);
        session.sync(props, &mut self.surface_ids);
    }

    /// Toggle one pod in the selection
    pub fn toggle_pod(&mut self, name: &str) {
        self.update(|s| s.selection.toggle_pod(name, &s.pod_options));
    }

    /// Replace the pod selection
    pub fn select_pods(&mut self, pods: Selection) {
        self.update(|s| s.selection.select_pods(pods));
    }

    /// Select every pod (`ALL`)
    pub fn select_all_pods(&mut self) {
        self.update(|s| s.selection.select_all_pods());
    }

    /// Toggle one container in the selection
    pub fn toggle_container(&mut self, name: &str) {
        self.update(|s| s.selection.toggle_container(name, &s.container_options));
    }

    /// Replace the container selection
    pub fn select_containers(&mut self, containers: Selection) {
        self.update(|s| s.selection.select_containers(containers));
    }

    /// Select every container (`ALL`)
    pub fn select_all_containers(&mut self) {
        self.update(|s| s.selection.select_all_containers());
    }

    /// Show or hide server timestamps
    pub fn set_timestamps(&mut self, enabled: bool) {
        self.update(|s| s.selection.set_timestamps(enabled));
    }

    /// Show or hide source prefixes
    pub fn set_source_prefix(&mut self, enabled: bool) {
        self.update(|s| s.selection.set_source_prefix(enabled));
    }

    /// Switch between reflow and fixed-wide sizing
    ///
    /// Resizes immediately; does not reconnect.
    pub fn set_wrap(&mut self, enabled: bool) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.selection.set_wrap(enabled);
        session
            .resize
            .set_policy(SizingPolicy::from_wrap(enabled), &mut session.surface);
    }

    /// Report the host geometry
    pub fn observe_geometry(&mut self, geometry: HostGeometry) {
        if let Some(session) = self.session.as_mut() {
            session.resize.observe(geometry, &mut session.surface);
        }
    }

    /// Reconnect to the current target
    ///
    /// Returns `false` when closed, not yet ready or nothing is selected.
    pub fn refresh(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) if session.ready => session.manager.refresh(&mut session.surface),
            _ => false,
        }
    }

    /// Whether the viewer is open
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the initial connect delay has passed
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.ready)
    }

    /// Whether a discovery lookup is in flight
    #[must_use]
    pub fn is_discovering(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.discovery.is_some())
    }

    /// Connection status (`Idle` when closed)
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.session
            .as_ref()
            .map_or(ConnectionState::Idle, |s| s.manager.state())
    }

    /// Generation of the latest connection attempt
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.session
            .as_ref()
            .map_or_else(Generation::default, |s| s.manager.generation())
    }

    /// Connection counters for this session
    #[must_use]
    pub fn stats(&self) -> ConnectionStats {
        self.session
            .as_ref()
            .map_or_else(ConnectionStats::default, |s| s.manager.stats())
    }

    /// The surface, while open
    #[must_use]
    pub fn surface(&self) -> Option<&TerminalSurface> {
        self.session.as_ref().map(|s| &s.surface)
    }

    /// The selection, while open
    #[must_use]
    pub fn selection(&self) -> Option<&SelectionState> {
        self.session.as_ref().map(|s| &s.selection)
    }

    /// Pods offered in the picker
    #[must_use]
    pub fn pod_options(&self) -> &[PodInfo] {
        match &self.session {
            Some(session) => &session.pod_options,
            None => &[],
        }
    }

    /// Containers offered in the picker
    #[must_use]
    pub fn container_options(&self) -> &[ContainerInfo] {
        match &self.session {
            Some(session) => &session.container_options,
            None => &[],
        }
    }

    /// Last props applied
    #[must_use]
    pub fn props(&self) -> Option<&ViewerProps> {
        self.props.as_ref()
    }

    /// The target derived from the current selection, while open
    #[must_use]
    pub fn target(&self) -> Option<LogTarget> {
        let (session, props) = (self.session.as_ref()?, self.props.as_ref()?);
        Some(session.target(props))
    }

    /// The transport
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(feature = "websocket")]
impl LogViewer<WebSocketTransport> {
    /// Build a WebSocket viewer with HTTP discovery from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn from_config(config: &LogviewConfig) -> Result<Self, LogviewError> {
        config.validate()?;
        let discovery: Arc<dyn PodDiscovery> = Arc::new(HttpPodDiscovery::new(
            config.api_base.clone(),
            config.discovery_timeout,
        ));
        Ok(Self::new(WebSocketTransport::from_config(config), config.viewer_settings())
            .with_discovery(discovery))
    }
}

impl<T: LogTransport + Clone> Drop for LogViewer<T> {
    fn drop(&mut self) {
        self.end_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::FIXED_WIDE_COLUMNS;
    use crate::transport::{InProcessTransport, TransportEventKind};
    use pretty_assertions::assert_eq;

    fn immediate() -> ViewerSettings {
        ViewerSettings {
            initial_connect_delay: Duration::ZERO,
            ..ViewerSettings::default()
        }
    }

    fn single_pod_props() -> ViewerProps {
        ViewerProps::new("prod", "web")
            .with_pods(vec![PodInfo::new("web-0", "Running")])
            .with_containers(["app"])
    }

    fn open_viewer(props: ViewerProps) -> (InProcessTransport, LogViewer<InProcessTransport>) {
        let transport = InProcessTransport::new();
        let mut viewer = LogViewer::new(transport.clone(), immediate());
        viewer.open(props);
        viewer.poll();
        (transport, viewer)
    }

    #[test]
    fn test_closed_viewer_is_inert() {
        let transport = InProcessTransport::new();
        let mut viewer = LogViewer::new(transport.clone(), immediate());
        viewer.toggle_pod("web-0");
        viewer.set_wrap(true);
        assert_eq!(viewer.poll(), 0);
        assert!(!viewer.is_open());
        assert!(viewer.surface().is_none());
        assert_eq!(viewer.state(), ConnectionState::Idle);
        assert_eq!(transport.open_count(), 0);
    }

    #[test]
    fn test_open_connects_after_delay() {
        let transport = InProcessTransport::new();
        let settings = ViewerSettings {
            initial_connect_delay: Duration::from_millis(100),
            ..ViewerSettings::default()
        };
        let mut viewer = LogViewer::new(transport.clone(), settings);
        let opened_at = Instant::now();
        viewer.open(single_pod_props());

        viewer.poll_at(opened_at);
        assert!(!viewer.is_ready());
        assert_eq!(transport.open_count(), 0);

        viewer.poll_at(opened_at + Duration::from_millis(200));
        assert!(viewer.is_ready());
        assert_eq!(viewer.state(), ConnectionState::Connecting);
        assert_eq!(transport.open_count(), 1);
    }

    #[test]
    fn test_latest_target_applied_once_ready() {
        let transport = InProcessTransport::new();
        let settings = ViewerSettings {
            initial_connect_delay: Duration::from_secs(60),
            ..ViewerSettings::default()
        };
        let mut viewer = LogViewer::new(transport.clone(), settings);
        viewer.open(single_pod_props());

        viewer.set_timestamps(true);
        viewer.set_timestamps(false);
        viewer.set_timestamps(true);
        assert_eq!(transport.open_count(), 0);

        viewer.poll_at(Instant::now() + Duration::from_secs(61));
        assert_eq!(transport.open_count(), 1);
        assert_eq!(transport.last_query().unwrap().get("timestamps"), Some("true"));
    }

    #[test]
    fn test_single_pod_defaults() {
        let (transport, viewer) = open_viewer(single_pod_props());
        let selection = viewer.selection().unwrap();
        assert_eq!(selection.pods(), &Selection::from_items(["web-0"]));
        assert_eq!(selection.containers(), &Selection::from_items(["app"]));
        assert!(!selection.show_source_prefix());

        let query = transport.last_query().unwrap();
        assert_eq!(query.get("pod"), Some("web-0"));
        assert_eq!(query.get("container"), Some("app"));
        assert_eq!(query.get("prefix"), Some("false"));
    }

    #[test]
    fn test_frames_reach_surface() {
        let (transport, mut viewer) = open_viewer(single_pod_props());
        let g = viewer.generation();
        transport.emit(g, TransportEventKind::Opened);
        transport.emit(g, TransportEventKind::Frame("hello\nworld\n".to_string()));
        assert_eq!(viewer.poll(), 2);

        assert_eq!(viewer.state(), ConnectionState::Connected);
        let lines: Vec<&str> = viewer.surface().unwrap().lines().collect();
        assert_eq!(&lines[lines.len() - 2..], &["hello", "world"]);
    }

    #[test]
    fn test_wrap_toggle_resizes_without_reconnect() {
        let (transport, mut viewer) = open_viewer(single_pod_props());
        viewer.observe_geometry(HostGeometry::new(120, 40));
        assert_eq!(viewer.surface().unwrap().grid().columns, FIXED_WIDE_COLUMNS);

        viewer.set_wrap(true);
        assert_eq!(viewer.surface().unwrap().grid().columns, 120);
        assert_eq!(viewer.surface().unwrap().policy(), SizingPolicy::Reflow);
        assert_eq!(transport.open_count(), 1);
    }

    #[test]
    fn test_container_change_recreates_surface() {
        let props = single_pod_props().with_containers(["app", "sidecar"]);
        let (transport, mut viewer) = open_viewer(props);
        let first = viewer.surface().unwrap().id();

        viewer.toggle_container("sidecar");
        let second = viewer.surface().unwrap().id();
        assert_ne!(first, second);
        assert_eq!(transport.open_count(), 2);
        assert_eq!(transport.max_concurrent(), 1);

        viewer.set_timestamps(true);
        assert_eq!(viewer.surface().unwrap().id(), second);
        assert_eq!(transport.open_count(), 3);
    }

    #[test]
    fn test_surface_policy_matches_wrap_before_geometry() {
        let long = "z".repeat(200);
        for wrap in [false, true] {
            let transport = InProcessTransport::new();
            let settings = ViewerSettings {
                display: DisplayDefaults {
                    wrap,
                    ..DisplayDefaults::default()
                },
                ..immediate()
            };
            let mut viewer = LogViewer::new(transport.clone(), settings);
            viewer.open(single_pod_props());
            viewer.poll();

            let g = viewer.generation();
            transport.emit(g, TransportEventKind::Frame(format!("{long}\n")));
            viewer.poll();

            let surface = viewer.surface().unwrap();
            assert_eq!(surface.policy(), SizingPolicy::from_wrap(wrap));
            let frame_rows = surface
                .tail_rows(10, 0)
                .into_iter()
                .filter(|row| row.starts_with('z'))
                .count();
            if wrap {
                assert_eq!(surface.grid().columns, 80);
                assert_eq!(frame_rows, 3);
            } else {
                assert_eq!(surface.grid().columns, FIXED_WIDE_COLUMNS);
                assert_eq!(frame_rows, 1);
            }
        }
    }

    #[test]
    fn test_wrap_toggle_before_geometry_changes_policy() {
        let (_transport, mut viewer) = open_viewer(single_pod_props());
        viewer.set_wrap(true);
        assert_eq!(viewer.surface().unwrap().policy(), SizingPolicy::Reflow);

        viewer.set_wrap(false);
        let surface = viewer.surface().unwrap();
        assert_eq!(surface.policy(), SizingPolicy::FixedWide);
        assert_eq!(surface.grid().columns, FIXED_WIDE_COLUMNS);
    }

    #[test]
    fn test_recreated_surface_keeps_geometry() {
        let props = single_pod_props().with_containers(["app", "sidecar"]);
        let (_transport, mut viewer) = open_viewer(props);
        viewer.set_wrap(true);
        viewer.observe_geometry(HostGeometry::new(90, 20));

        viewer.toggle_container("app");
        let grid = viewer.surface().unwrap().grid();
        assert_eq!((grid.columns, grid.rows), (90, 20));
    }

    #[test]
    fn test_deselecting_everything_goes_idle() {
        let (transport, mut viewer) = open_viewer(single_pod_props());
        viewer.toggle_container("app");
        assert_eq!(viewer.state(), ConnectionState::Idle);
        assert!(transport.open_connections().is_empty());
        assert_eq!(transport.open_count(), 1);
    }

    #[test]
    fn test_close_tears_down_everything() {
        let (transport, mut viewer) = open_viewer(single_pod_props());
        viewer.close();

        assert!(!viewer.is_open());
        assert!(transport.open_connections().is_empty());
        assert_eq!(viewer.props().map(|p| p.open), Some(false));
    }

    #[test]
    fn test_reopen_starts_fresh() {
        let (transport, mut viewer) = open_viewer(single_pod_props());
        viewer.set_timestamps(true);
        let first_surface = viewer.surface().unwrap().id();
        viewer.close();

        viewer.open(single_pod_props());
        viewer.poll();
        assert!(!viewer.selection().unwrap().show_timestamps());
        assert_ne!(viewer.surface().unwrap().id(), first_surface);
        assert_eq!(viewer.generation(), Generation::new(1));
        assert_eq!(transport.open_connections().len(), 1);
    }

    #[test]
    fn test_props_change_is_target_change() {
        let (transport, mut viewer) = open_viewer(single_pod_props());
        let mut props = single_pod_props();
        props.namespace = "staging".to_string();
        viewer.set_props(props);

        assert_eq!(transport.open_count(), 2);
        assert_eq!(transport.last_query().unwrap().get("namespace"), Some("staging"));
    }

    #[test]
    fn test_title_change_does_not_reconnect() {
        let (transport, mut viewer) = open_viewer(single_pod_props());
        viewer.set_props(single_pod_props().with_title("web-0 logs"));
        assert_eq!(transport.open_count(), 1);
    }

    #[test]
    fn test_set_props_closed_closes() {
        let (transport, mut viewer) = open_viewer(single_pod_props());
        viewer.set_props(single_pod_props().with_open(false));
        assert!(!viewer.is_open());
        assert!(transport.open_connections().is_empty());
    }

    #[test]
    fn test_refresh() {
        let (transport, mut viewer) = open_viewer(single_pod_props());
        let g = viewer.generation();
        assert!(viewer.refresh());
        assert!(viewer.generation() > g);
        assert_eq!(transport.open_count(), 2);
        assert_eq!(transport.max_concurrent(), 1);
    }

    #[test]
    fn test_drop_closes_connection() {
        let (transport, viewer) = open_viewer(single_pod_props());
        drop(viewer);
        assert!(transport.open_connections().is_empty());
    }
}
