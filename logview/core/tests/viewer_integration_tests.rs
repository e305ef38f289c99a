//! Integration tests for the log viewer
//!
//! These tests drive a `LogViewer` through the in-process transport and
//! verify that the pieces work together:
//! - Opening defaults and the queued first connection
//! - Selection changes and the one-connection-at-a-time rule
//! - Generation fencing of late frames
//! - Wrap toggles and surface geometry
//! - Pod discovery success and failure
//! - Configuration flowing into viewer settings

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use logview_core::config::load_config_with_env;
use logview_core::transport::TransportCall;
use logview_core::{
    ConnectionState, DiscoveredPod, DiscoveryError, Generation, HostGeometry, InProcessTransport,
    LogViewer, PodDiscovery, PodInfo, Selection, SizingPolicy, TransportEventKind, ViewerProps,
    ViewerSettings, FIXED_WIDE_COLUMNS,
};

// =============================================================================
// Helpers
// =============================================================================

fn immediate() -> ViewerSettings {
    ViewerSettings {
        initial_connect_delay: Duration::ZERO,
        ..ViewerSettings::default()
    }
}

fn three_pods() -> Vec<PodInfo> {
    vec![
        PodInfo::new("web-0", "Running"),
        PodInfo::new("web-1", "Running"),
        PodInfo::new("web-2", "Pending"),
    ]
}

fn open(props: ViewerProps) -> (InProcessTransport, LogViewer<InProcessTransport>) {
    let transport = InProcessTransport::new();
    let mut viewer = LogViewer::new(transport.clone(), immediate());
    viewer.open(props);
    viewer.poll();
    (transport, viewer)
}

fn surface_lines(viewer: &LogViewer<InProcessTransport>) -> Vec<String> {
    viewer
        .surface()
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Discovery that answers with a fixed result
struct FixedDiscovery {
    result: Result<Vec<DiscoveredPod>, String>,
}

#[async_trait]
impl PodDiscovery for FixedDiscovery {
    async fn discover(
        &self,
        _context: &str,
        _namespace: &str,
        _selector: Option<&str>,
    ) -> Result<Vec<DiscoveredPod>, DiscoveryError> {
        self.result
            .clone()
            .map_err(DiscoveryError::InvalidUrl)
    }
}

async fn settle(viewer: &mut LogViewer<InProcessTransport>) {
    for _ in 0..100 {
        tokio::task::yield_now().await;
        viewer.poll();
        if !viewer.is_discovering() {
            return;
        }
    }
    panic!("discovery did not finish");
}

// =============================================================================
// Single pod, single container, wrap off
// =============================================================================

#[test]
fn test_single_pod_single_container_defaults() {
    let props = ViewerProps::new("prod", "web")
        .with_pods(vec![PodInfo::new("web-0", "Running")])
        .with_containers(["app"])
        .with_pod_selector(false);
    let (transport, mut viewer) = open(props);

    let selection = viewer.selection().unwrap();
    assert_eq!(selection.pods(), &Selection::from_items(["web-0"]));
    assert_eq!(selection.containers(), &Selection::from_items(["app"]));
    assert!(!selection.show_source_prefix());
    assert!(!selection.wrap_lines());

    viewer.observe_geometry(HostGeometry::new(100, 30));
    let surface = viewer.surface().unwrap();
    assert_eq!(surface.policy(), SizingPolicy::FixedWide);
    assert_eq!(surface.grid().columns, FIXED_WIDE_COLUMNS);
    assert_eq!(surface.grid().rows, 30);

    assert_eq!(transport.open_count(), 1);
}

// =============================================================================
// Switching to all pods
// =============================================================================

#[test]
fn test_switch_to_all_pods_reconnects_with_prefix() {
    let props = ViewerProps::new("prod", "web")
        .with_pods(three_pods())
        .with_containers(["app"])
        .with_pod_selector(true);
    let (transport, mut viewer) = open(props);

    viewer.select_pods(Selection::from_items(["web-0"]));
    viewer.set_source_prefix(false);
    assert_eq!(transport.last_query().unwrap().get("pod"), Some("web-0"));
    assert_eq!(transport.last_query().unwrap().get("prefix"), Some("false"));

    let before = transport.open_count();
    viewer.select_all_pods();

    assert_eq!(transport.open_count(), before + 1);
    let query = transport.last_query().unwrap();
    assert_eq!(query.get("pod"), Some("ALL"));
    assert_eq!(query.get("prefix"), Some("true"));
    assert!(viewer.selection().unwrap().show_source_prefix());
}

#[test]
fn test_prefix_can_be_turned_off_after_auto_enable() {
    let props = ViewerProps::new("prod", "web")
        .with_pods(three_pods())
        .with_containers(["app"])
        .with_pod_selector(true);
    let (transport, mut viewer) = open(props);

    viewer.toggle_pod("web-1");
    assert!(viewer.selection().unwrap().show_source_prefix());

    viewer.set_source_prefix(false);
    assert!(!viewer.selection().unwrap().show_source_prefix());
    assert_eq!(transport.last_query().unwrap().get("prefix"), Some("false"));
}

// =============================================================================
// Wrap toggled with output buffered
// =============================================================================

#[test]
fn test_wrap_toggle_keeps_buffered_lines() {
    let props = ViewerProps::new("prod", "web")
        .with_pods(vec![PodInfo::named("web-0")])
        .with_containers(["app"]);
    let (transport, mut viewer) = open(props);
    viewer.observe_geometry(HostGeometry::new(80, 24));

    let g = viewer.generation();
    transport.emit(g, TransportEventKind::Opened);
    let chunk: String = (0..500).map(|i| format!("line {i}\n")).collect();
    transport.emit(g, TransportEventKind::Frame(chunk));
    viewer.poll();
    let lines_before = viewer.surface().unwrap().line_count();
    let opens_before = transport.open_count();

    viewer.set_wrap(true);

    let surface = viewer.surface().unwrap();
    assert_eq!(surface.policy(), SizingPolicy::Reflow);
    assert_eq!(surface.grid().columns, 80);
    assert_ne!(surface.grid().columns, FIXED_WIDE_COLUMNS);
    assert_eq!(surface.line_count(), lines_before);
    assert!(surface.lines().any(|l| l == "line 0"));
    assert!(surface.lines().any(|l| l == "line 499"));
    assert_eq!(transport.open_count(), opens_before);
}

// =============================================================================
// Closed while connecting
// =============================================================================

#[test]
fn test_close_while_connecting_ignores_late_events() {
    let props = ViewerProps::new("prod", "web")
        .with_pods(vec![PodInfo::named("web-0")])
        .with_containers(["app"]);
    let (transport, mut viewer) = open(props);
    assert_eq!(viewer.state(), ConnectionState::Connecting);
    let g = viewer.generation();

    viewer.close();
    assert!(transport.open_connections().is_empty());
    assert_eq!(
        transport.calls().last(),
        Some(&TransportCall::Close { generation: g })
    );

    transport.emit(g, TransportEventKind::Opened);
    transport.emit(g, TransportEventKind::Frame("too late\n".to_string()));
    assert_eq!(viewer.poll(), 0);
    assert_eq!(viewer.state(), ConnectionState::Idle);
    assert!(viewer.surface().is_none());
}

// =============================================================================
// Properties 2-4: one connection, teardown first, fencing
// =============================================================================

#[test]
fn test_target_churn_keeps_one_connection() {
    let props = ViewerProps::new("prod", "web")
        .with_pods(three_pods())
        .with_containers(["app", "sidecar"])
        .with_init_containers(["migrate"])
        .with_pod_selector(true);
    let (transport, mut viewer) = open(props);

    viewer.toggle_pod("web-0");
    viewer.toggle_container("sidecar");
    viewer.set_timestamps(true);
    viewer.toggle_container("migrate");
    viewer.select_all_pods();
    viewer.set_source_prefix(false);
    viewer.select_all_containers();
    viewer.refresh();

    assert_eq!(transport.max_concurrent(), 1);
    assert_eq!(transport.open_connections().len(), 1);

    // every open after the first is preceded by the close of the one before
    let calls = transport.calls();
    let mut open_generation: Option<Generation> = None;
    for call in &calls {
        match call {
            TransportCall::Open { generation, .. } => {
                assert!(open_generation.is_none(), "opened {generation} before closing");
                open_generation = Some(*generation);
            }
            TransportCall::Close { generation } => {
                assert_eq!(open_generation, Some(*generation));
                open_generation = None;
            }
        }
    }
}

#[test]
fn test_stale_generation_never_written() {
    let props = ViewerProps::new("prod", "web")
        .with_pods(three_pods())
        .with_containers(["app"])
        .with_pod_selector(true);
    let (transport, mut viewer) = open(props);
    let old = viewer.generation();

    viewer.toggle_pod("web-2");
    let new = viewer.generation();
    assert!(new > old);

    transport.emit(old, TransportEventKind::Frame("from old\n".to_string()));
    transport.emit(new, TransportEventKind::Opened);
    transport.emit(old, TransportEventKind::Error("old failed".to_string()));
    transport.emit(new, TransportEventKind::Frame("from new\n".to_string()));
    viewer.poll();

    let lines = surface_lines(&viewer);
    assert!(!lines.iter().any(|l| l == "from old"));
    assert!(!lines.iter().any(|l| l.contains("old failed")));
    assert!(lines.iter().any(|l| l == "from new"));
    assert_eq!(viewer.state(), ConnectionState::Connected);
    assert_eq!(viewer.stats().stale_events_dropped, 2);
}

#[test]
fn test_frames_written_in_arrival_order() {
    let props = ViewerProps::new("prod", "web")
        .with_pods(vec![PodInfo::named("web-0")])
        .with_containers(["app"]);
    let (transport, mut viewer) = open(props);
    let g = viewer.generation();

    transport.emit(g, TransportEventKind::Opened);
    for chunk in ["a", "b\nc", "\nd\n"] {
        transport.emit(g, TransportEventKind::Frame(chunk.to_string()));
    }
    viewer.poll();

    let lines = surface_lines(&viewer);
    assert_eq!(&lines[lines.len() - 3..], &["ab", "c", "d"]);
}

// =============================================================================
// Properties 11-13
// =============================================================================

#[test]
fn test_error_stays_visible_after_close() {
    let props = ViewerProps::new("prod", "web")
        .with_pods(vec![PodInfo::named("web-0")])
        .with_containers(["app"]);
    let (transport, mut viewer) = open(props);
    let g = viewer.generation();

    transport.emit(g, TransportEventKind::Opened);
    transport.emit(g, TransportEventKind::Error("connection reset".to_string()));
    transport.emit(g, TransportEventKind::Closed);
    viewer.poll();

    assert_eq!(viewer.state(), ConnectionState::Errored);
    assert!(surface_lines(&viewer)
        .iter()
        .any(|l| l.contains("error: connection reset")));
    assert_eq!(transport.open_count(), 1);
}

#[test]
fn test_refresh_after_error_and_without_target() {
    let props = ViewerProps::new("prod", "web")
        .with_pods(vec![PodInfo::named("web-0")])
        .with_containers(["app"]);
    let (transport, mut viewer) = open(props);
    let g = viewer.generation();
    transport.emit(g, TransportEventKind::Error("boom".to_string()));
    viewer.poll();

    assert!(viewer.refresh());
    assert_eq!(viewer.state(), ConnectionState::Connecting);
    assert!(viewer.generation() > g);

    viewer.toggle_container("app");
    let opens = transport.open_count();
    assert!(!viewer.refresh());
    assert_eq!(transport.open_count(), opens);
}

#[test]
fn test_no_connection_before_initial_delay() {
    let transport = InProcessTransport::new();
    let settings = ViewerSettings {
        initial_connect_delay: Duration::from_millis(100),
        ..ViewerSettings::default()
    };
    let mut viewer = LogViewer::new(transport.clone(), settings);
    let opened = Instant::now();
    viewer.open(
        ViewerProps::new("prod", "web")
            .with_pods(three_pods())
            .with_containers(["app"])
            .with_pod_selector(true),
    );

    viewer.toggle_pod("web-0");
    viewer.toggle_pod("web-1");
    viewer.set_timestamps(true);
    assert!(!viewer.refresh());
    viewer.poll_at(opened);
    assert_eq!(transport.open_count(), 0);

    viewer.poll_at(opened + Duration::from_millis(150));
    assert_eq!(transport.open_count(), 1);
    let query = transport.last_query().unwrap();
    assert_eq!(query.get("pod"), Some("web-2"));
    assert_eq!(query.get("timestamps"), Some("true"));
}

// =============================================================================
// Discovery
// =============================================================================

#[tokio::test]
async fn test_discovery_populates_pickers_and_connects() {
    let discovery = FixedDiscovery {
        result: Ok(vec![
            DiscoveredPod {
                name: "api-7d9f-abcde".to_string(),
                status: Some("Running".to_string()),
                containers: vec!["api".to_string()],
                init_containers: vec!["wait-db".to_string()],
            },
            DiscoveredPod {
                name: "api-7d9f-fghij".to_string(),
                status: Some("Running".to_string()),
                containers: vec!["api".to_string()],
                init_containers: vec![],
            },
        ]),
    };
    let transport = InProcessTransport::new();
    let mut viewer =
        LogViewer::new(transport.clone(), immediate()).with_discovery(Arc::new(discovery));

    viewer.open(
        ViewerProps::new("prod", "api")
            .with_selector("app=api")
            .with_pod_selector(true),
    );
    viewer.poll();
    assert_eq!(transport.open_count(), 0);

    settle(&mut viewer).await;

    assert_eq!(viewer.pod_options().len(), 2);
    assert_eq!(viewer.container_options().len(), 2);
    let query = transport.last_query().unwrap();
    assert_eq!(query.get("pod"), Some("ALL"));
    assert_eq!(query.get("container"), Some("api"));
    assert_eq!(query.get("selector"), Some("app=api"));
}

#[tokio::test]
async fn test_discovery_failure_keeps_previous_options() {
    let discovery = FixedDiscovery {
        result: Err("cluster unreachable".to_string()),
    };
    let transport = InProcessTransport::new();
    let mut viewer =
        LogViewer::new(transport.clone(), immediate()).with_discovery(Arc::new(discovery));

    viewer.open(
        ViewerProps::new("prod", "api")
            .with_selector("app=api")
            .with_containers(["api"])
            .with_pod_selector(true),
    );
    viewer.poll();
    let generation = viewer.generation();
    let state = viewer.state();

    settle(&mut viewer).await;

    assert!(viewer.is_open());
    assert!(viewer.pod_options().is_empty());
    assert_eq!(viewer.container_options().len(), 1);
    assert_eq!(viewer.generation(), generation);
    assert_eq!(viewer.state(), state);
    assert_eq!(transport.open_count(), 1);
}

// =============================================================================
// Configuration into the viewer
// =============================================================================

#[test]
fn test_config_display_defaults_reach_selection() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[stream]\ninitial_connect_delay_ms = 0\n\n[display]\nwrap = true\ntimestamps = true\n")
        .unwrap();
    let config = load_config_with_env(Some(file.path().to_path_buf()), |_| None).unwrap();

    let transport = InProcessTransport::new();
    let mut viewer = LogViewer::new(transport.clone(), config.viewer_settings());
    viewer.open(
        ViewerProps::new("prod", "web")
            .with_pods(vec![PodInfo::named("web-0")])
            .with_containers(["app"]),
    );
    viewer.poll();
    viewer.observe_geometry(HostGeometry::new(72, 20));

    assert!(viewer.selection().unwrap().wrap_lines());
    assert_eq!(viewer.surface().unwrap().grid().columns, 72);
    assert_eq!(transport.last_query().unwrap().get("timestamps"), Some("true"));
}
