//! Pod Discovery
//!
//! Looks up the concrete pods (and their containers) behind a label selector
//! so the pickers can be populated when the caller did not pass a static pod
//! list. The lookup is a plain Kubernetes-style `PodList` GET.
//!
//! Discovery failures never reach the stream: the viewer logs them and keeps
//! whatever options it already had.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::selection::{ContainerInfo, PodInfo};

/// Header carrying the cluster context on discovery requests (omitted when empty)
pub const CONTEXT_HEADER: &str = "X-Cluster-Context";

/// Errors from a discovery lookup
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The HTTP request failed
    #[error("Discovery request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("Discovery returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for the log
        body: String,
    },

    /// The API base URL is unusable
    #[error("Invalid discovery URL: {0}")]
    InvalidUrl(String),

    /// The response was not a pod list
    #[error("Failed to parse pod list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One pod found by discovery
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscoveredPod {
    /// Pod name
    pub name: String,
    /// Phase, e.g. `Running`
    pub status: Option<String>,
    /// Regular container names
    pub containers: Vec<String>,
    /// Init container names
    pub init_containers: Vec<String>,
}

impl DiscoveredPod {
    /// Picker entry for this pod
    #[must_use]
    pub fn pod_info(&self) -> PodInfo {
        PodInfo {
            name: self.name.clone(),
            status: self.status.clone(),
        }
    }
}

/// Union of container names across pods, regular first, in first-seen order
#[must_use]
pub fn merge_containers(pods: &[DiscoveredPod]) -> Vec<ContainerInfo> {
    let mut regular: Vec<ContainerInfo> = Vec::new();
    let mut init: Vec<ContainerInfo> = Vec::new();
    for pod in pods {
        for name in &pod.containers {
            if !regular.iter().any(|c| &c.name == name) {
                regular.push(ContainerInfo::regular(name.clone()));
            }
        }
        for name in &pod.init_containers {
            if !init.iter().any(|c| &c.name == name) {
                init.push(ContainerInfo::init(name.clone()));
            }
        }
    }
    regular.extend(init);
    regular
}

/// Source of pod lists
#[async_trait]
pub trait PodDiscovery: Send + Sync {
    /// List the pods in `namespace`, filtered by `selector` when given
    async fn discover(
        &self,
        context: &str,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<DiscoveredPod>, DiscoveryError>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// Discovery against a Kubernetes-compatible REST API
#[derive(Clone, Debug)]
pub struct HttpPodDiscovery {
    api_base: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl HttpPodDiscovery {
    /// Create a client for `api_base` (e.g. `http://127.0.0.1:4654`)
    #[must_use]
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_base: api_base.into(),
            timeout,
            http_client: reqwest::Client::new(),
        }
    }

    /// `{api_base}/api/v1/namespaces/{namespace}/pods[?labelSelector=...]`
    pub fn pods_url(&self, namespace: &str, selector: Option<&str>) -> Result<Url, DiscoveryError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| DiscoveryError::InvalidUrl(format!("{}: {e}", self.api_base)))?;
        url.path_segments_mut()
            .map_err(|()| DiscoveryError::InvalidUrl(self.api_base.clone()))?
            .pop_if_empty()
            .extend(["api", "v1", "namespaces", namespace, "pods"]);
        if let Some(selector) = selector.filter(|s| !s.is_empty()) {
            url.query_pairs_mut().append_pair("labelSelector", selector);
        }
        Ok(url)
    }
}

#[async_trait]
impl PodDiscovery for HttpPodDiscovery {
    async fn discover(
        &self,
        context: &str,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<DiscoveredPod>, DiscoveryError> {
        let url = self.pods_url(namespace, selector)?;
        tracing::debug!(%url, context, "discovering pods");

        let mut request = self.http_client.get(url).timeout(self.timeout);
        if !context.is_empty() {
            request = request.header(CONTEXT_HEADER, context);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::Status { status, body });
        }

        let body = response.text().await?;
        let pods = parse_pod_list(&body)?;
        tracing::debug!(count = pods.len(), namespace, "pods discovered");
        Ok(pods)
    }
}

// ============================================================================
// PodList wire shape
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodList {
    items: Vec<Pod>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Pod {
    metadata: PodMetadata,
    spec: PodSpec,
    status: PodStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodMetadata {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PodSpec {
    containers: Vec<NamedContainer>,
    init_containers: Vec<NamedContainer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NamedContainer {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodStatus {
    phase: Option<String>,
}

/// Parse a `PodList` JSON document
pub fn parse_pod_list(body: &str) -> Result<Vec<DiscoveredPod>, DiscoveryError> {
    let list: PodList = serde_json::from_str(body)?;
    Ok(list
        .items
        .into_iter()
        .filter(|pod| !pod.metadata.name.is_empty())
        .map(|pod| DiscoveredPod {
            name: pod.metadata.name,
            status: pod.status.phase,
            containers: pod.spec.containers.into_iter().map(|c| c.name).collect(),
            init_containers: pod.spec.init_containers.into_iter().map(|c| c.name).collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const POD_LIST: &str = r#"{
        "kind": "PodList",
        "items": [
            {
                "metadata": {"name": "web-0"},
                "spec": {
                    "initContainers": [{"name": "migrate"}],
                    "containers": [{"name": "app"}, {"name": "sidecar"}]
                },
                "status": {"phase": "Running"}
            },
            {
                "metadata": {"name": "web-1"},
                "spec": {"containers": [{"name": "app"}]},
                "status": {"phase": "Pending"}
            }
        ]
    }"#;

    #[test]
    fn test_parse_pod_list() {
        let pods = parse_pod_list(POD_LIST).unwrap();
        assert_eq!(pods.len(), 2);
        assert_eq!(pods[0].name, "web-0");
        assert_eq!(pods[0].status.as_deref(), Some("Running"));
        assert_eq!(pods[0].containers, vec!["app", "sidecar"]);
        assert_eq!(pods[0].init_containers, vec!["migrate"]);
        assert!(pods[1].init_containers.is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_pod_list("<html>"), Err(DiscoveryError::Parse(_))));
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_pod_list(r#"{"items": []}"#).unwrap().is_empty());
        assert!(parse_pod_list("{}").unwrap().is_empty());
    }

    #[test]
    fn test_merge_containers() {
        let pods = parse_pod_list(POD_LIST).unwrap();
        let merged = merge_containers(&pods);
        assert_eq!(
            merged,
            vec![
                ContainerInfo::regular("app"),
                ContainerInfo::regular("sidecar"),
                ContainerInfo::init("migrate"),
            ]
        );
    }

    #[test]
    fn test_pods_url() {
        let discovery = HttpPodDiscovery::new("http://127.0.0.1:4654/", Duration::from_secs(1));
        let url = discovery.pods_url("web", Some("app=web")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:4654/api/v1/namespaces/web/pods?labelSelector=app%3Dweb"
        );

        let plain = discovery.pods_url("web", None).unwrap();
        assert_eq!(plain.query(), None);
    }

    #[test]
    fn test_pods_url_invalid_base() {
        let discovery = HttpPodDiscovery::new("nope", Duration::from_secs(1));
        assert!(matches!(
            discovery.pods_url("web", None),
            Err(DiscoveryError::InvalidUrl(_))
        ));
    }

    /// One-shot HTTP server returning `status` and `body`, yielding the request text
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_http_discovery_sends_context_header() {
        let (base, server) = serve_once("200 OK", POD_LIST).await;
        let discovery = HttpPodDiscovery::new(base, Duration::from_secs(5));

        let pods = discovery.discover("prod", "web", Some("app=web")).await.unwrap();
        assert_eq!(pods.len(), 2);

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /api/v1/namespaces/web/pods?labelselector=app%3dweb"));
        assert!(request.contains("x-cluster-context: prod"));
    }

    #[tokio::test]
    async fn test_http_discovery_omits_empty_context() {
        let (base, server) = serve_once("200 OK", POD_LIST).await;
        let discovery = HttpPodDiscovery::new(base, Duration::from_secs(5));

        discovery.discover("", "web", None).await.unwrap();

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /api/v1/namespaces/web/pods "));
        assert!(!request.contains("x-cluster-context"));
    }

    #[tokio::test]
    async fn test_http_discovery_status_error() {
        let (base, _server) = serve_once("403 Forbidden", r#"{"message":"denied"}"#).await;
        let discovery = HttpPodDiscovery::new(base, Duration::from_secs(5));

        let err = discovery.discover("prod", "web", None).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Status { status: 403, .. }));
    }

    #[test]
    fn test_http_discovery_unreachable() {
        let discovery = HttpPodDiscovery::new("http://127.0.0.1:1", Duration::from_secs(2));
        let result = tokio_test::block_on(discovery.discover("prod", "web", None));
        let err = tokio_test::assert_err!(result);
        assert!(matches!(err, DiscoveryError::Request(_)));
    }
}
