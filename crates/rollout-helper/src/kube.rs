//! Minimal Kubernetes API client backing the cluster view.
//!
//! Speaks just enough of the core v1 API to list nodes and pods. Inside a
//! cluster the client picks up the service-account environment; outside,
//! an explicit endpoint and token file can be supplied.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::debug;

use rollout_watch::{ClusterError, ClusterView, NodeRecord, PodRecord};

use crate::error::{HelperError, Result};

/// Mount point of the service-account credentials inside a pod.
const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Per-request timeout, well below the sampling interval so a hung API
/// server cannot stack requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct NodeList {
    #[serde(default)]
    items: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct Node {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    spec: NodeSpec,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    annotations: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct NodeSpec {
    #[serde(default)]
    taints: Vec<Taint>,
}

#[derive(Debug, Deserialize)]
struct Taint {
    key: String,
}

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    #[serde(default)]
    metadata: ObjectMeta,
}

fn node_record(node: Node) -> NodeRecord {
    NodeRecord {
        name: node.metadata.name,
        annotations: node.metadata.annotations,
        taint_keys: node.spec.taints.into_iter().map(|taint| taint.key).collect(),
    }
}

fn pod_record(pod: Pod) -> PodRecord {
    PodRecord::new(pod.metadata.name, pod.metadata.namespace)
}

fn check_ok(status: StatusCode) -> rollout_watch::Result<()> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(ClusterError::UnexpectedStatus {
            status: status.as_u16(),
        })
    }
}

fn read_token(path: &Path) -> Result<String> {
    let token = std::fs::read_to_string(path).map_err(|err| {
        HelperError::Config(format!(
            "failed to read token file '{}': {}",
            path.display(),
            err
        ))
    })?;

    Ok(token.trim().to_string())
}

/// Client for the Kubernetes API server.
///
/// Implements [`ClusterView`] with the two listings the sampler and the
/// reconciler need. Only the fields they read are deserialized; everything
/// else in the API responses is ignored.
#[derive(Debug, Clone)]
pub struct KubeClient {
    base_url: String,
    auth_header: Option<String>,
    http: reqwest::Client,
}

impl KubeClient {
    /// Create a client from the in-cluster service-account environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the `KUBERNETES_SERVICE_HOST`/`_PORT` variables
    /// are unset or the service-account token and CA bundle cannot be read.
    pub fn in_cluster() -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
            HelperError::Config(
                "KUBERNETES_SERVICE_HOST is not set; use --kube-api-url outside a cluster"
                    .to_string(),
            )
        })?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").map_err(|_| {
            HelperError::Config(
                "KUBERNETES_SERVICE_PORT is not set; use --kube-api-url outside a cluster"
                    .to_string(),
            )
        })?;

        let dir = Path::new(SERVICE_ACCOUNT_DIR);
        let token = read_token(&dir.join("token"))?;
        let ca_path = dir.join("ca.crt");
        let ca_pem = std::fs::read(&ca_path).map_err(|err| {
            HelperError::Config(format!(
                "failed to read CA bundle '{}': {}",
                ca_path.display(),
                err
            ))
        })?;

        Self::build(format!("https://{host}:{port}"), Some(token), Some(&ca_pem))
    }

    /// Create a client for an explicit API endpoint.
    ///
    /// The endpoint's certificate must be trusted by the system roots. A
    /// token file is optional, for endpoints such as a local `kubectl proxy`
    /// that need no credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the token file cannot be read or the HTTP client
    /// cannot be constructed.
    pub fn with_endpoint(base_url: &str, token_path: Option<&Path>) -> Result<Self> {
        let token = token_path.map(read_token).transpose()?;
        Self::build(base_url.trim_end_matches('/').to_string(), token, None)
    }

    fn build(base_url: String, token: Option<String>, ca_pem: Option<&[u8]>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);

        if let Some(pem) = ca_pem {
            let cert = reqwest::Certificate::from_pem(pem)
                .map_err(|err| HelperError::Kube(format!("invalid CA bundle: {err}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|err| HelperError::Kube(err.to_string()))?;

        Ok(Self {
            base_url,
            auth_header: token.map(|token| format!("Bearer {token}")),
            http,
        })
    }

    /// API server base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.http.get(url);
        match &self.auth_header {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        }
    }
}

impl ClusterView for KubeClient {
    fn list_nodes<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = rollout_watch::Result<Vec<NodeRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/api/v1/nodes", self.base_url);
            let response =
                self.get(&url)
                    .send()
                    .await
                    .map_err(|err| ClusterError::Request {
                        reason: err.to_string(),
                    })?;

            check_ok(response.status())?;

            let body = response.text().await.map_err(|err| ClusterError::Request {
                reason: err.to_string(),
            })?;
            let list: NodeList =
                serde_json::from_str(&body).map_err(|err| ClusterError::Decode {
                    reason: err.to_string(),
                })?;

            debug!(count = list.items.len(), "listed nodes");
            Ok(list.items.into_iter().map(node_record).collect())
        })
    }

    fn pods_on_node<'a>(
        &'a self,
        namespace: &'a str,
        label_selector: &'a str,
        node: &'a str,
    ) -> Pin<Box<dyn Future<Output = rollout_watch::Result<Vec<PodRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/api/v1/namespaces/{namespace}/pods", self.base_url);
            let field_selector = format!("spec.nodeName={node}");
            let response = self
                .get(&url)
                .query(&[
                    ("fieldSelector", field_selector.as_str()),
                    ("labelSelector", label_selector),
                ])
                .send()
                .await
                .map_err(|err| ClusterError::Request {
                    reason: err.to_string(),
                })?;

            check_ok(response.status())?;

            let body = response.text().await.map_err(|err| ClusterError::Request {
                reason: err.to_string(),
            })?;
            let list: PodList = serde_json::from_str(&body).map_err(|err| ClusterError::Decode {
                reason: err.to_string(),
            })?;

            debug!(
                namespace = %namespace,
                node = %node,
                count = list.items.len(),
                "listed pods"
            );
            Ok(list.items.into_iter().map(pod_record).collect())
        })
    }
}
