//! Cluster view trait and record types.
//!
//! The watcher only needs two reads from the cluster: the node list and
//! the pods of a DaemonSet on one node. [`ClusterView`] captures exactly
//! that, so production code can back it with the API server while tests
//! run against [`FakeCluster`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::error::{ClusterError, Result};

/// A node as seen by the watcher.
///
/// Only the fields that feed rollout detection are carried: the name, the
/// annotations, and the keys of the taints. Everything else the API server
/// reports about a node is dropped at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Node name.
    pub name: String,
    /// Node annotations.
    pub annotations: HashMap<String, String>,
    /// Keys of the taints present on the node.
    pub taint_keys: Vec<String>,
}

impl NodeRecord {
    /// Create a record with no annotations and no taints.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: HashMap::new(),
            taint_keys: Vec::new(),
        }
    }

    /// Add an annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Add a taint key.
    #[must_use]
    pub fn with_taint(mut self, key: impl Into<String>) -> Self {
        self.taint_keys.push(key.into());
        self
    }

    /// Look up an annotation value.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// Check whether a taint with the given key is present.
    #[must_use]
    pub fn has_taint(&self, key: &str) -> bool {
        self.taint_keys.iter().any(|k| k == key)
    }
}

/// A pod as seen by the watcher: just enough identity to build matchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRecord {
    /// Pod name.
    pub name: String,
    /// Namespace the pod lives in.
    pub namespace: String,
}

impl PodRecord {
    /// Create a pod record.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

/// Read-only view of the cluster state the watcher cares about.
pub trait ClusterView: Send + Sync {
    /// List all nodes in the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the node list cannot be fetched or decoded.
    fn list_nodes<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<NodeRecord>>> + Send + 'a>>;

    /// List pods in `namespace` matching `label_selector` that are scheduled
    /// on `node`.
    ///
    /// The selector is a single `key=value` pair, the form DaemonSets are
    /// identified by here.
    ///
    /// # Errors
    ///
    /// Returns an error if the pod list cannot be fetched or decoded.
    fn pods_on_node<'a>(
        &'a self,
        namespace: &'a str,
        label_selector: &'a str,
        node: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PodRecord>>> + Send + 'a>>;
}

/// A pod held by [`FakeCluster`], with the placement and labels the real
/// API server would filter on.
#[derive(Debug, Clone)]
struct FakePod {
    record: PodRecord,
    node: String,
    labels: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct FakeClusterState {
    nodes: Vec<NodeRecord>,
    pods: Vec<FakePod>,
}

/// In-memory cluster view for testing.
///
/// Holds nodes and pods behind an async lock and answers the two
/// [`ClusterView`] queries the way the API server would. Requests can be
/// made to fail to exercise error paths.
#[derive(Debug, Default)]
pub struct FakeCluster {
    state: RwLock<FakeClusterState>,
    fail: AtomicBool,
}

impl FakeCluster {
    /// Create an empty fake cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the node list.
    pub async fn set_nodes(&self, nodes: Vec<NodeRecord>) {
        self.state.write().await.nodes = nodes;
    }

    /// Add a pod scheduled on `node` with the given labels.
    pub async fn add_pod(
        &self,
        name: impl Into<String>,
        namespace: impl Into<String>,
        node: impl Into<String>,
        labels: &[(&str, &str)],
    ) {
        let pod = FakePod {
            record: PodRecord::new(name, namespace),
            node: node.into(),
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        };
        self.state.write().await.pods.push(pod);
    }

    /// Make every subsequent request fail (or succeed again).
    pub fn fail_requests(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClusterError::Request {
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn selector_matches(labels: &HashMap<String, String>, selector: &str) -> bool {
    match selector.split_once('=') {
        Some((key, value)) => labels.get(key).is_some_and(|v| v == value),
        None => false,
    }
}

impl ClusterView for FakeCluster {
    fn list_nodes<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<NodeRecord>>> + Send + 'a>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.state.read().await.nodes.clone())
        })
    }

    fn pods_on_node<'a>(
        &'a self,
        namespace: &'a str,
        label_selector: &'a str,
        node: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PodRecord>>> + Send + 'a>> {
        Box::pin(async move {
            self.check_available()?;
            let state = self.state.read().await;
            Ok(state
                .pods
                .iter()
                .filter(|p| {
                    p.record.namespace == namespace
                        && p.node == node
                        && selector_matches(&p.labels, label_selector)
                })
                .map(|p| p.record.clone())
                .collect())
        })
    }
}
