//! Silence lifecycle reconciliation.
//!
//! One reconciler instance owns the silenced-node set and is driven by a
//! single consumer task, so there is never write contention on the set.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use rollout_watch::{ClusterView, PodRecord};

use crate::error::Result;
use crate::registry::SilenceRegistry;
use crate::shapes::{DAEMONSET_TARGETS, instance_silence, node_silence, pod_silence};

/// Configuration for the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Validity window of every created silence.
    ///
    /// A silence outliving its node's rollout is harmless for this long at
    /// most; if the deletion path never runs, the registry expires it.
    pub silence_ttl: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            silence_ttl: Duration::minutes(90),
        }
    }
}

/// Turns node rollout transitions into silence create/delete calls.
///
/// The silenced set holds exactly the node names the reconciler believes
/// to have active silences in the registry. It makes the handler
/// idempotent: a duplicate rolling-start for a tracked node is a no-op,
/// as is a rolling-stop for an untracked one.
pub struct SilenceReconciler {
    registry: Arc<dyn SilenceRegistry>,
    cluster: Arc<dyn ClusterView>,
    config: ReconcilerConfig,
    silenced: HashSet<String>,
}

impl SilenceReconciler {
    /// Create a reconciler with an empty silenced set.
    #[must_use]
    pub fn new(
        registry: Arc<dyn SilenceRegistry>,
        cluster: Arc<dyn ClusterView>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            registry,
            cluster,
            config,
            silenced: HashSet::new(),
        }
    }

    /// Rebuild the silenced set from the registry.
    ///
    /// Run once before consuming transitions, so a process restart picks
    /// up the silences a previous instance created. Owned silences that
    /// already expired are deleted along the way. Best effort throughout:
    /// a failed listing leaves the set empty, a failed deletion leaves the
    /// stale silence for the registry's own expiry to handle.
    pub async fn recover(&mut self) {
        let silences = match self.registry.list().await {
            Ok(silences) => silences,
            Err(err) => {
                warn!(error = %err, "failed to list existing silences, starting empty");
                return;
            }
        };

        let now = Utc::now();
        for silence in silences.iter().filter(|s| s.is_owned()) {
            if silence.is_expired(now) {
                let Some(id) = silence.id.as_deref() else {
                    continue;
                };
                match self.registry.delete_by_id(id).await {
                    Ok(()) => info!(id = %id, "deleted expired silence"),
                    Err(err) => warn!(id = %id, error = %err, "failed to delete expired silence"),
                }
                continue;
            }

            for node in silence.node_matcher_values() {
                if self.silenced.insert(node.to_string()) {
                    info!(node = %node, "recovered existing silence");
                }
            }
        }
    }

    /// Apply one rollout transition.
    ///
    /// Creation failures are logged and swallowed; the node is still
    /// marked silenced so the loop never hammers the registry with
    /// re-creates. Deletion failures propagate, and the node stays marked
    /// so a later transition retries the cleanup.
    ///
    /// # Errors
    ///
    /// Returns an error if silences for a completed node could not be
    /// deleted.
    pub async fn handle_node_state(&mut self, name: &str, is_rolling: bool) -> Result<()> {
        if is_rolling {
            if self.silenced.contains(name) {
                debug!(node = %name, "silences already exist, ignoring");
                return Ok(());
            }

            self.create_silences(name).await;
            self.silenced.insert(name.to_string());
            info!(node = %name, "silenced rolling node");
            Ok(())
        } else {
            if !self.silenced.contains(name) {
                return Ok(());
            }

            let deleted = self.registry.delete_for_node(name).await?;
            self.silenced.remove(name);
            info!(node = %name, deleted, "unsilenced completed node");
            Ok(())
        }
    }

    /// Whether the reconciler believes `name` has active silences.
    #[must_use]
    pub fn is_silenced(&self, name: &str) -> bool {
        self.silenced.contains(name)
    }

    /// Number of nodes currently marked silenced.
    #[must_use]
    pub fn silenced_count(&self) -> usize {
        self.silenced.len()
    }

    async fn create_silences(&self, node: &str) {
        let ttl = self.config.silence_ttl;

        if let Err(err) = self.registry.create(&node_silence(node, ttl)).await {
            warn!(node = %node, error = %err, "failed to create node-scoped silence");
        }

        if let Err(err) = self.registry.create(&instance_silence(node, ttl)).await {
            warn!(node = %node, error = %err, "failed to create instance-scoped silence");
        }

        let pods = self.daemonset_pods_on(node).await;
        match pod_silence(node, &pods, ttl) {
            Some(silence) => {
                if let Err(err) = self.registry.create(&silence).await {
                    warn!(node = %node, error = %err, "failed to create pod-scoped silence");
                }
            }
            None => debug!(node = %node, "no daemonset pods on node, skipping pod silence"),
        }
    }

    /// Union of the watched DaemonSets' pods on `node`.
    ///
    /// A failed listing for one DaemonSet drops only that DaemonSet's
    /// pods from the union.
    async fn daemonset_pods_on(&self, node: &str) -> Vec<PodRecord> {
        let mut pods = Vec::new();
        for target in DAEMONSET_TARGETS {
            match self
                .cluster
                .pods_on_node(target.namespace, target.label_selector, node)
                .await
            {
                Ok(found) => pods.extend(found),
                Err(err) => warn!(
                    daemonset = %target.name,
                    namespace = %target.namespace,
                    error = %err,
                    "failed to list daemonset pods"
                ),
            }
        }
        pods
    }
}
