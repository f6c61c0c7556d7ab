//! Node state sampling loop.
//!
//! The sampler polls the node list on a fixed interval, classifies each
//! node with [`is_rolling`], and emits a [`NodeState`] event only when a
//! node's classification changed since the previous poll. Steady state
//! produces no traffic at all.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use crate::cluster::{ClusterView, NodeRecord};
use crate::rolling::is_rolling;

/// A node rollout transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeState {
    /// Node name.
    pub name: String,
    /// Whether the node is rolling after this transition.
    pub is_rolling: bool,
}

/// Configuration for the sampling loop.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Interval between polls of the node list.
    pub interval: Duration,
    /// Capacity of the transition event channel.
    pub channel_capacity: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            channel_capacity: 16,
        }
    }
}

/// Polls the cluster and reports rollout transitions.
///
/// The sampler owns the set of node names it currently considers rolling.
/// A name enters the set when its rollout starts and leaves when the
/// rollout ends, so absence always means "last known state was
/// not-rolling" and the set never grows beyond the nodes mid-rollout at
/// any moment.
pub struct NodeSampler {
    cluster: Arc<dyn ClusterView>,
    config: SamplerConfig,
    rolling: HashSet<String>,
    events: mpsc::Sender<NodeState>,
}

impl NodeSampler {
    /// Create a sampler and the receiving end of its event channel.
    #[must_use]
    pub fn new(
        cluster: Arc<dyn ClusterView>,
        config: SamplerConfig,
    ) -> (Self, mpsc::Receiver<NodeState>) {
        let (events, rx) = mpsc::channel(config.channel_capacity);
        let sampler = Self {
            cluster,
            config,
            rolling: HashSet::new(),
            events,
        };
        (sampler, rx)
    }

    /// Diff one poll's node list against the tracked set.
    ///
    /// Updates the tracked set and returns the transitions in listing
    /// order. Nodes whose classification did not change produce nothing.
    pub fn observe(&mut self, nodes: &[NodeRecord]) -> Vec<NodeState> {
        let mut transitions = Vec::new();

        for node in nodes {
            let now_rolling = is_rolling(node);
            let was_rolling = self.rolling.contains(&node.name);
            if now_rolling == was_rolling {
                continue;
            }

            if now_rolling {
                self.rolling.insert(node.name.clone());
            } else {
                self.rolling.remove(&node.name);
            }

            transitions.push(NodeState {
                name: node.name.clone(),
                is_rolling: now_rolling,
            });
        }

        transitions
    }

    /// Check whether a node is currently tracked as rolling.
    #[must_use]
    pub fn is_tracking(&self, name: &str) -> bool {
        self.rolling.contains(name)
    }

    /// Number of nodes currently tracked as rolling.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.rolling.len()
    }

    /// Run the polling loop until shutdown.
    ///
    /// A failed node listing is logged and skipped; the loop carries on at
    /// the next tick. Sends into a full event channel block the loop,
    /// which is the intended backpressure when the consumer falls behind.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.config.interval);

        info!(
            interval_secs = self.config.interval.as_secs(),
            "node sampler started"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("node sampler shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    let nodes = match self.cluster.list_nodes().await {
                        Ok(nodes) => nodes,
                        Err(err) => {
                            warn!(error = %err, "failed to list nodes, skipping sample");
                            continue;
                        }
                    };

                    for event in self.observe(&nodes) {
                        info!(
                            node = %event.name,
                            rolling = event.is_rolling,
                            "node state changed"
                        );
                        if self.events.send(event).await.is_err() {
                            info!("event channel closed, stopping sampler");
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::FakeCluster;
    use crate::rolling::{MACHINE_CONFIG_STATE_ANNOTATION, STATE_DONE, STATE_WORKING};

    fn working(name: &str) -> NodeRecord {
        NodeRecord::new(name).with_annotation(MACHINE_CONFIG_STATE_ANNOTATION, STATE_WORKING)
    }

    fn done(name: &str) -> NodeRecord {
        NodeRecord::new(name).with_annotation(MACHINE_CONFIG_STATE_ANNOTATION, STATE_DONE)
    }

    fn sampler() -> NodeSampler {
        let (sampler, rx) = NodeSampler::new(Arc::new(FakeCluster::new()), SamplerConfig::default());
        // The receiver is unused in pure observe tests.
        drop(rx);
        sampler
    }

    #[test]
    fn default_config_matches_deployment() {
        let config = SamplerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.channel_capacity, 16);
    }

    #[test]
    fn first_rolling_observation_emits_event() {
        let mut sampler = sampler();
        let events = sampler.observe(&[working("worker-1")]);
        assert_eq!(
            events,
            vec![NodeState {
                name: "worker-1".to_string(),
                is_rolling: true,
            }]
        );
        assert!(sampler.is_tracking("worker-1"));
    }

    #[test]
    fn steady_states_emit_nothing() {
        let mut sampler = sampler();
        let nodes = vec![working("worker-1"), done("worker-2")];

        let events = sampler.observe(&nodes);
        assert_eq!(events.len(), 1);

        // Unchanged poll after poll.
        assert!(sampler.observe(&nodes).is_empty());
        assert!(sampler.observe(&nodes).is_empty());
    }

    #[test]
    fn completion_emits_not_rolling_and_stops_tracking() {
        let mut sampler = sampler();
        sampler.observe(&[working("worker-1")]);

        let events = sampler.observe(&[done("worker-1")]);
        assert_eq!(
            events,
            vec![NodeState {
                name: "worker-1".to_string(),
                is_rolling: false,
            }]
        );
        assert!(!sampler.is_tracking("worker-1"));
        assert_eq!(sampler.tracked_count(), 0);
    }

    #[test]
    fn never_rolling_node_is_never_reported() {
        let mut sampler = sampler();
        assert!(sampler.observe(&[done("worker-1")]).is_empty());
        assert!(sampler.observe(&[NodeRecord::new("worker-1")]).is_empty());
        assert_eq!(sampler.tracked_count(), 0);
    }

    #[test]
    fn full_cycle_per_node() {
        let mut sampler = sampler();

        // worker-1 rolls, worker-2 stays put.
        let events = sampler.observe(&[working("worker-1"), done("worker-2")]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "worker-1");

        // worker-2 starts while worker-1 finishes.
        let events = sampler.observe(&[done("worker-1"), working("worker-2")]);
        assert_eq!(events.len(), 2);
        assert!(events.contains(&NodeState {
            name: "worker-1".to_string(),
            is_rolling: false,
        }));
        assert!(events.contains(&NodeState {
            name: "worker-2".to_string(),
            is_rolling: true,
        }));
        assert_eq!(sampler.tracked_count(), 1);
    }

    #[tokio::test]
    async fn run_emits_transitions_over_channel() {
        let cluster = Arc::new(FakeCluster::new());
        cluster.set_nodes(vec![working("worker-1")]).await;

        let config = SamplerConfig {
            interval: Duration::from_millis(10),
            channel_capacity: 16,
        };
        let (sampler, mut rx) = NodeSampler::new(cluster.clone(), config);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(sampler.run(shutdown_rx));

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timeout waiting for transition")
            .expect("channel closed");
        assert_eq!(event.name, "worker-1");
        assert!(event.is_rolling);

        // Flip the node to done and expect the completion event.
        cluster.set_nodes(vec![done("worker-1")]).await;
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timeout waiting for completion")
            .expect("channel closed");
        assert!(!event.is_rolling);

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn run_survives_listing_failures() {
        let cluster = Arc::new(FakeCluster::new());
        cluster.fail_requests(true);

        let config = SamplerConfig {
            interval: Duration::from_millis(10),
            channel_capacity: 16,
        };
        let (sampler, mut rx) = NodeSampler::new(cluster.clone(), config);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(sampler.run(shutdown_rx));

        // Let a few failing polls pass, then recover.
        tokio::time::sleep(Duration::from_millis(50)).await;
        cluster.set_nodes(vec![working("worker-1")]).await;
        cluster.fail_requests(false);

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timeout waiting for recovery")
            .expect("channel closed");
        assert_eq!(event.name, "worker-1");

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn run_blocks_on_full_channel_without_dropping() {
        let cluster = Arc::new(FakeCluster::new());
        cluster
            .set_nodes(vec![
                working("worker-1"),
                working("worker-2"),
                working("worker-3"),
            ])
            .await;

        // One slot forces the second send of the first poll to wait on the
        // consumer.
        let config = SamplerConfig {
            interval: Duration::from_millis(10),
            channel_capacity: 1,
        };
        let (sampler, mut rx) = NodeSampler::new(cluster.clone(), config);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(sampler.run(shutdown_rx));

        // Every transition still arrives, in listing order.
        for expected in ["worker-1", "worker-2", "worker-3"] {
            let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("timeout draining transitions")
                .expect("channel closed");
            assert_eq!(event.name, expected);
            assert!(event.is_rolling);
        }

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let cluster = Arc::new(FakeCluster::new());
        let (sampler, _rx) = NodeSampler::new(cluster, SamplerConfig::default());

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(sampler.run(shutdown_rx));

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sampler did not stop")
            .unwrap();
    }
}
