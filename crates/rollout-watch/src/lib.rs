//! Node rollout detection and state sampling for rollout-helper.
//!
//! `rollout-watch` observes cluster nodes and reports when they enter or
//! leave an OS rollout. It has three pieces:
//!
//! - **Cluster view**: a narrow trait over the node and pod listings the
//!   watcher needs, so the sampler can run against a real API server or an
//!   in-memory fake.
//! - **Rolling detection**: the policy that classifies a node as rolling
//!   from its annotations and taints.
//! - **State sampler**: a polling loop that tracks which nodes are rolling
//!   and emits an event only when a node's state changes.
//!
//! # Example
//!
//! ```rust
//! use rollout_watch::{is_rolling, NodeRecord, NodeSampler, SamplerConfig};
//! use rollout_watch::rolling::{MACHINE_CONFIG_STATE_ANNOTATION, STATE_WORKING};
//!
//! let node = NodeRecord::new("worker-1")
//!     .with_annotation(MACHINE_CONFIG_STATE_ANNOTATION, STATE_WORKING);
//! assert!(is_rolling(&node));
//!
//! let done = NodeRecord::new("worker-2")
//!     .with_annotation(MACHINE_CONFIG_STATE_ANNOTATION, "Done");
//! assert!(!is_rolling(&done));
//! ```
//!
//! The sampler only reports transitions. A node that stays rolling across
//! many polls produces a single event when the rollout starts and a single
//! event when it ends:
//!
//! ```rust
//! use std::sync::Arc;
//! use rollout_watch::{FakeCluster, NodeRecord, NodeSampler, SamplerConfig};
//! use rollout_watch::rolling::WAIT_FOR_RUNC_TAINT;
//!
//! let cluster = Arc::new(FakeCluster::new());
//! let (mut sampler, _events) = NodeSampler::new(cluster, SamplerConfig::default());
//!
//! let rolling = vec![NodeRecord::new("worker-1").with_taint(WAIT_FOR_RUNC_TAINT)];
//! assert_eq!(sampler.observe(&rolling).len(), 1);
//! // Same state again: nothing new to report.
//! assert!(sampler.observe(&rolling).is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cluster;
pub mod error;
pub mod rolling;
pub mod sampler;

// Re-export main types at crate root
pub use cluster::{ClusterView, FakeCluster, NodeRecord, PodRecord};
pub use error::{ClusterError, Result};
pub use rolling::is_rolling;
pub use sampler::{NodeSampler, NodeState, SamplerConfig};
