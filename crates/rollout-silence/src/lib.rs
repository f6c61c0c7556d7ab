//! Alertmanager silence lifecycle management for rollout-helper.
//!
//! When a node starts an OS rollout, its workloads go dark in ways the
//! alerting stack is not supposed to page anyone about. This crate creates
//! tightly scoped Alertmanager silences for the duration of the rollout
//! and removes them again once the node is back.
//!
//! # Pieces
//!
//! - **Wire model** ([`Silence`], [`Matcher`]): the Alertmanager v2 silence
//!   object, plus the ownership and node-correlation lookups.
//! - **Shapes** ([`shapes`]): the three silence policies created per node
//!   (node-scoped, instance-scoped, pod-scoped).
//! - **Registry** ([`SilenceRegistry`]): create/list/delete against the
//!   silence store, implemented by [`AlertmanagerClient`] for production
//!   and [`FakeRegistry`] for tests.
//! - **Reconciler** ([`SilenceReconciler`]): consumes rollout transitions
//!   and keeps the registry in step, idempotently.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rollout_silence::{FakeRegistry, ReconcilerConfig, SilenceReconciler};
//! use rollout_watch::FakeCluster;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = Arc::new(FakeRegistry::new());
//! let cluster = Arc::new(FakeCluster::new());
//! let mut reconciler =
//!     SilenceReconciler::new(registry.clone(), cluster, ReconcilerConfig::default());
//!
//! reconciler.handle_node_state("worker-1", true).await.unwrap();
//! assert!(reconciler.is_silenced("worker-1"));
//! assert_eq!(registry.created_count(), 2);
//!
//! reconciler.handle_node_state("worker-1", false).await.unwrap();
//! assert!(!reconciler.is_silenced("worker-1"));
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod error;
pub mod reconciler;
pub mod registry;
pub mod shapes;
pub mod types;

// Re-export main types at crate root
pub use client::AlertmanagerClient;
pub use error::{Result, SilenceError};
pub use reconciler::{ReconcilerConfig, SilenceReconciler};
pub use registry::{FakeRegistry, SilenceRegistry};
pub use types::{CREATED_BY, Matcher, Silence};
