//! Process glue for the rollout alert silencer.
//!
//! `rollout-helper` watches cluster nodes for OS rollouts and keeps
//! Alertmanager silences in step with them: silences appear when a node
//! starts rolling and disappear when it finishes. The detection and
//! silencing logic live in `rollout-watch` and `rollout-silence`; this
//! crate supplies what turns them into a runnable process:
//!
//! - **config**: command-line assembled settings with startup validation.
//! - **kube**: a minimal Kubernetes API client backing the cluster view.
//! - **health**: liveness and readiness endpoints.
//!
//! The binary entry point in `main.rs` wires the pieces together.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod health;
pub mod kube;

pub use config::HelperConfig;
pub use error::{HelperError, Result};
pub use health::Readiness;
pub use kube::KubeClient;
