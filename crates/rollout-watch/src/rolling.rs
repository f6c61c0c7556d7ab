//! Rollout detection policy.
//!
//! A node counts as rolling while the machine-config daemon reports it as
//! `Working`, or while the runtime-restart taint is still on it. The two
//! signals cover different phases of the same rollout: the annotation
//! flips first, the taint lingers until the container runtime has been
//! cycled.

use crate::cluster::NodeRecord;

/// Annotation key the machine-config daemon keeps node progress under.
pub const MACHINE_CONFIG_STATE_ANNOTATION: &str = "machineconfiguration.openshift.io/state";

/// Annotation value while a node is being updated.
pub const STATE_WORKING: &str = "Working";

/// Annotation value once a node's update has completed.
pub const STATE_DONE: &str = "Done";

/// Taint key present while the node waits for its container runtime restart.
pub const WAIT_FOR_RUNC_TAINT: &str = "wait-for-runc";

/// Decide whether a node is currently rolling.
// TODO: also consider the annotation used for manual node reboots.
#[must_use]
pub fn is_rolling(node: &NodeRecord) -> bool {
    node.annotation(MACHINE_CONFIG_STATE_ANNOTATION) == Some(STATE_WORKING)
        || node.has_taint(WAIT_FOR_RUNC_TAINT)
}
