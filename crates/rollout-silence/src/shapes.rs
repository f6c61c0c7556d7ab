//! The three silence shapes created for a rolling node.
//!
//! Each shape is an independent silence so it can be reasoned about and
//! deleted on its own. The alert and job tables below are the known noisy
//! signals during an OS rollout; anything outside them keeps firing.

use chrono::Duration;

use rollout_watch::PodRecord;

use crate::types::{Matcher, Silence};

/// Alert names silenced by the node-scoped shape.
pub const NODE_ALERT_NAMES: [&str; 5] = [
    "KubeNodeNotReady",
    "KubeNodeUnreachable",
    "NodeScrapingTargetDown",
    "ScrapingTargetDown",
    "EventWarning",
];

/// Job names silenced by the node-scoped shape.
pub const NODE_JOB_NAMES: [&str; 6] = [
    "snappcloud-network-vector\\/spcld-network-vector-agent",
    "event-exporter",
    "node-exporter",
    "kube-state-metrics",
    "crio",
    "kubelet",
];

/// Alert names silenced by the instance-scoped shape.
pub const INSTANCE_ALERT_NAMES: [&str; 2] = ["ScrapingTargetDown", "NodeScrapingTargetDown"];

/// Job names silenced by the instance-scoped shape.
pub const INSTANCE_JOB_NAMES: [&str; 3] = ["node-exporter", "kubernetes-cadvisor", "kubelet"];

/// A DaemonSet whose pods get silenced while their node rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonSetTarget {
    /// Namespace the DaemonSet runs in.
    pub namespace: &'static str,
    /// Label selector identifying its pods.
    pub label_selector: &'static str,
    /// Short name, used in log context only.
    pub name: &'static str,
}

/// DaemonSets whose per-pod alerts turn noisy during a rollout.
pub const DAEMONSET_TARGETS: [DaemonSetTarget; 4] = [
    DaemonSetTarget {
        namespace: "kube-system",
        label_selector: "k8s-app=cilium",
        name: "cilium",
    },
    DaemonSetTarget {
        namespace: "openshift-dns",
        label_selector: "app=openshift-dns",
        name: "dns",
    },
    DaemonSetTarget {
        namespace: "openshift-logging",
        label_selector: "component=collector",
        name: "collector",
    },
    DaemonSetTarget {
        namespace: "snappcloud-logging",
        label_selector: "app.kubernetes.io/name=fluentbit",
        name: "fluent-bit",
    },
];

/// Join values into a grouped regex alternation, `(a|b|c)`.
///
/// Alertmanager anchors regex matchers, so the group matches exactly the
/// listed values as long as they carry no unescaped metacharacters.
#[must_use]
pub fn alternation(values: &[&str]) -> String {
    format!("({})", values.join("|"))
}

/// Node-scoped silence: exact `node` label plus the node-level alert and
/// job tables.
#[must_use]
pub fn node_silence(node: &str, ttl: Duration) -> Silence {
    let matchers = vec![
        Matcher::equal("node", node),
        Matcher::regex("alertname", alternation(&NODE_ALERT_NAMES)),
        Matcher::regex("job", alternation(&NODE_JOB_NAMES)),
    ];
    Silence::for_node(node, matchers, ttl)
}

/// Instance-scoped silence: exact `instance` label plus the
/// scraping-target alert variants and their jobs.
#[must_use]
pub fn instance_silence(node: &str, ttl: Duration) -> Silence {
    let matchers = vec![
        Matcher::equal("instance", node),
        Matcher::regex("alertname", alternation(&INSTANCE_ALERT_NAMES)),
        Matcher::regex("job", alternation(&INSTANCE_JOB_NAMES)),
    ];
    Silence::for_node(node, matchers, ttl)
}

/// Pod-scoped silence covering every DaemonSet pod found on the node.
///
/// Returns `None` when no pods were found: an empty alternation would
/// match everything, which is the opposite of a scoped silence.
#[must_use]
pub fn pod_silence(node: &str, pods: &[PodRecord], ttl: Duration) -> Option<Silence> {
    if pods.is_empty() {
        return None;
    }

    let names: Vec<&str> = pods.iter().map(|p| p.name.as_str()).collect();

    // Several targets share a namespace; repeat values add nothing.
    let mut namespaces: Vec<&str> = Vec::new();
    for pod in pods {
        if !namespaces.contains(&pod.namespace.as_str()) {
            namespaces.push(pod.namespace.as_str());
        }
    }

    let matchers = vec![
        Matcher::regex("pod", alternation(&names)),
        Matcher::regex("namespace", alternation(&namespaces)),
    ];
    Some(Silence::for_node(node, matchers, ttl))
}
