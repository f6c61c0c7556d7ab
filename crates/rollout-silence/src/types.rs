//! Silence wire model.
//!
//! Mirrors the Alertmanager v2 silence object closely enough to round-trip
//! through `POST /api/v2/silences` and `GET /api/v2/silences`. Fields the
//! registry reports but this system never reads (status, updatedAt) are
//! simply ignored on decode.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Creator identity stamped on every silence this system makes.
///
/// Silences carrying any other `createdBy` value are ignored wholesale:
/// never deleted, never counted during recovery.
pub const CREATED_BY: &str = "rollout-helper";

/// A single label matcher inside a silence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matcher {
    /// Label name to match on.
    pub name: String,
    /// Value, exact or regex depending on `is_regex`.
    pub value: String,
    /// Whether `value` is a regular expression.
    pub is_regex: bool,
}

impl Matcher {
    /// Exact-value matcher.
    #[must_use]
    pub fn equal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_regex: false,
        }
    }

    /// Regex matcher.
    #[must_use]
    pub fn regex(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_regex: true,
        }
    }
}

/// An Alertmanager silence.
///
/// `id` is absent on creation and assigned by the registry; listings
/// always carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Silence {
    /// Registry-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Label matchers; an alert is silenced when all of them match.
    pub matchers: Vec<Matcher>,
    /// When the silence takes effect.
    pub starts_at: DateTime<Utc>,
    /// When the silence expires.
    pub ends_at: DateTime<Utc>,
    /// Creator identity.
    pub created_by: String,
    /// Free-text comment; encodes the owning node name.
    pub comment: String,
}

impl Silence {
    /// Build a silence for `node` that is valid from now until now + `ttl`.
    ///
    /// The comment embeds the node name padded with spaces, which is what
    /// [`covers_node`](Self::covers_node) later searches for. There is no
    /// structured key tying a silence to its node; the comment is the
    /// contract.
    #[must_use]
    pub fn for_node(node: &str, matchers: Vec<Matcher>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            matchers,
            starts_at: now,
            ends_at: now + ttl,
            created_by: CREATED_BY.to_string(),
            comment: format!("Silencing alerts for node {node} during rollout"),
        }
    }

    /// Whether this silence was created by this system.
    #[must_use]
    pub fn is_owned(&self) -> bool {
        self.created_by == CREATED_BY
    }

    /// Whether this silence belongs to `node`, judged by the comment.
    ///
    /// The node name is matched wrapped in spaces so that `worker-3` never
    /// claims the silences of `worker-30`.
    #[must_use]
    pub fn covers_node(&self, node: &str) -> bool {
        self.comment.contains(&format!(" {node} "))
    }

    /// Whether the silence's validity window has elapsed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.ends_at <= now
    }

    /// Values of every exact `node` matcher on this silence.
    ///
    /// Recovery seeds its tracking from these.
    #[must_use]
    pub fn node_matcher_values(&self) -> Vec<&str> {
        self.matchers
            .iter()
            .filter(|m| m.name == "node")
            .map(|m| m.value.as_str())
            .collect()
    }
}
