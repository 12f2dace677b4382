// ── Incident domain type ──

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::severity::Severity;

/// Opaque incident identifier.
///
/// Compared by identity only. Numeric backend ids are stored in their
/// decimal form so `7` and `"7"` name the same incident.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(Arc<str>);

impl IncidentId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IncidentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for IncidentId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<i64> for IncidentId {
    fn from(n: i64) -> Self {
        Self(Arc::from(n.to_string()))
    }
}

/// One anomaly alert produced by the detection pipeline.
///
/// Read-only as far as this crate is concerned: the feed compares ids
/// between snapshots and never rewrites a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
    pub score: Option<f64>,
    pub is_anomaly: bool,
    pub values: Option<serde_json::Value>,
}

impl Incident {
    /// Minimal incident for tests and demos.
    pub fn new(id: impl Into<IncidentId>, severity: Severity, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            severity,
            source: None,
            kind: None,
            message: None,
            score: None,
            is_anomaly: false,
            values: None,
        }
    }

    pub fn source_or_default(&self) -> &str {
        self.source.as_deref().unwrap_or("-")
    }

    pub fn kind_or_default(&self) -> &str {
        self.kind.as_deref().unwrap_or("-")
    }

    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}
