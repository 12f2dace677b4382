// ── Wire-to-domain conversion ──
//
// Field-for-field mapping from `sentinel_api` records. Nothing is
// reordered or dropped; only the id and severity are normalized.

use sentinel_api::{IncidentRecord, RecordId};

use crate::model::{Incident, IncidentId, Severity};

impl From<RecordId> for IncidentId {
    fn from(id: RecordId) -> Self {
        match id {
            RecordId::Number(n) => IncidentId::from(n),
            RecordId::Text(s) => IncidentId::from(s),
        }
    }
}

impl From<IncidentRecord> for Incident {
    fn from(r: IncidentRecord) -> Self {
        Self {
            id: r.id.into(),
            timestamp: r.timestamp,
            severity: r
                .severity
                .as_deref()
                .map_or(Severity::Unknown, Severity::parse_lossy),
            source: r.source,
            kind: r.kind,
            message: r.message,
            score: r.score,
            is_anomaly: r.is_anomaly,
            values: r.values,
        }
    }
}
