// ── Incident filtering ──
//
// Client-side narrowing and ordering of a snapshot for table views.
// Works on the already-fetched list; never re-queries the backend.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::model::{Incident, Severity};

/// How far back to look, relative to "now".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Period {
    #[default]
    All,
    LastHour,
    /// Last 24 hours.
    Today,
    /// Last 7 days.
    Week,
    /// Last 30 days.
    Month,
}

impl Period {
    pub fn window(self) -> Option<TimeDelta> {
        match self {
            Self::All => None,
            Self::LastHour => Some(TimeDelta::hours(1)),
            Self::Today => Some(TimeDelta::days(1)),
            Self::Week => Some(TimeDelta::days(7)),
            Self::Month => Some(TimeDelta::days(30)),
        }
    }

    /// Cycle order for UI toggles.
    pub fn next(self) -> Self {
        match self {
            Self::All => Self::LastHour,
            Self::LastHour => Self::Today,
            Self::Today => Self::Week,
            Self::Week => Self::Month,
            Self::Month => Self::All,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortField {
    #[default]
    Timestamp,
    Severity,
    Score,
}

impl SortField {
    pub fn next(self) -> Self {
        match self {
            Self::Timestamp => Self::Severity,
            Self::Severity => Self::Score,
            Self::Score => Self::Timestamp,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn flip(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Filter, sort and limit settings for a snapshot.
///
/// With no sort field the backend order is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentFilter {
    pub severity: Option<Severity>,
    /// Exact (case-insensitive) incident type.
    pub kind: Option<String>,
    /// Case-insensitive substring over message, source, type and id.
    pub search: Option<String>,
    pub period: Period,
    pub sort: Option<(SortField, SortOrder)>,
    pub limit: Option<usize>,
}

impl IncidentFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, incident: &Incident, now: DateTime<Utc>) -> bool {
        if self.severity.is_some_and(|s| incident.severity != s) {
            return false;
        }
        if let Some(kind) = &self.kind {
            if !incident
                .kind
                .as_deref()
                .is_some_and(|k| k.eq_ignore_ascii_case(kind))
            {
                return false;
            }
        }
        if let Some(query) = self.search.as_deref().filter(|q| !q.is_empty()) {
            let query = query.to_lowercase();
            let hit = [
                incident.message.as_deref(),
                incident.source.as_deref(),
                incident.kind.as_deref(),
                Some(incident.id.as_str()),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&query));
            if !hit {
                return false;
            }
        }
        if let Some(window) = self.period.window() {
            if incident.timestamp < now - window {
                return false;
            }
        }
        true
    }

    /// Apply the filter to a snapshot. Incidents are shared, not copied.
    pub fn apply(&self, incidents: &[Arc<Incident>], now: DateTime<Utc>) -> Vec<Arc<Incident>> {
        let mut out: Vec<Arc<Incident>> = incidents
            .iter()
            .filter(|i| self.matches(i, now))
            .cloned()
            .collect();

        if let Some((field, order)) = self.sort {
            // Stable, so ties keep backend order.
            out.sort_by(|a, b| {
                let ord = compare(a, b, field);
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

fn compare(a: &Incident, b: &Incident, field: SortField) -> Ordering {
    match field {
        SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
        SortField::Severity => a.severity.rank().cmp(&b.severity.rank()),
        SortField::Score => a.score.unwrap_or(0.0).total_cmp(&b.score.unwrap_or(0.0)),
    }
}

/// Distinct incident types in snapshot order.
pub fn distinct_kinds(incidents: &[Arc<Incident>]) -> Vec<String> {
    let mut kinds: Vec<String> = Vec::new();
    for kind in incidents.iter().filter_map(|i| i.kind.as_deref()) {
        if !kinds.iter().any(|k| k == kind) {
            kinds.push(kind.to_owned());
        }
    }
    kinds
}
