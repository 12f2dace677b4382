// ── Snapshot summary ──
//
// Headline numbers for the dashboard cards and `incidents summary`.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::model::{Incident, Severity};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IncidentSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
    /// High or critical.
    pub urgent: usize,
    pub anomalies: usize,
    pub last_hour: usize,
    pub last_24h: usize,
    /// Previous 24h window (24h..48h ago), for trend display.
    pub previous_24h: usize,
    pub last_7d: usize,
}

impl IncidentSummary {
    pub fn from_incidents(incidents: &[Arc<Incident>], now: DateTime<Utc>) -> Self {
        let hour_ago = now - TimeDelta::hours(1);
        let day_ago = now - TimeDelta::days(1);
        let two_days_ago = now - TimeDelta::days(2);
        let week_ago = now - TimeDelta::days(7);

        let mut s = Self {
            total: incidents.len(),
            ..Self::default()
        };
        for incident in incidents {
            match incident.severity {
                Severity::Critical => s.critical += 1,
                Severity::High => s.high += 1,
                Severity::Medium => s.medium += 1,
                Severity::Low => s.low += 1,
                Severity::Unknown => s.unknown += 1,
            }
            if incident.severity.is_alerting() {
                s.urgent += 1;
            }
            if incident.is_anomaly {
                s.anomalies += 1;
            }
            let ts = incident.timestamp;
            if ts >= hour_ago {
                s.last_hour += 1;
            }
            if ts >= day_ago {
                s.last_24h += 1;
            } else if ts >= two_days_ago {
                s.previous_24h += 1;
            }
            if ts >= week_ago {
                s.last_7d += 1;
            }
        }
        s
    }

    /// Day-over-day change in percent, `None` when yesterday was empty.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn trend_percent(&self) -> Option<f64> {
        if self.previous_24h == 0 {
            return None;
        }
        let today = self.last_24h as f64;
        let yesterday = self.previous_24h as f64;
        Some((today - yesterday) / yesterday * 100.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{base_time, incident};

    fn at(id: &str, severity: Severity, ago: TimeDelta, anomaly: bool) -> Arc<Incident> {
        let mut i = incident(id, severity);
        i.timestamp = base_time() - ago;
        i.is_anomaly = anomaly;
        Arc::new(i)
    }

    #[test]
    fn counts_by_severity_and_window() {
        let items = vec![
            at("1", Severity::Critical, TimeDelta::minutes(5), true),
            at("2", Severity::High, TimeDelta::hours(2), true),
            at("3", Severity::Medium, TimeDelta::hours(30), false),
            at("4", Severity::Low, TimeDelta::days(3), false),
            at("5", Severity::Low, TimeDelta::days(40), false),
        ];
        let s = IncidentSummary::from_incidents(&items, base_time());

        assert_eq!(s.total, 5);
        assert_eq!((s.critical, s.high, s.medium, s.low), (1, 1, 1, 2));
        assert_eq!(s.urgent, 2);
        assert_eq!(s.anomalies, 2);
        assert_eq!(s.last_hour, 1);
        assert_eq!(s.last_24h, 2);
        assert_eq!(s.previous_24h, 1);
        assert_eq!(s.last_7d, 4);
        assert!((s.trend_percent().unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_snapshot() {
        let s = IncidentSummary::from_incidents(&[], base_time());
        assert_eq!(s, IncidentSummary::default());
        assert_eq!(s.trend_percent(), None);
    }
}
