//! Test fixtures shared by screen and app tests.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;

use sentinel_core::{CoreError, Incident, IncidentSource, Severity};

/// Source that always returns the same incident list.
#[derive(Default)]
pub struct StaticSource(pub Vec<Incident>);

impl IncidentSource for StaticSource {
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<Incident>, CoreError>> {
        let incidents = self.0.clone();
        async move { Ok(incidents) }.boxed()
    }
}

/// Incident `id` that happened `minutes_ago`, with a kind and message.
pub fn incident(id: &str, severity: Severity, minutes_ago: i64) -> Arc<Incident> {
    let mut incident = Incident::new(id, severity, Utc::now() - TimeDelta::minutes(minutes_ago));
    incident.kind = Some(if severity.is_alerting() { "spike" } else { "drift" }.into());
    incident.source = Some("sensor-1".into());
    incident.message = Some(format!("incident {id}"));
    Arc::new(incident)
}
