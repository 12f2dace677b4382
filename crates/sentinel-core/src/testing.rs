// Shared fixtures for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::error::CoreError;
use crate::feed::IncidentSource;
use crate::model::{Incident, Severity};
use crate::notify::AlertTone;

pub(crate) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

pub(crate) fn incident(id: &str, severity: Severity) -> Incident {
    Incident::new(id, severity, base_time())
}

pub(crate) fn snapshot(items: &[(&str, Severity)]) -> Vec<Arc<Incident>> {
    items
        .iter()
        .map(|(id, severity)| Arc::new(incident(id, *severity)))
        .collect()
}

fn plain(ids: &[&str]) -> Vec<Incident> {
    ids.iter().map(|id| incident(id, Severity::Low)).collect()
}

#[derive(Clone)]
struct Step {
    delay: Duration,
    result: Result<Vec<Incident>, CoreError>,
}

/// Source that replays queued responses in call order, repeating the
/// last one once the queue runs dry.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn ok(&self, ids: &[&str]) -> &Self {
        self.push(Duration::ZERO, Ok(plain(ids)))
    }

    pub(crate) fn ok_with(&self, incidents: Vec<Incident>) -> &Self {
        self.push(Duration::ZERO, Ok(incidents))
    }

    pub(crate) fn slow_ok(&self, delay: Duration, ids: &[&str]) -> &Self {
        self.push(delay, Ok(plain(ids)))
    }

    pub(crate) fn fail(&self, error: CoreError) -> &Self {
        self.push(Duration::ZERO, Err(error))
    }

    fn push(&self, delay: Duration, result: Result<Vec<Incident>, CoreError>) -> &Self {
        self.steps.lock().unwrap().push_back(Step { delay, result });
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IncidentSource for ScriptedSource {
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<Incident>, CoreError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut last = self.last.lock().unwrap();
            match self.steps.lock().unwrap().pop_front() {
                Some(step) => {
                    *last = Some(step.clone());
                    step
                }
                None => last.clone().unwrap_or(Step {
                    delay: Duration::ZERO,
                    result: Ok(Vec::new()),
                }),
            }
        };
        async move {
            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
            step.result
        }
        .boxed()
    }
}

/// Tone that remembers which incidents it was played for.
#[derive(Default)]
pub(crate) struct RecordingTone {
    played: Mutex<Vec<String>>,
}

impl RecordingTone {
    pub(crate) fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }
}

impl AlertTone for RecordingTone {
    fn play(&self, incident: &Incident) {
        self.played.lock().unwrap().push(incident.id.to_string());
    }
}
