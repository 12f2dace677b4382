// Administration endpoints
//
// The backend ships a synthetic incident generator plus a few maintenance
// calls under `/admin`. They drive demos and load tests; the sync pipeline
// never touches them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::client::SentinelClient;
use crate::error::Error;
use crate::models::{RecordId, timestamp};

/// `GET /admin/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_incidents: u64,
    /// Incidents since local midnight on the server.
    pub today_count: u64,
    #[serde(default)]
    pub last_incident: Option<LastIncident>,
    pub generator_running: bool,
    pub generator_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastIncident {
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub severity: Option<String>,
}

/// Background generator knobs, sent on start and echoed back by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Seconds between generated incidents.
    pub interval: u64,
    /// Percentage (0-100) of generated datapoints that are outliers.
    #[serde(rename = "anomalyRate")]
    pub anomaly_rate: u8,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            interval: 3,
            anomaly_rate: 30,
        }
    }
}

/// `GET /admin/generator/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorStatus {
    pub running: bool,
    pub generated: u64,
    /// `{}` until the generator has been started once.
    #[serde(default)]
    pub settings: GeneratorSettings,
    #[serde(default)]
    pub message: String,
}

/// Reply to generator start/stop.
///
/// `status` is one of `started`, `already_running`, `stopped`,
/// `not_running`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorAction {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub generated: Option<u64>,
    #[serde(default)]
    pub settings: Option<GeneratorSettings>,
}

impl GeneratorAction {
    /// False when the call was a no-op (already running / not running).
    pub fn changed_state(&self) -> bool {
        matches!(self.status.as_str(), "started" | "stopped")
    }
}

/// `POST /admin/generate-test`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedBatch {
    pub generated: u64,
    #[serde(default)]
    pub incidents: Vec<GeneratedIncident>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedIncident {
    pub id: RecordId,
    pub severity: String,
}

/// `POST /admin/crisis-scenario`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisReport {
    pub generated: u64,
    /// How many of them came out high or critical.
    pub critical: u64,
    #[serde(default)]
    pub message: String,
}

/// `DELETE /admin/clear-database`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearReport {
    pub deleted: u64,
    #[serde(default)]
    pub message: String,
}

impl SentinelClient {
    pub async fn admin_stats(&self) -> Result<AdminStats, Error> {
        let url = self.api_url("admin/stats")?;
        self.get(url).await
    }

    pub async fn generator_status(&self) -> Result<GeneratorStatus, Error> {
        let url = self.api_url("admin/generator/status")?;
        self.get(url).await
    }

    /// Start the background generator. Starting it twice is not an error;
    /// the reply's `status` says `already_running`.
    pub async fn start_generator(
        &self,
        settings: &GeneratorSettings,
    ) -> Result<GeneratorAction, Error> {
        let url = self.api_url("admin/generator/start")?;
        debug!(
            interval = settings.interval,
            anomaly_rate = settings.anomaly_rate,
            "starting generator"
        );
        self.post(url, settings).await
    }

    pub async fn stop_generator(&self) -> Result<GeneratorAction, Error> {
        let url = self.api_url("admin/generator/stop")?;
        self.post(url, &json!({})).await
    }

    /// Create `count` incidents at once with the default anomaly rate.
    pub async fn generate_test(&self, count: u32) -> Result<GeneratedBatch, Error> {
        let url = self.api_url("admin/generate-test")?;
        self.post(url, &json!({ "count": count })).await
    }

    /// Create a burst of 20 incidents, most of them anomalous.
    pub async fn crisis_scenario(&self) -> Result<CrisisReport, Error> {
        let url = self.api_url("admin/crisis-scenario")?;
        self.post(url, &json!({})).await
    }

    /// Delete every stored incident. Irreversible.
    pub async fn clear_database(&self) -> Result<ClearReport, Error> {
        let url = self.api_url("admin/clear-database")?;
        debug!("clearing incident database");
        self.delete(url).await
    }
}
