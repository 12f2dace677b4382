// Incident endpoints

use tracing::debug;

use crate::client::SentinelClient;
use crate::error::Error;
use crate::models::IncidentRecord;

impl SentinelClient {
    /// Fetch the full incident list (`GET /incidents/`).
    ///
    /// The backend returns the array newest-first; the order is preserved.
    pub async fn list_incidents(&self) -> Result<Vec<IncidentRecord>, Error> {
        let url = self.api_url("incidents/")?;
        let records: Vec<IncidentRecord> = self.get(url).await?;
        debug!(count = records.len(), "fetched incidents");
        Ok(records)
    }
}
