// ── Published feed state ──

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::model::{Incident, IncidentId};

/// The ordered incident list from one successful fetch.
pub type Snapshot = Arc<Vec<Arc<Incident>>>;

/// What the feed publishes to subscribers.
///
/// Replaced as a whole on every change, so readers never observe a
/// half-applied fetch.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    /// Incidents exactly as the backend ordered them.
    pub incidents: Snapshot,
    /// How many ids in `incidents` were absent from the previous snapshot.
    pub new_count: usize,
    /// Most recent fetch failure, cleared by the next success.
    pub error: Option<CoreError>,
    /// Wall-clock time `incidents` was applied.
    pub last_update: Option<DateTime<Utc>>,
    /// Sequence number of the fetch that produced `incidents`; 0 before
    /// the first success.
    pub sequence: u64,
    /// A fetch is in flight.
    pub loading: bool,
}

impl FeedState {
    /// The incident the backend considers most recent.
    pub fn latest(&self) -> Option<&Arc<Incident>> {
        self.incidents.first()
    }

    pub fn has_snapshot(&self) -> bool {
        self.sequence > 0
    }
}

/// Collect the identity set of a snapshot.
pub fn id_set(incidents: &[Arc<Incident>]) -> HashSet<IncidentId> {
    incidents.iter().map(|i| i.id.clone()).collect()
}

/// Number of ids in `next` that were not in `previous`.
pub fn newly_arrived(previous: &HashSet<IncidentId>, next: &HashSet<IncidentId>) -> usize {
    next.difference(previous).count()
}
