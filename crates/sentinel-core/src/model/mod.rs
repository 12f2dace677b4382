// ── Domain model ──
//
// Canonical incident types shared by the CLI and TUI. Built from the
// wire records in `sentinel-api` via `crate::convert`.

pub mod incident;
pub mod severity;

pub use incident::{Incident, IncidentId};
pub use severity::Severity;
