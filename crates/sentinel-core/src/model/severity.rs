use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Incident urgency as reported by the detection pipeline.
///
/// Anything the backend sends outside the known set parses to
/// [`Severity::Unknown`] instead of failing the whole snapshot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl Severity {
    /// Parse a backend severity string, tolerating case and whitespace.
    pub fn parse_lossy(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::Unknown)
    }

    /// Sort weight: critical 4, high 3, medium 2, low 1, unknown 0.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 4,
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
            Self::Unknown => 0,
        }
    }

    /// High and critical incidents get an audible cue.
    pub fn is_alerting(self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}
