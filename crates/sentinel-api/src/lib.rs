// sentinel-api: Async Rust client for the Sentinel incident backend

pub mod admin;
pub mod auth;
pub mod client;
pub mod error;
pub mod incidents;
pub mod models;
pub mod transport;

pub use admin::{
    AdminStats, ClearReport, CrisisReport, GeneratedBatch, GeneratedIncident, GeneratorAction,
    GeneratorSettings, GeneratorStatus, LastIncident,
};
pub use auth::{LoginResponse, UserInfo};
pub use client::SentinelClient;
pub use error::Error;
pub use models::{IncidentRecord, RecordId};
pub use transport::{TlsMode, TransportConfig};
