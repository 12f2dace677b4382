// ── Runtime feed configuration ──
//
// Describes *where* incidents come from and *how often* to look. Carries
// credentials but never touches disk: the CLI/TUI builds a `FeedConfig`
// (usually through `sentinel-config`) and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_NOTIFICATION_CAP: usize = 5;
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(10);

/// Username/password pair exchanged for a bearer token.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Everything needed to run an incident feed against one backend.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Versioned API root, e.g. `http://localhost:8000/v1`.
    pub api_url: Url,
    /// Credentials, when the backend requires a session.
    pub auth: Option<Credentials>,
    pub tls: TlsVerification,
    /// Upper bound for a single fetch.
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// When false the feed only fetches on start and on demand.
    pub auto_refresh: bool,
    pub notification_cap: usize,
    pub notification_ttl: Duration,
}

impl FeedConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            auth: None,
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            auto_refresh: true,
            notification_cap: DEFAULT_NOTIFICATION_CAP,
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
        }
    }

    pub fn poll_settings(&self) -> crate::feed::PollSettings {
        crate::feed::PollSettings {
            interval: self.poll_interval,
            auto_refresh: self.auto_refresh,
            timeout: self.timeout,
        }
    }

    pub fn notification_settings(&self) -> crate::notify::NotificationSettings {
        crate::notify::NotificationSettings {
            cap: self.notification_cap,
            ttl: self.notification_ttl,
        }
    }
}
