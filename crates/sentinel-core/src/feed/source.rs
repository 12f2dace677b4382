// ── Incident sources ──
//
// The fetch seam used by the feed. `HttpSource` talks to the backend;
// tests plug in scripted sources.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use secrecy::ExposeSecret;
use tracing::debug;

use sentinel_api::transport::{TlsMode, TransportConfig};
use sentinel_api::{SentinelClient, UserInfo};

use crate::config::{Credentials, FeedConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::Incident;

/// Something that can produce the current incident list.
pub trait IncidentSource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<Incident>, CoreError>>;
}

/// Incident source backed by `GET /incidents/`.
///
/// Logs in first when credentials are configured and no token is held,
/// and retries once with a fresh login if the token is rejected.
#[derive(Clone)]
pub struct HttpSource {
    client: SentinelClient,
    credentials: Option<Credentials>,
}

impl HttpSource {
    pub fn new(client: SentinelClient, credentials: Option<Credentials>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Build the HTTP client described by `config`.
    pub fn from_config(config: &FeedConfig) -> Result<Self, CoreError> {
        let client = SentinelClient::new(config.api_url.clone(), &build_transport(config))?;
        Ok(Self::new(client, config.auth.clone()))
    }

    pub fn client(&self) -> &SentinelClient {
        &self.client
    }

    /// Log in if credentials exist and no session is held.
    pub async fn ensure_session(&self) -> Result<(), CoreError> {
        let Some(creds) = &self.credentials else {
            return Ok(());
        };
        if self.client.has_token() {
            return Ok(());
        }
        debug!(username = %creds.username, "logging in");
        self.client.login(&creds.username, &creds.password).await?;
        Ok(())
    }

    /// Resolve the user behind the current session, logging in first.
    pub async fn whoami(&self) -> Result<UserInfo, CoreError> {
        if self.credentials.is_none() {
            return Err(CoreError::Config {
                message: "no username configured for this profile".into(),
            });
        }
        self.ensure_session().await?;
        Ok(self.client.me().await?)
    }

    async fn fetch_incidents(&self) -> Result<Vec<Incident>, CoreError> {
        self.ensure_session().await?;
        let records = match self.client.list_incidents().await {
            Ok(records) => records,
            Err(e) if e.is_auth_expired() && self.credentials.is_some() => {
                debug!("bearer token rejected, logging in again");
                self.client.clear_token();
                self.ensure_session().await?;
                self.client.list_incidents().await?
            }
            Err(e) => return Err(e.into()),
        };
        Ok(records.into_iter().map(Incident::from).collect())
    }
}

impl IncidentSource for HttpSource {
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<Incident>, CoreError>> {
        self.fetch_incidents().boxed()
    }
}

fn build_transport(config: &FeedConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

impl std::fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSource")
            .field("api_url", &self.client.base_url().as_str())
            .field(
                "username",
                &self.credentials.as_ref().map(|c| c.username.as_str()),
            )
            .field(
                "has_password",
                &self
                    .credentials
                    .as_ref()
                    .is_some_and(|c| !c.password.expose_secret().is_empty()),
            )
            .finish()
    }
}
