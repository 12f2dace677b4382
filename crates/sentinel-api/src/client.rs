// Backend HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, bearer-token injection
// and response classification. Endpoint groups (incidents, auth, admin) are
// implemented as inherent methods in their own files so this module
// stays focused on transport mechanics.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// FastAPI reports failures as `{"detail": "..."}`.
#[derive(serde::Deserialize)]
struct ErrorDetail {
    detail: Option<serde_json::Value>,
}

/// Raw HTTP client for the incident backend.
///
/// Cheap to clone: the HTTP connection pool and the bearer token are
/// shared between clones, so a token obtained through one handle is used
/// by all of them.
#[derive(Clone)]
pub struct SentinelClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    token: Arc<RwLock<Option<SecretString>>>,
}

impl SentinelClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the versioned API root, e.g. `http://localhost:8000/v1`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout: transport.timeout,
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout: crate::transport::DEFAULT_TIMEOUT,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// The API root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Token management ─────────────────────────────────────────────

    /// Install a bearer token for subsequent requests.
    pub fn set_token(&self, token: SecretString) {
        debug!("storing bearer token");
        *self.token.write().expect("token lock poisoned") = Some(token);
    }

    /// Forget the bearer token.
    pub fn clear_token(&self) {
        *self.token.write().expect("token lock poisoned") = None;
    }

    /// Whether a bearer token is currently held.
    pub fn has_token(&self) -> bool {
        self.token.read().expect("token lock poisoned").is_some()
    }

    fn apply_token(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let guard = self.token.read().expect("token lock poisoned");
        match guard.as_ref() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an API path relative to the base URL.
    ///
    /// `url::Url::join` would drop the last base segment (`/v1`) unless the
    /// base ends in a slash, so the path is appended textually instead.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let builder = self.apply_token(self.http.get(url));
        let resp = builder.send().await.map_err(|e| self.transport_error(e))?;
        self.parse_json(resp).await
    }

    /// Send a POST request with a JSON body and decode the JSON response.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl serde::Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let builder = self.apply_token(self.http.post(url).json(body));
        let resp = builder.send().await.map_err(|e| self.transport_error(e))?;
        self.parse_json(resp).await
    }

    /// Send a DELETE request and decode the JSON response.
    pub(crate) async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("DELETE {}", url);
        let builder = self.apply_token(self.http.delete(url));
        let resp = builder.send().await.map_err(|e| self.transport_error(e))?;
        self.parse_json(resp).await
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Classify the status, then decode the body.
    ///
    /// 401 becomes [`Error::Authentication`], any other non-2xx becomes
    /// [`Error::Status`], and a body that does not decode into `T` becomes
    /// [`Error::Deserialization`].
    async fn parse_json<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        trace!(status = status.as_u16(), len = body.len(), "response received");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: detail_message(&body).unwrap_or_else(|| "unauthorized".into()),
            });
        }

        if !status.is_success() {
            let message = detail_message(&body).unwrap_or_else(|| preview(&body).to_owned());
            return Err(Error::Status {
                status: status.as_u16(),
                body: message,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

fn detail_message(body: &str) -> Option<String> {
    let parsed: ErrorDetail = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
