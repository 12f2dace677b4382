use thiserror::Error;

/// Top-level error type for the `sentinel-api` crate.
///
/// Covers every failure mode of the backend REST surface: authentication,
/// transport, non-2xx responses, and payload decoding. `sentinel-core`
/// folds these into the feed's error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected or bearer token refused (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// An endpoint that requires a bearer token was called without one.
    #[error("Not logged in -- call login() first")]
    NotLoggedIn,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Server ──────────────────────────────────────────────────────
    /// The backend answered with a non-2xx status.
    #[error("Server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if logging in again might resolve this error.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::NotLoggedIn)
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next tick.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Authentication { .. } => Some(401),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        let bad_gateway = Error::Status {
            status: 502,
            body: String::new(),
        };
        let not_found = Error::Status {
            status: 404,
            body: String::new(),
        };
        assert!(bad_gateway.is_transient());
        assert!(!not_found.is_transient());
        assert_eq!(not_found.status(), Some(404));
    }

    #[test]
    fn auth_errors_report_expired() {
        assert!(Error::NotLoggedIn.is_auth_expired());
        assert!(
            Error::Authentication {
                message: "bad token".into()
            }
            .is_auth_expired()
        );
        assert!(!Error::Timeout { timeout_secs: 10 }.is_auth_expired());
    }
}
