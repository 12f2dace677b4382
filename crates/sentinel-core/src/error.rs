// ── Core error types ──
//
// The feed's error taxonomy. Consumers never see reqwest or serde errors
// directly: the `From<sentinel_api::Error>` impl folds transport-layer
// failures into network / server / parse buckets. `CoreError` is `Clone`
// because the most recent failure is published inside `FeedState`.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Fetch failures ───────────────────────────────────────────────
    /// The request could not be completed (DNS, refused, timeout).
    #[error("Network error: {message}")]
    Network { message: String },

    /// The backend answered with a non-2xx status.
    #[error("Server returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// The body did not decode into an array of incidents.
    #[error("Malformed incident payload: {message}")]
    Parse { message: String },

    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification shown next to the last-known-good snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum FeedErrorKind {
    Network,
    Server,
    Parse,
    Other,
}

impl CoreError {
    pub fn kind(&self) -> FeedErrorKind {
        match self {
            Self::Network { .. } => FeedErrorKind::Network,
            // A rejected token is still the backend saying no.
            Self::Server { .. } | Self::AuthenticationFailed { .. } => FeedErrorKind::Server,
            Self::Parse { .. } => FeedErrorKind::Parse,
            Self::Config { .. } | Self::Internal(_) => FeedErrorKind::Other,
        }
    }

    pub(crate) fn timed_out(timeout: std::time::Duration) -> Self {
        Self::Network {
            message: format!("request timed out after {}s", timeout.as_secs()),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sentinel_api::Error> for CoreError {
    fn from(err: sentinel_api::Error) -> Self {
        match err {
            sentinel_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            sentinel_api::Error::NotLoggedIn => CoreError::AuthenticationFailed {
                message: "no session -- login required".into(),
            },
            sentinel_api::Error::Transport(ref e) => {
                if e.is_decode() {
                    CoreError::Parse {
                        message: e.to_string(),
                    }
                } else if let Some(status) = e.status() {
                    CoreError::Server {
                        status: status.as_u16(),
                        message: e.to_string(),
                    }
                } else {
                    CoreError::Network {
                        message: e.to_string(),
                    }
                }
            }
            sentinel_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            sentinel_api::Error::Timeout { timeout_secs } => CoreError::Network {
                message: format!("request timed out after {timeout_secs}s"),
            },
            sentinel_api::Error::Tls(msg) => CoreError::Network {
                message: format!("TLS error: {msg}"),
            },
            sentinel_api::Error::Status { status, body } => CoreError::Server {
                status,
                message: body,
            },
            sentinel_api::Error::Deserialization { message, .. } => CoreError::Parse { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_become_server_errors() {
        let err: CoreError = sentinel_api::Error::Status {
            status: 502,
            body: "bad gateway".into(),
        }
        .into();
        assert_eq!(
            err,
            CoreError::Server {
                status: 502,
                message: "bad gateway".into()
            }
        );
        assert_eq!(err.kind(), FeedErrorKind::Server);
    }

    #[test]
    fn decode_failures_become_parse_errors() {
        let err: CoreError = sentinel_api::Error::Deserialization {
            message: "invalid type: map, expected a sequence".into(),
            body: "{}".into(),
        }
        .into();
        assert_eq!(err.kind(), FeedErrorKind::Parse);
    }

    #[test]
    fn timeouts_are_network_errors() {
        let err: CoreError = sentinel_api::Error::Timeout { timeout_secs: 10 }.into();
        assert_eq!(err.kind(), FeedErrorKind::Network);
        assert_eq!(err.to_string(), "Network error: request timed out after 10s");
    }

    #[test]
    fn rejected_login_counts_as_server_side() {
        let err: CoreError = sentinel_api::Error::Authentication {
            message: "Incorrect username or password".into(),
        }
        .into();
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
        assert_eq!(err.kind(), FeedErrorKind::Server);
    }
}
