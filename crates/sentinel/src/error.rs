//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use sentinel_config::ConfigError;
use sentinel_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const SERVER: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the backend at {url}")]
    #[diagnostic(
        code(sentinel::connection_failed),
        help(
            "Check that the backend is running and accessible.\n\
             URL: {url}\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(sentinel::timeout),
        help("Increase the limit with --timeout or check backend responsiveness.\n{reason}")
    )]
    Timeout { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(sentinel::auth_failed),
        help(
            "Verify the username and password for profile '{profile}'.\n\
             Run: sentinel config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(sentinel::no_credentials),
        help(
            "Configure credentials with: sentinel config init\n\
             Or set SENTINEL_USERNAME and SENTINEL_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("Backend returned HTTP {status}")]
    #[diagnostic(code(sentinel::server_error), help("{message}"))]
    Server { status: u16, message: String },

    #[error("Backend response could not be read: {message}")]
    #[diagnostic(
        code(sentinel::invalid_response),
        help("Check that --api-url points at the versioned API root (e.g. .../v1).")
    )]
    InvalidResponse { message: String },

    #[error("{message}")]
    #[diagnostic(code(sentinel::internal))]
    Internal { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sentinel::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(sentinel::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: sentinel config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(sentinel::config))]
    Config(ConfigError),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Server { .. } | Self::InvalidResponse { .. } => exit_code::SERVER,
            Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::Config(ConfigError::UnknownProfile { .. }) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Translate a core error, naming the backend and profile involved.
    pub fn from_core(err: CoreError, url: &str, profile: &str) -> Self {
        match err {
            CoreError::Network { message } if message.contains("timed out") => {
                CliError::Timeout { reason: message }
            }
            CoreError::Network { message } => CliError::ConnectionFailed {
                url: url.into(),
                reason: message,
            },
            CoreError::Server { status, message } => CliError::Server { status, message },
            CoreError::Parse { message } => CliError::InvalidResponse { message },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: profile.into(),
                message,
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
