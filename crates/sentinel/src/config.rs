//! CLI configuration -- thin wrapper around `sentinel_config` shared types.
//!
//! Adds CLI-specific resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --insecure, --timeout).

use sentinel_core::FeedConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use sentinel_config::{
    Config, Profile, config_path, load_config_or_default, save_config, store_password,
};

/// A fully resolved backend target for one command invocation.
#[derive(Debug, Clone)]
pub struct Session {
    pub profile_name: String,
    pub feed: FeedConfig,
}

impl Session {
    /// Map a core error with this session's URL and profile attached.
    pub fn error(&self, err: sentinel_core::CoreError) -> CliError {
        CliError::from_core(err, self.feed.api_url.as_str(), &self.profile_name)
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Comma-separated profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Build the feed configuration for this invocation.
///
/// An explicitly requested profile must exist. Without any profile the
/// CLI still works against `--api-url` (or the local default) with
/// credentials from the environment.
pub fn resolve_session(global: &GlobalOpts) -> Result<Session, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let base = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => Profile::new(sentinel_config::DEFAULT_API_URL),
    };

    let profile = apply_overrides(base, global);
    let credentials = sentinel_config::resolve_credentials(&profile, &profile_name)?;
    let feed = sentinel_config::build_feed_config(&profile, &cfg.defaults, credentials)?;

    tracing::debug!(profile = %profile_name, url = %feed.api_url, "resolved session");
    Ok(Session { profile_name, feed })
}

/// Layer global flags over a profile. Flags win.
fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}
