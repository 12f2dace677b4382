//! `sentinel-tui` -- live terminal dashboard for a sentinel incident feed.
//!
//! Built on [ratatui](https://ratatui.rs) over `sentinel-core`'s
//! [`IncidentFeed`](sentinel_core::IncidentFeed) and
//! [`NotificationQueue`](sentinel_core::NotificationQueue). Two screens:
//! a dashboard of summary cards and the latest incidents, and a
//! filterable incident table. New incidents pop up as toasts.
//!
//! Logs go to a file (default under the sentinel data directory) so they
//! never corrupt the terminal.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screen;
mod screens;
#[cfg(test)]
mod testing;
mod theme;
mod tone;
mod tui;
mod widgets;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, bail};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use sentinel_config::{Config, Profile};
use sentinel_core::{FeedConfig, IncidentFeed, LiveFlag, NotificationQueue};

use crate::app::App;

/// Terminal dashboard for watching incidents as they arrive.
#[derive(Parser, Debug)]
#[command(name = "sentinel-tui", version, about)]
struct Cli {
    /// Config profile to use
    #[arg(short = 'p', long, env = "SENTINEL_PROFILE")]
    profile: Option<String>,

    /// API root URL, overriding the profile (e.g. http://localhost:8000/v1)
    #[arg(short = 'u', long, env = "SENTINEL_API_URL")]
    api_url: Option<String>,

    /// Poll interval in seconds, overriding the profile
    #[arg(short = 'i', long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Start with live polling paused
    #[arg(long)]
    paused: bool,

    /// Log file path (defaults to sentinel-tui.log in the data directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-based tracing. Writing to stdout/stderr would corrupt the UI.
/// The returned guard must live until exit so buffered logs are flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sentinel_tui={level},sentinel_core={level},sentinel_api={level}"
        ))
    });

    let log_file = cli
        .log_file
        .clone()
        .unwrap_or_else(|| sentinel_config::data_dir().join("sentinel-tui.log"));
    let log_dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let _ = std::fs::create_dir_all(log_dir);
    let log_name = log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("sentinel-tui.log"));

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, log_name));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

/// Resolve the profile named by flags or config, then layer flag overrides.
///
/// Without a config file the dashboard still runs against `--api-url` or
/// the local default.
fn resolve_feed_config(cli: &Cli, cfg: &Config) -> Result<(String, FeedConfig)> {
    let name = cfg.active_profile_name(cli.profile.as_deref());
    let mut profile = match cfg.profiles.get(&name) {
        Some(p) => p.clone(),
        None if cli.profile.is_some() => {
            bail!("profile '{name}' not found in {}", sentinel_config::config_path().display())
        }
        None => Profile::new(sentinel_config::DEFAULT_API_URL),
    };
    if let Some(ref url) = cli.api_url {
        profile.api_url.clone_from(url);
    }

    let mut feed = sentinel_config::profile_to_feed_config(&profile, &name, &cfg.defaults)?;
    if let Some(secs) = cli.interval {
        feed.poll_interval = Duration::from_secs(secs);
    }
    Ok((name, feed))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Hooks go in before the terminal switches to raw mode.
    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli);

    let cfg = sentinel_config::load_config_or_default();
    let (profile_name, feed_config) = resolve_feed_config(&cli, &cfg)?;
    info!(
        profile = %profile_name,
        url = %feed_config.api_url,
        interval_s = feed_config.poll_interval.as_secs(),
        "starting sentinel-tui"
    );

    let feed = IncidentFeed::from_config(&feed_config, LiveFlag::new(!cli.paused))?;
    let queue = NotificationQueue::new(feed_config.notification_settings(), tone::default_tone());
    let target = format!("{profile_name} @ {}", feed_config.api_url);

    App::new(feed, queue, target).run().await
}
