//! Incident command handlers.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tabled::Tabled;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use sentinel_core::{
    AlertTone, FeedState, Incident, IncidentFeed, IncidentFilter, IncidentSummary, LiveFlag,
    Notification, NotificationQueue, SilentTone, Snapshot,
};

use crate::cli::{
    FilterArgs, GlobalOpts, IncidentsArgs, IncidentsCommand, OutputFormat, SummaryArgs, WatchArgs,
};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct IncidentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&Arc<Incident>> for IncidentRow {
    fn from(i: &Arc<Incident>) -> Self {
        Self {
            id: i.id.to_string(),
            time: local_time(i.timestamp),
            severity: output::severity_label(i.severity, false),
            kind: i.kind_or_default().to_owned(),
            source: i.source_or_default().to_owned(),
            score: i.score.map(|s| format!("{s:.2}")).unwrap_or_default(),
            message: output::truncate(i.message_or_default(), 60),
        }
    }
}

fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: IncidentsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        IncidentsCommand::List(filter) => list(session, &filter, global).await,
        IncidentsCommand::Summary(args) => summary(session, &args, global).await,
        IncidentsCommand::Watch(args) => watch(session, &args, global).await,
    }
}

/// One-shot fetch through a feed that never polls.
async fn fetch_snapshot(session: &Session) -> Result<Snapshot, CliError> {
    let feed =
        IncidentFeed::from_config(&session.feed, LiveFlag::new(false)).map_err(|e| session.error(e))?;
    feed.fetch_once().await.map_err(|e| session.error(e))
}

fn build_filter(args: &FilterArgs) -> IncidentFilter {
    IncidentFilter {
        severity: args.severity,
        kind: args.kind.clone(),
        search: args.search.clone(),
        period: args.period,
        sort: args.sort.map(|field| (field, args.order)),
        limit: args.limit,
    }
}

async fn list(session: &Session, args: &FilterArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = fetch_snapshot(session).await?;
    let incidents = build_filter(args).apply(&snapshot, Utc::now());
    tracing::debug!(
        fetched = snapshot.len(),
        shown = incidents.len(),
        "filtered incidents"
    );

    let out = output::render_list(
        global.output,
        &incidents,
        |i| IncidentRow::from(i),
        |i| i.id.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Summary ─────────────────────────────────────────────────────────

fn summary_detail(s: &IncidentSummary, color: bool) -> String {
    use sentinel_core::Severity;

    // Pad on the plain label so colour codes don't skew alignment.
    let count = |severity: Severity, n: usize| {
        let width = severity.as_ref().len() + 1;
        let pad = " ".repeat(14usize.saturating_sub(width));
        format!("{}:{pad}{n}", output::severity_label(severity, color))
    };
    let trend = s
        .trend_percent()
        .map_or_else(|| "n/a".to_owned(), |pct| format!("{pct:+.0}%"));
    [
        format!("Total:        {}", s.total),
        count(Severity::Critical, s.critical),
        count(Severity::High, s.high),
        count(Severity::Medium, s.medium),
        count(Severity::Low, s.low),
        format!("Urgent:       {}", s.urgent),
        format!("Anomalies:    {}", s.anomalies),
        format!("Last hour:    {}", s.last_hour),
        format!("Last 24h:     {} ({trend} vs previous day)", s.last_24h),
        format!("Last 7 days:  {}", s.last_7d),
    ]
    .join("\n")
}

async fn summary(
    session: &Session,
    args: &SummaryArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snapshot = fetch_snapshot(session).await?;
    let now = Utc::now();
    let scoped = IncidentFilter {
        period: args.period,
        ..IncidentFilter::default()
    }
    .apply(&snapshot, now);
    let stats = IncidentSummary::from_incidents(&scoped, now);

    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &stats,
        |s| summary_detail(s, color),
        |s| s.total.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Watch ───────────────────────────────────────────────────────────

/// Rings the terminal bell on stderr so stdout stays machine-readable.
struct TerminalBell;

impl AlertTone for TerminalBell {
    fn play(&self, _incident: &Incident) {
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(b"\x07");
        let _ = err.flush();
    }
}

fn notification_line(n: &Notification, format: OutputFormat, color: bool) -> String {
    let i = &n.incident;
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(i.as_ref()),
        OutputFormat::Yaml => format!("---\n{}", output::render_yaml(i.as_ref())),
        OutputFormat::Plain => i.id.to_string(),
        OutputFormat::Table => format!(
            "{}  {:<8}  {}  {}: {}",
            local_time(i.timestamp),
            output::severity_label(i.severity, color),
            i.source_or_default(),
            i.kind_or_default(),
            i.message_or_default(),
        ),
    }
}

fn report_state(state: &FeedState, quiet: bool) {
    if quiet {
        return;
    }
    if let Some(ref err) = state.error {
        eprintln!("! fetch failed ({}): {err}", err.kind());
    } else if state.new_count > 0 {
        tracing::info!(new = state.new_count, total = state.incidents.len(), "feed updated");
    }
}

async fn watch(session: &Session, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = session.feed.clone();
    if let Some(secs) = args.interval {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        config.poll_interval = Duration::from_secs(secs);
    }
    // Watching only makes sense on a timer.
    config.auto_refresh = true;

    let feed = IncidentFeed::from_config(&config, LiveFlag::new(true)).map_err(|e| session.error(e))?;
    let tone: Arc<dyn AlertTone> = if args.no_bell {
        Arc::new(SilentTone)
    } else {
        Arc::new(TerminalBell)
    };
    let queue = NotificationQueue::new(config.notification_settings(), tone);

    let cancel = CancellationToken::new();
    let runner = tokio::spawn({
        let queue = queue.clone();
        let stream = feed.subscribe();
        let cancel = cancel.child_token();
        async move { queue.run(stream, cancel).await }
    });

    if !global.quiet {
        eprintln!(
            "Watching {} every {}s (Ctrl-C to stop)",
            config.api_url,
            config.poll_interval.as_secs()
        );
    }
    feed.start().await;

    let color = output::should_color(global.color);
    let mut states = feed.subscribe();
    let mut notifications = queue.subscribe();
    let mut printed: HashSet<Uuid> = HashSet::new();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            state = states.changed() => match state {
                Some(state) => report_state(&state, global.quiet),
                None => break,
            },
            active = notifications.changed() => {
                let Some(active) = active else { break };
                // Newest first in the queue; print oldest first.
                for n in active.iter().rev().filter(|n| !printed.contains(&n.id)) {
                    output::print_output(&notification_line(n, global.output, color), global.quiet);
                }
                printed = active.iter().map(|n| n.id).collect();
            }
        }
    }

    cancel.cancel();
    let _ = runner.await;
    feed.stop().await;
    tracing::info!("watch stopped");
    Ok(())
}
