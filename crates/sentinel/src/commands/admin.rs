//! `admin` handlers: generator control and backend maintenance.

use chrono::Local;

use sentinel_api::{
    AdminStats, ClearReport, CrisisReport, GeneratedBatch, GeneratorAction, GeneratorSettings,
    GeneratorStatus, SentinelClient,
};
use sentinel_core::{CoreError, HttpSource};

use crate::cli::{AdminArgs, AdminCommand, GeneratorCommand, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Detail views ────────────────────────────────────────────────────

fn on_off(running: bool) -> &'static str {
    if running { "running" } else { "stopped" }
}

fn stats_detail(s: &AdminStats) -> String {
    let last = s.last_incident.as_ref().map_or_else(
        || "none".to_owned(),
        |last| {
            let when = last.timestamp.map_or_else(
                || "?".to_owned(),
                |ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
            );
            format!("{when} ({})", last.severity.as_deref().unwrap_or("unknown"))
        },
    );
    [
        format!("Incidents:   {}", s.total_incidents),
        format!("Today:       {}", s.today_count),
        format!("Latest:      {last}"),
        format!("Generator:   {} ({} generated)", on_off(s.generator_running), s.generator_count),
    ]
    .join("\n")
}

fn status_detail(s: &GeneratorStatus) -> String {
    [
        format!("Generator:     {}", on_off(s.running)),
        format!("Generated:     {}", s.generated),
        format!("Interval:      {}s", s.settings.interval),
        format!("Anomaly rate:  {}%", s.settings.anomaly_rate),
    ]
    .join("\n")
}

fn action_detail(a: &GeneratorAction) -> String {
    match a.generated {
        Some(n) if a.message.is_empty() => format!("{} ({n} generated)", a.status),
        _ if a.message.is_empty() => a.status.clone(),
        _ => a.message.clone(),
    }
}

fn batch_detail(b: &GeneratedBatch) -> String {
    let mut by_severity: Vec<(&str, usize)> = Vec::new();
    for inc in &b.incidents {
        let severity = inc.severity.as_str();
        match by_severity.iter_mut().find(|(s, _)| *s == severity) {
            Some((_, n)) => *n += 1,
            None => by_severity.push((severity, 1)),
        }
    }
    let breakdown = by_severity
        .iter()
        .map(|(s, n)| format!("{s}: {n}"))
        .collect::<Vec<_>>()
        .join(", ");
    if breakdown.is_empty() {
        format!("Created {} incidents", b.generated)
    } else {
        format!("Created {} incidents ({breakdown})", b.generated)
    }
}

fn crisis_detail(c: &CrisisReport) -> String {
    format!(
        "Created {} incidents, {} high or critical",
        c.generated, c.critical
    )
}

fn clear_detail(c: &ClearReport) -> String {
    format!("Deleted {} incidents", c.deleted)
}

// ── Handler ─────────────────────────────────────────────────────────

/// Logged-in client for the session's backend.
async fn connect(session: &Session) -> Result<SentinelClient, CliError> {
    let source = HttpSource::from_config(&session.feed).map_err(|e| session.error(e))?;
    source.ensure_session().await.map_err(|e| session.error(e))?;
    Ok(source.client().clone())
}

pub async fn handle(
    session: &Session,
    args: AdminArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let api_err = |e: sentinel_api::Error| session.error(CoreError::from(e));

    if matches!(args.command, AdminCommand::ClearDb)
        && !util::confirm(
            &format!("Delete ALL incidents on {}?", session.feed.api_url),
            global.yes,
        )?
    {
        if !global.quiet {
            eprintln!("Aborted");
        }
        return Ok(());
    }

    let client = connect(session).await?;

    let out = match args.command {
        AdminCommand::Stats => {
            let stats = client.admin_stats().await.map_err(api_err)?;
            output::render_single(global.output, &stats, stats_detail, |s| {
                s.total_incidents.to_string()
            })
        }
        AdminCommand::Generator(gen_args) => match gen_args.command {
            GeneratorCommand::Status => {
                let status = client.generator_status().await.map_err(api_err)?;
                output::render_single(global.output, &status, status_detail, |s| {
                    on_off(s.running).to_owned()
                })
            }
            GeneratorCommand::Start {
                interval,
                anomaly_rate,
            } => {
                let settings = GeneratorSettings {
                    interval,
                    anomaly_rate,
                };
                let action = client.start_generator(&settings).await.map_err(api_err)?;
                output::render_single(global.output, &action, action_detail, |a| a.status.clone())
            }
            GeneratorCommand::Stop => {
                let action = client.stop_generator().await.map_err(api_err)?;
                output::render_single(global.output, &action, action_detail, |a| a.status.clone())
            }
        },
        AdminCommand::GenerateTest { count } => {
            let batch = client.generate_test(count).await.map_err(api_err)?;
            output::render_single(global.output, &batch, batch_detail, |b| {
                b.generated.to_string()
            })
        }
        AdminCommand::Crisis => {
            let report = client.crisis_scenario().await.map_err(api_err)?;
            output::render_single(global.output, &report, crisis_detail, |c| {
                c.generated.to_string()
            })
        }
        AdminCommand::ClearDb => {
            let report = client.clear_database().await.map_err(api_err)?;
            tracing::info!(deleted = report.deleted, "incident database cleared");
            output::render_single(global.output, &report, clear_detail, |c| {
                c.deleted.to_string()
            })
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use sentinel_api::{GeneratedIncident, RecordId};

    use super::*;

    #[test]
    fn batch_detail_groups_by_severity() {
        let batch = GeneratedBatch {
            generated: 3,
            incidents: vec![
                GeneratedIncident {
                    id: RecordId::Number(1),
                    severity: "low".into(),
                },
                GeneratedIncident {
                    id: RecordId::Number(2),
                    severity: "critical".into(),
                },
                GeneratedIncident {
                    id: RecordId::Number(3),
                    severity: "low".into(),
                },
            ],
        };
        assert_eq!(batch_detail(&batch), "Created 3 incidents (low: 2, critical: 1)");
    }

    #[test]
    fn no_op_action_falls_back_to_status() {
        let action = GeneratorAction {
            status: "stopped".into(),
            message: String::new(),
            generated: Some(4),
            settings: None,
        };
        assert_eq!(action_detail(&action), "stopped (4 generated)");
    }
}
