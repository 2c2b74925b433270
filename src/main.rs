mod cli;
mod config;
mod error;
mod lifecycle;
mod store;
mod ui;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use console::Style;

use cli::{Cli, Command};
use config::VaultConfig;
use error::JobError;
use lifecycle::{AccountId, Job, ResultDigest};
use store::JobStore;
use ui::Renderer;

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", Style::new().red().bold().apply_to("error:"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = VaultConfig::load()?;
    let store_path = cli
        .store
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.store_path));
    let mut store = JobStore::open(&store_path)?;

    // All lifecycle guards compare against this single snapshot of "now".
    let now = Utc::now();
    let renderer = Renderer::new();

    match cli.command {
        Command::Create {
            description,
            actor,
            budget,
            deadline,
            deadline_in,
        } => {
            let deadline = resolve_deadline(
                deadline.as_deref(),
                deadline_in,
                config.default_deadline_hours,
                now,
            )?;
            let job = store.create_job(
                &description,
                budget,
                deadline,
                &AccountId::from(actor),
                now,
            )?;
            emit(&renderer, cli.json, &job)?;
        }
        Command::Accept { job, actor } => {
            let job = store.accept_job(job, &AccountId::from(actor), now)?;
            emit(&renderer, cli.json, &job)?;
        }
        Command::Submit {
            job,
            actor,
            reference,
            digest,
            payload,
        } => {
            let digest = resolve_digest(digest.as_deref(), payload.as_deref())?;
            let job =
                store.submit_result(job, &AccountId::from(actor), &reference, digest, now)?;
            emit(&renderer, cli.json, &job)?;
        }
        Command::Settle { job, actor } => {
            let job = store.settle_job(job, &AccountId::from(actor), now)?;
            emit(&renderer, cli.json, &job)?;
        }
        Command::Refund { job, actor } => {
            let job = store.refund_job(job, &AccountId::from(actor), now)?;
            emit(&renderer, cli.json, &job)?;
        }
        Command::Show { job } => {
            let job = store.get(job).ok_or(JobError::NotFound(job))?;
            emit(&renderer, cli.json, job)?;
        }
        Command::Timeline { job } => {
            let job = store.get(job).ok_or(JobError::NotFound(job))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(job.timeline())?);
            } else {
                renderer.timeline(job);
            }
        }
        Command::List { status } => {
            let jobs = store.list(status.map(Into::into));
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&jobs)?);
            } else {
                for job in jobs {
                    renderer.job_row(job);
                }
            }
        }
    }

    Ok(())
}

/// Resolve the creation deadline: an absolute RFC 3339 timestamp wins,
/// otherwise `--deadline-in` hours, otherwise the configured default.
fn resolve_deadline(
    absolute: Option<&str>,
    in_hours: Option<i64>,
    default_hours: i64,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    if let Some(s) = absolute {
        let parsed = DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("invalid RFC 3339 deadline: {s}"))?;
        return Ok(parsed.with_timezone(&Utc));
    }
    let hours = in_hours.unwrap_or(default_hours);
    Ok(now + Duration::hours(hours))
}

/// Resolve the result digest from either a hex string or a local payload
/// file to hash. clap guarantees at least one is present.
fn resolve_digest(hex: Option<&str>, payload: Option<&Path>) -> Result<ResultDigest> {
    match (hex, payload) {
        (Some(s), _) => Ok(s.parse::<ResultDigest>()?),
        (None, Some(path)) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read payload {}", path.display()))?;
            Ok(ResultDigest::of_payload(&bytes))
        }
        (None, None) => bail!("either --digest or --payload is required"),
    }
}

fn emit(renderer: &Renderer, json: bool, job: &Job) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(job)?);
    } else {
        renderer.job(job);
    }
    Ok(())
}
