//! Terminal rendering of jobs and timelines.
//!
//! Uses the `console` crate for colored status output. The renderer is a
//! pure read-side view: it only ever formats job snapshots and timeline
//! records, never mutates them.

use chrono::SecondsFormat;
use console::Style;

use crate::lifecycle::{Job, JobStatus};

/// Styled terminal output for job snapshots and audit timelines.
pub struct Renderer {
    bold: Style,
    green: Style,
    red: Style,
    yellow: Style,
    cyan: Style,
    dim: Style,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            bold: Style::new().bold(),
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            cyan: Style::new().cyan(),
            dim: Style::new().dim(),
        }
    }

    fn status_style(&self, status: JobStatus) -> &Style {
        match status {
            JobStatus::Created => &self.yellow,
            JobStatus::Accepted | JobStatus::Submitted => &self.cyan,
            JobStatus::Settled => &self.green,
            JobStatus::Refunded => &self.red,
        }
    }

    /// Full detail view of one job.
    pub fn job(&self, job: &Job) {
        println!(
            "{} {} — {}",
            self.bold.apply_to("Job"),
            job.id(),
            self.status_style(job.status()).apply_to(job.status())
        );
        println!("  description: {}", job.description());
        println!("  requester:   {}", job.requester());
        match job.worker() {
            Some(worker) => println!("  worker:      {worker}"),
            None => println!("  worker:      {}", self.dim.apply_to("(unassigned)")),
        }
        println!(
            "  budget:      {} (escrow {})",
            job.budget(),
            job.escrow_balance()
        );
        println!("  deadline:    {}", rfc3339(job.deadline()));
        if let Some(result) = job.result() {
            println!(
                "  result:      {} (sha256 {}…)",
                result.reference,
                result.digest.preview()
            );
        }
        println!(
            "  created:     {}  updated: {}",
            rfc3339(job.created_at()),
            rfc3339(job.updated_at())
        );
    }

    /// One-line summary used by `list`.
    pub fn job_row(&self, job: &Job) {
        println!(
            "{}  {:<9}  {:>8}  {}",
            job.id(),
            self.status_style(job.status())
                .apply_to(job.status())
                .to_string(),
            job.budget(),
            job.description()
        );
    }

    /// Ordered audit timeline of one job.
    pub fn timeline(&self, job: &Job) {
        println!(
            "{}",
            self.bold.apply_to(format!("─── Timeline {} ───", job.id()))
        );
        for record in job.timeline() {
            println!(
                "{}  {:<15}  {:<10}  {}",
                self.dim.apply_to(rfc3339(record.timestamp)),
                record.kind.to_string(),
                record.actor.to_string(),
                record.note
            );
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn rfc3339(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
