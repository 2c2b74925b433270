//! clap-based command line interface.
//!
//! Defines the [`Cli`] struct with the lifecycle subcommands (`create`,
//! `accept`, `submit`, `settle`, `refund`) and the read-side queries
//! (`show`, `timeline`, `list`), plus global flags (--store, --json).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::lifecycle::JobStatus;

/// jobvault — escrow-backed work-order ledger.
#[derive(Debug, Parser)]
#[command(name = "jobvault", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path of the store file (overrides jobvault.toml and JOBVAULT_STORE).
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Emit machine-readable JSON instead of styled output.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a job and lock its budget into escrow.
    Create {
        /// Free-text scope statement for the work order.
        description: String,

        /// Acting account (the requester).
        #[arg(long = "as", value_name = "ACCOUNT")]
        actor: String,

        /// Amount to lock into escrow. Must be strictly positive.
        #[arg(long)]
        budget: u64,

        /// Absolute deadline as an RFC 3339 timestamp.
        #[arg(long, conflicts_with = "deadline_in")]
        deadline: Option<String>,

        /// Deadline as hours from now. Defaults to the configured value.
        #[arg(long, value_name = "HOURS")]
        deadline_in: Option<i64>,
    },

    /// Accept an open job as its worker.
    Accept {
        job: Uuid,

        /// Acting account (the worker).
        #[arg(long = "as", value_name = "ACCOUNT")]
        actor: String,
    },

    /// Submit the result for an accepted job.
    Submit {
        job: Uuid,

        /// Acting account (must be the assigned worker).
        #[arg(long = "as", value_name = "ACCOUNT")]
        actor: String,

        /// Opaque content reference for the result (e.g. an ipfs:// URI).
        #[arg(long)]
        reference: String,

        /// SHA-256 digest of the result payload, 64 hex characters.
        #[arg(long, conflicts_with = "payload", required_unless_present = "payload")]
        digest: Option<String>,

        /// Hash this local file instead of passing --digest.
        #[arg(long)]
        payload: Option<PathBuf>,
    },

    /// Release the escrow to the worker for a submitted job.
    Settle {
        job: Uuid,

        /// Acting account (must be the requester).
        #[arg(long = "as", value_name = "ACCOUNT")]
        actor: String,
    },

    /// Reclaim the escrow after the deadline has passed.
    Refund {
        job: Uuid,

        /// Acting account (must be the requester).
        #[arg(long = "as", value_name = "ACCOUNT")]
        actor: String,
    },

    /// Show one job.
    Show { job: Uuid },

    /// Show the audit timeline of one job.
    Timeline { job: Uuid },

    /// List jobs, most recently created first.
    List {
        /// Only show jobs in this status.
        #[arg(long)]
        status: Option<StatusArg>,
    },
}

/// Status filter accepted by `list`, mapped to [`JobStatus`] internally.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Created,
    Accepted,
    Submitted,
    Settled,
    Refunded,
}

impl From<StatusArg> for JobStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Created => JobStatus::Created,
            StatusArg::Accepted => JobStatus::Accepted,
            StatusArg::Submitted => JobStatus::Submitted,
            StatusArg::Settled => JobStatus::Settled,
            StatusArg::Refunded => JobStatus::Refunded,
        }
    }
}
