use thiserror::Error;
use uuid::Uuid;

use crate::lifecycle::JobStatus;

/// Domain failures produced by the lifecycle guards.
///
/// Every variant is terminal for the call that produced it: the core never
/// retries, and a rejected operation leaves the job untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("Deadline must be in the future")]
    InvalidDeadline,

    #[error("Budget must be strictly positive")]
    InvalidBudget,

    #[error("Description must not be empty")]
    EmptyDescription,

    #[error("Result reference must not be empty")]
    EmptyResultReference,

    #[error("Operation not valid while job is {0}")]
    InvalidState(JobStatus),

    #[error("Only the requester may perform this operation")]
    NotRequester,

    #[error("Only the assigned worker may submit a result")]
    NotAssignedWorker,

    #[error("A requester may not accept its own job")]
    SelfAcceptanceNotAllowed,

    #[error("Job deadline has passed")]
    JobExpired,

    #[error("Job deadline has not passed yet")]
    JobNotYetExpired,

    #[error("Job not found: {0}")]
    NotFound(Uuid),
}

/// Raised when a digest string is not exactly 64 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Digest must be 64 hex characters (32 bytes)")]
pub struct DigestParseError;

/// Errors surfaced by the store boundary: a domain rejection, or a failure
/// to durably persist an accepted transition.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
