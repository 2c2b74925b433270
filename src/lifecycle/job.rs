//! The work-order data model: job, parties, result digest and timeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::DigestParseError;

use super::escrow::Escrow;

/// Opaque account identifier for a party (requester or worker).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 digest binding a result reference to specific content.
///
/// The core stores and compares the 32 raw bytes; hex encoding is display
/// convention only. The payload itself is never inspected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultDigest([u8; 32]);

impl ResultDigest {
    /// Hash a result payload. Used by callers that hold the content; the
    /// lifecycle itself only ever sees the digest.
    pub fn of_payload(payload: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(payload);
        Self(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short prefix for human-readable timeline notes. Presentational only;
    /// the stored digest stays exact.
    pub fn preview(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Display for ResultDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ResultDigest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| DigestParseError)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| DigestParseError)?;
        Ok(Self(bytes))
    }
}

impl Serialize for ResultDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ResultDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reference + digest pair recorded at submission. Both fields are set
/// together and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedResult {
    pub reference: String,
    pub digest: ResultDigest,
}

/// Lifecycle position of a job. Transitions only move forward; `Settled`
/// and `Refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Created,
    Accepted,
    Submitted,
    Settled,
    Refunded,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Settled | JobStatus::Refunded)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Created => write!(f, "CREATED"),
            JobStatus::Accepted => write!(f, "ACCEPTED"),
            JobStatus::Submitted => write!(f, "SUBMITTED"),
            JobStatus::Settled => write!(f, "SETTLED"),
            JobStatus::Refunded => write!(f, "REFUNDED"),
        }
    }
}

/// Kind tag for a timeline record, one per accepted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineKind {
    JobCreated,
    JobAccepted,
    ResultSubmitted,
    JobSettled,
    JobRefunded,
}

impl fmt::Display for TimelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineKind::JobCreated => write!(f, "JobCreated"),
            TimelineKind::JobAccepted => write!(f, "JobAccepted"),
            TimelineKind::ResultSubmitted => write!(f, "ResultSubmitted"),
            TimelineKind::JobSettled => write!(f, "JobSettled"),
            TimelineKind::JobRefunded => write!(f, "JobRefunded"),
        }
    }
}

/// Audit record of one accepted transition. Append-only; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineRecord {
    pub kind: TimelineKind,
    pub actor: AccountId,
    pub timestamp: DateTime<Utc>,
    pub note: String,
}

/// A single escrowed work order.
///
/// All mutation goes through the guarded transitions in
/// [`Lifecycle`](super::Lifecycle); outside this module the job is
/// read-only. The escrow and timeline are owned exclusively by the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub(super) id: Uuid,
    pub(super) requester: AccountId,
    pub(super) worker: Option<AccountId>,
    pub(super) description: String,
    pub(super) budget: u64,
    pub(super) deadline: DateTime<Utc>,
    pub(super) status: JobStatus,
    pub(super) result: Option<SubmittedResult>,
    pub(super) created_at: DateTime<Utc>,
    pub(super) updated_at: DateTime<Utc>,
    pub(super) escrow: Escrow,
    pub(super) timeline: Vec<TimelineRecord>,
}

impl Job {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn requester(&self) -> &AccountId {
        &self.requester
    }

    /// Unset exactly while the job is in `Created`.
    pub fn worker(&self) -> Option<&AccountId> {
        self.worker.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Set exactly while the job is in `Submitted` or `Settled`.
    pub fn result(&self) -> Option<&SubmittedResult> {
        self.result.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Equals the budget until the single terminal payout zeroes it.
    pub fn escrow_balance(&self) -> u64 {
        self.escrow.balance()
    }

    /// Ordered, read-only view of the audit timeline.
    pub fn timeline(&self) -> &[TimelineRecord] {
        &self.timeline
    }

    pub(super) fn record(
        &mut self,
        kind: TimelineKind,
        actor: &AccountId,
        timestamp: DateTime<Utc>,
        note: String,
    ) {
        self.timeline.push(TimelineRecord {
            kind,
            actor: actor.clone(),
            timestamp,
            note,
        });
    }
}
