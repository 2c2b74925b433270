//! Guarded transitions over the job state machine.
//!
//! ```text
//! Created  --accept(worker)-->     Accepted
//! Created  --refund(requester)-->  Refunded   [now > deadline]
//! Accepted --submit(worker)-->     Submitted
//! Accepted --refund(requester)-->  Refunded   [now > deadline]
//! Submitted--settle(requester)-->  Settled
//! Submitted--refund(requester)-->  Refunded   [now > deadline]
//! ```
//!
//! Guards are evaluated in a fixed order: state validity first (a wrong-state
//! call is a protocol error independent of identity), then authorization,
//! then deadline, then input validation. Every guard failure returns before
//! any mutation, so a rejected call leaves the job untouched.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::JobError;

use super::escrow::{Escrow, Payout};
use super::job::{AccountId, Job, JobStatus, ResultDigest, SubmittedResult, TimelineKind};

/// Drives jobs through their guarded lifecycle. All operations take an
/// injected `now`; the controller never reads the wall clock.
pub struct Lifecycle;

impl Lifecycle {
    /// Create a new job in `Created`, locking `budget` into a fresh escrow.
    pub fn create(
        description: &str,
        budget: u64,
        deadline: DateTime<Utc>,
        requester: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Job, JobError> {
        if deadline <= now {
            return Err(JobError::InvalidDeadline);
        }
        if budget == 0 {
            return Err(JobError::InvalidBudget);
        }
        if description.trim().is_empty() {
            return Err(JobError::EmptyDescription);
        }

        let mut job = Job {
            id: Uuid::new_v4(),
            requester: requester.clone(),
            worker: None,
            description: description.to_string(),
            budget,
            deadline,
            status: JobStatus::Created,
            result: None,
            created_at: now,
            updated_at: now,
            escrow: Escrow::lock(budget),
            timeline: Vec::new(),
        };
        job.record(
            TimelineKind::JobCreated,
            requester,
            now,
            format!("Locked {budget} in escrow, deadline {deadline}"),
        );
        Ok(job)
    }

    /// A worker takes the job. Rejected for the requester itself and for
    /// jobs whose deadline has already passed.
    pub fn accept(job: &mut Job, actor: &AccountId, now: DateTime<Utc>) -> Result<(), JobError> {
        match job.status {
            JobStatus::Created => {}
            other => return Err(JobError::InvalidState(other)),
        }
        if *actor == job.requester {
            return Err(JobError::SelfAcceptanceNotAllowed);
        }
        if now > job.deadline {
            return Err(JobError::JobExpired);
        }

        job.worker = Some(actor.clone());
        job.status = JobStatus::Accepted;
        job.updated_at = now;
        job.record(
            TimelineKind::JobAccepted,
            actor,
            now,
            format!("Accepted by {actor}"),
        );
        Ok(())
    }

    /// The assigned worker submits a result reference plus its digest.
    /// The timeline note carries only a short digest preview; the stored
    /// digest is exact.
    pub fn submit_result(
        job: &mut Job,
        actor: &AccountId,
        reference: &str,
        digest: ResultDigest,
        now: DateTime<Utc>,
    ) -> Result<(), JobError> {
        match job.status {
            JobStatus::Accepted => {}
            other => return Err(JobError::InvalidState(other)),
        }
        if job.worker.as_ref() != Some(actor) {
            return Err(JobError::NotAssignedWorker);
        }
        if now > job.deadline {
            return Err(JobError::JobExpired);
        }
        if reference.trim().is_empty() {
            return Err(JobError::EmptyResultReference);
        }

        job.result = Some(SubmittedResult {
            reference: reference.to_string(),
            digest,
        });
        job.status = JobStatus::Submitted;
        job.updated_at = now;
        job.record(
            TimelineKind::ResultSubmitted,
            actor,
            now,
            format!("Result {reference} (sha256 {}…)", digest.preview()),
        );
        Ok(())
    }

    /// The requester accepts the submitted result and releases the escrow to
    /// the worker. No deadline guard here: settlement stays available to the
    /// requester even after expiry.
    pub fn settle(
        job: &mut Job,
        actor: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Payout, JobError> {
        match job.status {
            JobStatus::Submitted => {}
            other => return Err(JobError::InvalidState(other)),
        }
        if *actor != job.requester {
            return Err(JobError::NotRequester);
        }
        // A Submitted job always has a worker; guard instead of unwrap.
        let worker = match &job.worker {
            Some(w) => w.clone(),
            None => return Err(JobError::InvalidState(job.status)),
        };

        let payout = job.escrow.pay_all(&worker);
        job.status = JobStatus::Settled;
        job.updated_at = now;
        job.record(
            TimelineKind::JobSettled,
            actor,
            now,
            format!("Paid {} to {worker}", payout.amount),
        );
        Ok(payout)
    }

    /// Timeout remedy: after the deadline has strictly passed, the requester
    /// reclaims the escrow from any non-terminal state. Never available
    /// before expiry, even with both parties willing.
    pub fn refund(
        job: &mut Job,
        actor: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Payout, JobError> {
        if job.status.is_terminal() {
            return Err(JobError::InvalidState(job.status));
        }
        if *actor != job.requester {
            return Err(JobError::NotRequester);
        }
        if now <= job.deadline {
            return Err(JobError::JobNotYetExpired);
        }

        let requester = job.requester.clone();
        let payout = job.escrow.pay_all(&requester);
        job.status = JobStatus::Refunded;
        job.updated_at = now;
        job.record(
            TimelineKind::JobRefunded,
            actor,
            now,
            format!("Refunded {} to {requester}", payout.amount),
        );
        Ok(payout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(offset_secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap() + Duration::seconds(offset_secs)
    }

    fn requester() -> AccountId {
        AccountId::from("alice")
    }

    fn worker() -> AccountId {
        AccountId::from("bob")
    }

    fn digest() -> ResultDigest {
        ResultDigest::of_payload(b"result payload")
    }

    /// Budget 100, created at t(0), deadline t(10).
    fn make_job() -> Job {
        Lifecycle::create("Run inference batch 7", 100, t(10), &requester(), t(0)).unwrap()
    }

    // --- create ---

    #[test]
    fn create_locks_budget_and_records_timeline() {
        let job = make_job();

        assert_eq!(job.status(), JobStatus::Created);
        assert_eq!(job.budget(), 100);
        assert_eq!(job.escrow_balance(), 100);
        assert_eq!(job.worker(), None);
        assert_eq!(job.result(), None);
        assert_eq!(job.created_at(), t(0));
        assert_eq!(job.updated_at(), t(0));

        assert_eq!(job.timeline().len(), 1);
        assert_eq!(job.timeline()[0].kind, TimelineKind::JobCreated);
        assert_eq!(job.timeline()[0].actor, requester());
    }

    #[test]
    fn create_rejects_deadline_not_in_future() {
        let err = Lifecycle::create("x", 100, t(0), &requester(), t(0)).unwrap_err();
        assert_eq!(err, JobError::InvalidDeadline);

        let err = Lifecycle::create("x", 100, t(-5), &requester(), t(0)).unwrap_err();
        assert_eq!(err, JobError::InvalidDeadline);
    }

    #[test]
    fn create_rejects_zero_budget() {
        let err = Lifecycle::create("x", 0, t(10), &requester(), t(0)).unwrap_err();
        assert_eq!(err, JobError::InvalidBudget);
    }

    #[test]
    fn create_rejects_empty_description() {
        let err = Lifecycle::create("   ", 100, t(10), &requester(), t(0)).unwrap_err();
        assert_eq!(err, JobError::EmptyDescription);
    }

    // --- accept ---

    #[test]
    fn accept_assigns_worker() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();

        assert_eq!(job.status(), JobStatus::Accepted);
        assert_eq!(job.worker(), Some(&worker()));
        assert_eq!(job.updated_at(), t(2));
        assert_eq!(job.timeline().len(), 2);
        assert_eq!(job.timeline()[1].kind, TimelineKind::JobAccepted);
    }

    #[test]
    fn self_accept_rejected() {
        let mut job = make_job();
        let before = job.clone();

        let err = Lifecycle::accept(&mut job, &requester(), t(2)).unwrap_err();
        assert_eq!(err, JobError::SelfAcceptanceNotAllowed);
        assert_eq!(job, before);
    }

    #[test]
    fn self_accept_rejected_even_after_deadline() {
        // Authorization is checked before timing.
        let mut job = make_job();
        let err = Lifecycle::accept(&mut job, &requester(), t(20)).unwrap_err();
        assert_eq!(err, JobError::SelfAcceptanceNotAllowed);
    }

    #[test]
    fn accept_after_deadline_rejected() {
        let mut job = make_job();
        let err = Lifecycle::accept(&mut job, &worker(), t(11)).unwrap_err();
        assert_eq!(err, JobError::JobExpired);
        assert_eq!(job.status(), JobStatus::Created);
    }

    #[test]
    fn accept_at_deadline_allowed() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(10)).unwrap();
        assert_eq!(job.status(), JobStatus::Accepted);
    }

    #[test]
    fn accept_twice_rejected() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();

        let err = Lifecycle::accept(&mut job, &AccountId::from("carol"), t(3)).unwrap_err();
        assert_eq!(err, JobError::InvalidState(JobStatus::Accepted));
        assert_eq!(job.worker(), Some(&worker()));
    }

    // --- submit_result ---

    #[test]
    fn submit_records_result() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();
        Lifecycle::submit_result(&mut job, &worker(), "ipfs://QmResult", digest(), t(3)).unwrap();

        assert_eq!(job.status(), JobStatus::Submitted);
        let result = job.result().unwrap();
        assert_eq!(result.reference, "ipfs://QmResult");
        assert_eq!(result.digest, digest());

        let record = &job.timeline()[2];
        assert_eq!(record.kind, TimelineKind::ResultSubmitted);
        assert!(record.note.contains(&digest().preview()));
        assert!(!record.note.contains(&digest().to_hex()));
    }

    #[test]
    fn submit_by_wrong_actor_rejected() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();
        let before = job.clone();

        let err = Lifecycle::submit_result(
            &mut job,
            &AccountId::from("mallory"),
            "ipfs://QmResult",
            digest(),
            t(3),
        )
        .unwrap_err();
        assert_eq!(err, JobError::NotAssignedWorker);
        assert_eq!(job, before);
    }

    #[test]
    fn submit_by_wrong_actor_rejected_before_expiry_check() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();

        // Wrong actor on an expired job still reports the identity failure.
        let err =
            Lifecycle::submit_result(&mut job, &requester(), "ref", digest(), t(20)).unwrap_err();
        assert_eq!(err, JobError::NotAssignedWorker);
    }

    #[test]
    fn submit_after_deadline_rejected() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();

        let err = Lifecycle::submit_result(&mut job, &worker(), "ref", digest(), t(11)).unwrap_err();
        assert_eq!(err, JobError::JobExpired);
        assert_eq!(job.status(), JobStatus::Accepted);
    }

    #[test]
    fn submit_empty_reference_rejected() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();

        let err = Lifecycle::submit_result(&mut job, &worker(), "  ", digest(), t(3)).unwrap_err();
        assert_eq!(err, JobError::EmptyResultReference);
    }

    #[test]
    fn submit_before_accept_rejected() {
        let mut job = make_job();
        let err = Lifecycle::submit_result(&mut job, &worker(), "ref", digest(), t(3)).unwrap_err();
        assert_eq!(err, JobError::InvalidState(JobStatus::Created));
    }

    // --- settle ---

    #[test]
    fn happy_path_settles_to_worker() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();
        Lifecycle::submit_result(&mut job, &worker(), "ipfs://QmResult", digest(), t(3)).unwrap();
        let payout = Lifecycle::settle(&mut job, &requester(), t(4)).unwrap();

        assert_eq!(job.status(), JobStatus::Settled);
        assert_eq!(payout.recipient, worker());
        assert_eq!(payout.amount, 100);
        assert_eq!(job.escrow_balance(), 0);

        let kinds: Vec<_> = job.timeline().iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TimelineKind::JobCreated,
                TimelineKind::JobAccepted,
                TimelineKind::ResultSubmitted,
                TimelineKind::JobSettled,
            ]
        );
    }

    #[test]
    fn settle_by_worker_rejected() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();
        Lifecycle::submit_result(&mut job, &worker(), "ref", digest(), t(3)).unwrap();

        let err = Lifecycle::settle(&mut job, &worker(), t(4)).unwrap_err();
        assert_eq!(err, JobError::NotRequester);
        assert_eq!(job.escrow_balance(), 100);
    }

    #[test]
    fn settle_before_submission_rejected() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();

        let err = Lifecycle::settle(&mut job, &requester(), t(3)).unwrap_err();
        assert_eq!(err, JobError::InvalidState(JobStatus::Accepted));
    }

    #[test]
    fn settle_twice_never_double_pays() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();
        Lifecycle::submit_result(&mut job, &worker(), "ref", digest(), t(3)).unwrap();
        Lifecycle::settle(&mut job, &requester(), t(4)).unwrap();

        let err = Lifecycle::settle(&mut job, &requester(), t(5)).unwrap_err();
        assert_eq!(err, JobError::InvalidState(JobStatus::Settled));
        assert_eq!(job.escrow_balance(), 0);
        assert_eq!(job.timeline().len(), 4);
    }

    #[test]
    fn late_settlement_allowed() {
        // No deadline guard on settle: a late-but-delivered job can still be
        // paid rather than forcing the refund path.
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();
        Lifecycle::submit_result(&mut job, &worker(), "ref", digest(), t(9)).unwrap();

        let payout = Lifecycle::settle(&mut job, &requester(), t(50)).unwrap();
        assert_eq!(payout.amount, 100);
        assert_eq!(job.status(), JobStatus::Settled);
    }

    // --- refund ---

    #[test]
    fn refund_at_deadline_rejected_one_second_later_allowed() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();

        // Strict inequality: now == deadline is not yet expired.
        let err = Lifecycle::refund(&mut job, &requester(), t(10)).unwrap_err();
        assert_eq!(err, JobError::JobNotYetExpired);

        let payout = Lifecycle::refund(&mut job, &requester(), t(11)).unwrap();
        assert_eq!(payout.recipient, requester());
        assert_eq!(payout.amount, 100);
        assert_eq!(job.status(), JobStatus::Refunded);
        assert_eq!(job.escrow_balance(), 0);
    }

    #[test]
    fn refund_before_expiry_rejected() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();
        let before = job.clone();

        let err = Lifecycle::refund(&mut job, &requester(), t(5)).unwrap_err();
        assert_eq!(err, JobError::JobNotYetExpired);
        assert_eq!(job, before);
    }

    #[test]
    fn refund_by_worker_rejected() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();

        let err = Lifecycle::refund(&mut job, &worker(), t(11)).unwrap_err();
        assert_eq!(err, JobError::NotRequester);
        assert_eq!(job.escrow_balance(), 100);
    }

    #[test]
    fn refund_from_created_and_submitted_states() {
        let mut job = make_job();
        let payout = Lifecycle::refund(&mut job, &requester(), t(11)).unwrap();
        assert_eq!(payout.amount, 100);
        assert_eq!(job.status(), JobStatus::Refunded);

        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();
        Lifecycle::submit_result(&mut job, &worker(), "ref", digest(), t(3)).unwrap();
        let payout = Lifecycle::refund(&mut job, &requester(), t(11)).unwrap();
        assert_eq!(payout.amount, 100);
        assert_eq!(job.status(), JobStatus::Refunded);
    }

    #[test]
    fn refund_after_settlement_rejected() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();
        Lifecycle::submit_result(&mut job, &worker(), "ref", digest(), t(3)).unwrap();
        Lifecycle::settle(&mut job, &requester(), t(4)).unwrap();

        let err = Lifecycle::refund(&mut job, &requester(), t(11)).unwrap_err();
        assert_eq!(err, JobError::InvalidState(JobStatus::Settled));
        assert_eq!(job.escrow_balance(), 0);
    }

    #[test]
    fn refund_twice_rejected() {
        let mut job = make_job();
        Lifecycle::refund(&mut job, &requester(), t(11)).unwrap();

        let err = Lifecycle::refund(&mut job, &requester(), t(12)).unwrap_err();
        assert_eq!(err, JobError::InvalidState(JobStatus::Refunded));
        assert_eq!(job.timeline().len(), 2);
    }

    // --- cross-cutting properties ---

    #[test]
    fn conservation_exactly_one_payout() {
        // Timeout refund scenario: failed refund attempt, then success.
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();
        assert!(Lifecycle::refund(&mut job, &requester(), t(5)).is_err());

        let balance_before = job.escrow_balance();
        let payout = Lifecycle::refund(&mut job, &requester(), t(11)).unwrap();
        assert_eq!(payout.amount, balance_before);
        assert_eq!(job.escrow_balance(), 0);

        // Terminal state: no further operation can move money.
        assert!(Lifecycle::settle(&mut job, &requester(), t(12)).is_err());
        assert!(Lifecycle::refund(&mut job, &requester(), t(12)).is_err());
        assert_eq!(job.escrow_balance(), 0);
    }

    #[test]
    fn escrow_untouched_until_terminal_transition() {
        let mut job = make_job();
        assert_eq!(job.escrow_balance(), 100);
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();
        assert_eq!(job.escrow_balance(), 100);
        Lifecycle::submit_result(&mut job, &worker(), "ref", digest(), t(3)).unwrap();
        assert_eq!(job.escrow_balance(), 100);
    }

    #[test]
    fn timeline_timestamps_are_ordered() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();
        Lifecycle::submit_result(&mut job, &worker(), "ref", digest(), t(3)).unwrap();
        Lifecycle::settle(&mut job, &requester(), t(4)).unwrap();

        let timestamps: Vec<_> = job.timeline().iter().map(|r| r.timestamp).collect();
        let mut sorted = timestamps.clone();
        sorted.sort();
        assert_eq!(timestamps, sorted);
    }

    #[test]
    fn job_serialization_roundtrip() {
        let mut job = make_job();
        Lifecycle::accept(&mut job, &worker(), t(2)).unwrap();
        Lifecycle::submit_result(&mut job, &worker(), "ipfs://QmX", digest(), t(3)).unwrap();

        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }
}
