//! Keyed job store: the single service boundary owning all jobs.
//!
//! Jobs are addressed by their `Uuid` identity in an explicit map, not
//! ambient global state. Commands return the updated job snapshot or a typed
//! failure; on success the whole store (job state and timeline together) is
//! persisted as one JSON snapshot via a temp-file rename, so a transition is
//! either fully durable or not applied at all.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{JobError, VaultError};
use crate::lifecycle::{AccountId, Job, JobStatus, Lifecycle, ResultDigest};

/// Map from job identity to job, plus the insertion order used to break
/// creation-time ties when listing.
pub struct JobStore {
    jobs: HashMap<Uuid, Job>,
    order: Vec<Uuid>,
    path: Option<PathBuf>,
}

/// On-disk shape of the store, jobs in insertion order.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    jobs: Vec<Job>,
}

impl JobStore {
    /// Store with no backing file. Used by tests and one-off tooling.
    pub fn in_memory() -> Self {
        Self {
            jobs: HashMap::new(),
            order: Vec::new(),
            path: None,
        }
    }

    /// Open a store backed by `path`, loading the existing snapshot if one
    /// is present.
    pub fn open(path: &Path) -> Result<Self, VaultError> {
        let mut store = Self {
            jobs: HashMap::new(),
            order: Vec::new(),
            path: Some(path.to_path_buf()),
        };
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let snapshot: Snapshot = serde_json::from_str(&contents)?;
            for job in snapshot.jobs {
                store.order.push(job.id());
                store.jobs.insert(job.id(), job);
            }
        }
        Ok(store)
    }

    // --- commands ---

    pub fn create_job(
        &mut self,
        description: &str,
        budget: u64,
        deadline: DateTime<Utc>,
        requester: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Job, VaultError> {
        let job = Lifecycle::create(description, budget, deadline, requester, now)?;
        let id = job.id();
        self.jobs.insert(id, job.clone());
        self.order.push(id);

        if let Err(e) = self.persist() {
            self.jobs.remove(&id);
            self.order.pop();
            return Err(e);
        }
        Ok(job)
    }

    pub fn accept_job(
        &mut self,
        id: Uuid,
        actor: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Job, VaultError> {
        self.transition(id, |job| Lifecycle::accept(job, actor, now))
    }

    pub fn submit_result(
        &mut self,
        id: Uuid,
        actor: &AccountId,
        reference: &str,
        digest: ResultDigest,
        now: DateTime<Utc>,
    ) -> Result<Job, VaultError> {
        self.transition(id, |job| {
            Lifecycle::submit_result(job, actor, reference, digest, now)
        })
    }

    pub fn settle_job(
        &mut self,
        id: Uuid,
        actor: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Job, VaultError> {
        self.transition(id, |job| Lifecycle::settle(job, actor, now).map(|_| ()))
    }

    pub fn refund_job(
        &mut self,
        id: Uuid,
        actor: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Job, VaultError> {
        self.transition(id, |job| Lifecycle::refund(job, actor, now).map(|_| ()))
    }

    // --- queries ---

    pub fn get(&self, id: Uuid) -> Option<&Job> {
        self.jobs.get(&id)
    }

    /// All jobs, most recently created first. Creation-time ties fall back
    /// to insertion order, newest insert first.
    pub fn list(&self, filter: Option<JobStatus>) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self
            .order
            .iter()
            .rev()
            .filter_map(|id| self.jobs.get(id))
            .filter(|job| filter.is_none_or(|status| job.status() == status))
            .collect();
        jobs.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    // --- internals ---

    /// Run a guarded transition against a copy of the job, then commit and
    /// persist. A guard failure or persistence failure leaves the in-memory
    /// store exactly as it was.
    fn transition<F>(&mut self, id: Uuid, op: F) -> Result<Job, VaultError>
    where
        F: FnOnce(&mut Job) -> Result<(), JobError>,
    {
        let current = self.jobs.get(&id).ok_or(JobError::NotFound(id))?;
        let mut updated = current.clone();
        op(&mut updated)?;

        let previous = self
            .jobs
            .insert(id, updated.clone())
            .ok_or(JobError::NotFound(id))?;
        if let Err(e) = self.persist() {
            self.jobs.insert(id, previous);
            return Err(e);
        }
        Ok(updated)
    }

    /// Write the full snapshot to a sibling temp file and rename it over the
    /// target, so readers never observe a half-written store.
    fn persist(&self) -> Result<(), VaultError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = Snapshot {
            jobs: self
                .order
                .iter()
                .filter_map(|id| self.jobs.get(id).cloned())
                .collect(),
        };
        let contents = serde_json::to_string_pretty(&snapshot)?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
