mod controller;
mod escrow;
mod job;

pub use controller::Lifecycle;
pub use escrow::{Escrow, Payout};
pub use job::{
    AccountId, Job, JobStatus, ResultDigest, SubmittedResult, TimelineKind, TimelineRecord,
};
