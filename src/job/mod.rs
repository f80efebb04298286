//! Job model and submission API
//!
//! A [`Job`] is one unit of work. Its [`JobPayload`] is tagged by mode, so
//! the session fields (`crawlId`, depth bounds, limit) exist exactly for the
//! modes that use them.

mod submit;
mod types;

pub use submit::{JobStatus, Submission, Submitter};
pub use types::{Job, JobMode, JobOutput, JobPayload, JobRecord, Skipped};
