//! State module for tracking job progress
//!
//! A job moves `pending -> active` when a worker claims it and
//! `active -> completed | failed` exactly once.

mod job_state;

pub use job_state::JobState;
