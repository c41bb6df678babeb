//! # idmapper scheduler
//!
//! Runs jobs on independent periodic timers.
//!
//! Jobs are registered while the scheduler is stopped. Once started, each
//! job gets its own tokio task and timer, first firing one interval after
//! `start`. A job that runs longer than its interval never overlaps with
//! itself; the missed tick policy decides what happens to the ticks that
//! fell due meanwhile (see [`MissedTicks`]).

pub mod error;
pub mod job;
pub mod scheduler;

// Re-exports
pub use error::SchedulerError;
pub use job::{Job, JobFn};
pub use scheduler::{MissedTicks, Scheduler};
