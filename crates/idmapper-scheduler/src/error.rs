//! Error types for the scheduler crate.

use thiserror::Error;

/// Errors that can occur when registering jobs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// Jobs cannot be added between `start` and `stop`.
    #[error("unable to add job to scheduler: scheduler is already running")]
    AlreadyRunning,

    /// Periodic timers need a non-zero period.
    #[error("unable to add job '{name}' to scheduler: interval must be greater than zero")]
    InvalidInterval { name: String },
}
