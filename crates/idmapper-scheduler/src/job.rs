//! Job contract.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// A unit of work run on every tick of its timer.
///
/// The runner awaits `run` before it looks at the timer again, so one job
/// never runs concurrently with itself.
#[async_trait]
pub trait Job: Send + Sync {
    /// Runs the job once.
    async fn run(&self);

    /// Returns a name used in logs.
    fn name(&self) -> &str {
        "job"
    }
}

#[async_trait]
impl<J: Job + ?Sized> Job for Arc<J> {
    async fn run(&self) {
        (**self).run().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Adapter to use an ordinary async closure as a [`Job`].
///
/// ```
/// use idmapper_scheduler::{Job, JobFn};
///
/// let job = JobFn::named("heartbeat", || async {
///     tracing::debug!("still here");
/// });
/// assert_eq!(job.name(), "heartbeat");
/// ```
pub struct JobFn<F> {
    name: String,
    func: F,
}

impl<F> JobFn<F> {
    /// Wraps `func` under the default name.
    pub fn new(func: F) -> Self {
        Self::named("job", func)
    }

    /// Wraps `func` under `name`.
    pub fn named(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F, Fut> Job for JobFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn run(&self) {
        (self.func)().await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
