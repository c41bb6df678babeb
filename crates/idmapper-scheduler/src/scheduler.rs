//! Periodic job scheduler.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::error::SchedulerError;
use crate::job::{Job, JobFn};

/// Deadline used when `now + period` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// What a job's timer does with ticks that fall due while the job is still
/// running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissedTicks {
    /// One overdue tick fires as soon as the running invocation returns;
    /// the timer then realigns to the interval grid and drops the rest.
    #[default]
    Skip,
    /// One overdue tick fires as soon as possible and the schedule shifts to
    /// start counting from it.
    Delay,
    /// Every missed tick fires, back to back, until the timer catches up.
    Burst,
}

impl From<MissedTicks> for MissedTickBehavior {
    fn from(value: MissedTicks) -> Self {
        match value {
            MissedTicks::Skip => MissedTickBehavior::Skip,
            MissedTicks::Delay => MissedTickBehavior::Delay,
            MissedTicks::Burst => MissedTickBehavior::Burst,
        }
    }
}

struct Entry {
    job: Arc<dyn Job>,
    interval: Duration,
}

/// A started job: its private stop signal and its task.
struct Runner {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Inner {
    jobs: Vec<Entry>,
    /// `Some` while running.
    runners: Option<Vec<Runner>>,
}

/// Runs registered jobs, each on its own periodic timer.
///
/// Jobs can only be added while the scheduler is stopped. `start` spawns one
/// tokio task per job whose first tick fires one interval later; `stop`
/// signals every task to finish. Both are idempotent, and concurrent calls
/// are serialized so there is exactly one activation and one deactivation.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use idmapper_scheduler::Scheduler;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), idmapper_scheduler::SchedulerError> {
/// let scheduler = Scheduler::new();
/// scheduler.add_fn(|| async { /* reload something */ }, Duration::from_secs(60))?;
///
/// scheduler.start();
/// assert!(scheduler.is_running());
///
/// scheduler.shutdown().await;
/// assert!(!scheduler.is_running());
/// # Ok(())
/// # }
/// ```
pub struct Scheduler {
    inner: Mutex<Inner>,
    missed_ticks: MissedTicks,
}

impl Scheduler {
    /// Creates an empty, stopped scheduler.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            missed_ticks: MissedTicks::default(),
        }
    }

    /// Sets the missed tick policy applied to timers started afterwards.
    pub fn with_missed_ticks(mut self, missed_ticks: MissedTicks) -> Self {
        self.missed_ticks = missed_ticks;
        self
    }

    /// Registers `job` to run every `interval` once started.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::AlreadyRunning` if called between `start` and `stop`
    /// - `SchedulerError::InvalidInterval` if `interval` is zero
    pub fn add(&self, job: impl Job + 'static, interval: Duration) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock();

        if inner.runners.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        if interval.is_zero() {
            return Err(SchedulerError::InvalidInterval {
                name: job.name().to_string(),
            });
        }

        debug!(job = job.name(), ?interval, "Job registered");
        inner.jobs.push(Entry {
            job: Arc::new(job),
            interval,
        });

        Ok(())
    }

    /// Registers an async closure. See [`Scheduler::add`].
    pub fn add_fn<F, Fut>(&self, func: F, interval: Duration) -> Result<(), SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.add(JobFn::new(func), interval)
    }

    /// Starts one timer per registered job. No-op if already running.
    ///
    /// Must be called from within a tokio runtime; outside of one the call
    /// is logged and ignored.
    pub fn start(&self) {
        let mut inner = self.inner.lock();

        if inner.runners.is_some() {
            debug!("Scheduler already running");
            return;
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!("Cannot start scheduler outside of a tokio runtime: {}", e);
                return;
            },
        };

        let runners = inner
            .jobs
            .iter()
            .map(|entry| {
                let (stop_tx, stop_rx) = watch::channel(false);
                let task = handle.spawn(run_job(
                    Arc::clone(&entry.job),
                    entry.interval,
                    self.missed_ticks.into(),
                    stop_rx,
                ));
                Runner { stop_tx, task }
            })
            .collect::<Vec<_>>();

        info!(jobs = runners.len(), "Scheduler started");
        inner.runners = Some(runners);
    }

    /// Signals every job to stop. No-op if not running.
    ///
    /// Does not wait: an invocation already in progress finishes, and no
    /// tick fires after it.
    pub fn stop(&self) {
        self.halt();
    }

    /// Stops the scheduler and waits for every job task to finish.
    pub async fn shutdown(&self) {
        for task in self.halt() {
            if let Err(e) = task.await {
                warn!("Job task ended abnormally: {}", e);
            }
        }
    }

    fn halt(&self) -> Vec<JoinHandle<()>> {
        let Some(runners) = self.inner.lock().runners.take() else {
            debug!("Scheduler not running");
            return Vec::new();
        };

        info!(jobs = runners.len(), "Scheduler stopping");

        runners
            .into_iter()
            .map(|runner| {
                runner.stop_tx.send_replace(true);
                runner.task
            })
            .collect()
    }

    /// Returns true between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.inner.lock().runners.is_some()
    }

    /// Number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.inner.lock().jobs.len()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.halt();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Scheduler")
            .field("jobs", &inner.jobs.len())
            .field("running", &inner.runners.is_some())
            .field("missed_ticks", &self.missed_ticks)
            .finish()
    }
}

/// Timer loop of one job.
async fn run_job(
    job: Arc<dyn Job>,
    period: Duration,
    missed: MissedTickBehavior,
    mut stop_rx: watch::Receiver<bool>,
) {
    let now = Instant::now();
    let first = now.checked_add(period).unwrap_or_else(|| now + FAR_FUTURE);
    let mut ticker = interval_at(first, period);
    ticker.set_missed_tick_behavior(missed);

    debug!(job = job.name(), ?period, "Job timer started");

    loop {
        tokio::select! {
            biased;

            result = stop_rx.changed() => {
                if result.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                job.run().await;
            }
        }
    }

    debug!(job = job.name(), "Job timer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::sleep;

    #[derive(Default)]
    struct CountingJob {
        calls: AtomicU32,
    }

    impl CountingJob {
        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Job for CountingJob {
        async fn run(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn counter_fn(counter: &Arc<AtomicU32>) -> impl Fn() -> std::future::Ready<()> + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_job() {
        let job = Arc::new(CountingJob::default());
        let scheduler = Scheduler::new();
        scheduler.add(Arc::clone(&job), Duration::from_secs(1)).unwrap();

        scheduler.start();
        sleep(Duration::from_millis(2500)).await;
        scheduler.stop();

        assert_eq!(job.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_fn() {
        let counter = Arc::new(AtomicU32::new(0));
        let scheduler = Scheduler::new();
        scheduler
            .add_fn(counter_fn(&counter), Duration::from_millis(100))
            .unwrap();

        scheduler.start();
        sleep(Duration::from_millis(350)).await;
        scheduler.stop();

        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_before_start() {
        let counter = Arc::new(AtomicU32::new(0));
        let scheduler = Scheduler::new();
        scheduler
            .add_fn(counter_fn(&counter), Duration::from_millis(100))
            .unwrap();

        sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_running() {
        let counter1 = Arc::new(AtomicU32::new(0));
        let counter2 = Arc::new(AtomicU32::new(0));

        let scheduler = Arc::new(Scheduler::new());
        scheduler
            .add_fn(counter_fn(&counter1), Duration::from_millis(100))
            .unwrap();

        // start scheduler multiple times, only one instance of each job should be launched
        let mut starts = vec![];
        for _ in 0..3 {
            let scheduler = Arc::clone(&scheduler);
            starts.push(tokio::spawn(async move { scheduler.start() }));
        }
        for start in starts {
            start.await.unwrap();
        }

        sleep(Duration::from_millis(100)).await;

        let err = scheduler
            .add_fn(counter_fn(&counter2), Duration::from_millis(100))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to add job to scheduler: scheduler is already running"
        );
        assert_eq!(scheduler.job_count(), 1);

        sleep(Duration::from_millis(250)).await;

        // stop scheduler multiple times, only first stop() will stop jobs
        scheduler.stop();
        scheduler.stop();
        scheduler.stop();

        assert_eq!(counter1.load(Ordering::SeqCst), 3);
        assert_eq!(counter2.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiple_jobs() {
        let jobs = [
            (Arc::new(CountingJob::default()), 100, 19),
            (Arc::new(CountingJob::default()), 200, 9),
            (Arc::new(CountingJob::default()), 500, 3),
            (Arc::new(CountingJob::default()), 1000, 1),
            (Arc::new(CountingJob::default()), 2000, 0),
            (Arc::new(CountingJob::default()), 5000, 0),
        ];

        let scheduler = Scheduler::new();
        for (job, millis, _) in &jobs {
            scheduler
                .add(Arc::clone(job), Duration::from_millis(*millis))
                .unwrap();
        }

        scheduler.start();
        sleep(Duration::from_millis(1950)).await;
        scheduler.stop();

        for (job, millis, expected) in &jobs {
            assert_eq!(job.calls(), *expected, "job with interval {}ms", millis);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_timers() {
        let fast = Arc::new(CountingJob::default());
        let slow = Arc::new(CountingJob::default());

        let scheduler = Scheduler::new();
        scheduler.add(Arc::clone(&fast), Duration::from_millis(100)).unwrap();
        scheduler.add(Arc::clone(&slow), Duration::from_millis(300)).unwrap();

        scheduler.start();
        sleep(Duration::from_millis(1000)).await;
        scheduler.stop();

        assert!((9..=10).contains(&fast.calls()), "fast ran {}", fast.calls());
        assert_eq!(slow.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_stop() {
        let job = Arc::new(CountingJob::default());
        let scheduler = Scheduler::new();
        scheduler.add(Arc::clone(&job), Duration::from_millis(100)).unwrap();

        scheduler.start();
        sleep(Duration::from_millis(350)).await;
        scheduler.shutdown().await;
        assert!(!scheduler.is_running());

        sleep(Duration::from_secs(2)).await;
        assert_eq!(job.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop_keeps_jobs() {
        let first = Arc::new(CountingJob::default());
        let second = Arc::new(CountingJob::default());

        let scheduler = Scheduler::new();
        scheduler.add(Arc::clone(&first), Duration::from_millis(100)).unwrap();

        scheduler.start();
        sleep(Duration::from_millis(250)).await;
        scheduler.stop();
        assert_eq!(first.calls(), 2);

        // adding is allowed again once stopped
        scheduler.add(Arc::clone(&second), Duration::from_millis(100)).unwrap();
        assert_eq!(scheduler.job_count(), 2);

        sleep(Duration::from_millis(500)).await;

        // timers restart from the new start time
        scheduler.start();
        sleep(Duration::from_millis(150)).await;
        scheduler.stop();

        assert_eq!(first.calls(), 3);
        assert_eq!(second.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_progress_tick_completes_after_stop() {
        let started = Arc::new(AtomicU32::new(0));
        let finished = Arc::new(AtomicU32::new(0));

        let (s, f) = (Arc::clone(&started), Arc::clone(&finished));
        let scheduler = Scheduler::new();
        scheduler
            .add_fn(
                move || {
                    let (s, f) = (Arc::clone(&s), Arc::clone(&f));
                    async move {
                        s.fetch_add(1, Ordering::SeqCst);
                        sleep(Duration::from_millis(200)).await;
                        f.fetch_add(1, Ordering::SeqCst);
                    }
                },
                Duration::from_millis(100),
            )
            .unwrap();

        scheduler.start();
        sleep(Duration::from_millis(150)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);

        scheduler.shutdown().await;

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_running_job_skips_missed_ticks() {
        let started = Arc::new(AtomicU32::new(0));
        let s = Arc::clone(&started);

        let scheduler = Scheduler::new();
        scheduler
            .add_fn(
                move || {
                    let s = Arc::clone(&s);
                    async move {
                        s.fetch_add(1, Ordering::SeqCst);
                        sleep(Duration::from_millis(250)).await;
                    }
                },
                Duration::from_millis(100),
            )
            .unwrap();

        scheduler.start();
        sleep(Duration::from_millis(980)).await;
        scheduler.stop();

        // runs start at 100, 350, 600 and 850ms: one overdue tick each time,
        // the other missed ones are dropped
        assert_eq!(started.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let scheduler = Scheduler::new();
        let err = scheduler.add(CountingJob::default(), Duration::ZERO).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::InvalidInterval {
                name: "counting".to_string()
            }
        );
        assert_eq!(scheduler.job_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_never_fires_and_stops_cleanly() {
        let scheduler = Scheduler::new();
        let job = Arc::new(CountingJob::default());
        scheduler.add(job.clone(), Duration::MAX).unwrap();

        scheduler.start();
        sleep(Duration::from_secs(3600)).await;
        assert_eq!(job.calls(), 0);

        let tasks = scheduler.halt();
        assert_eq!(tasks.len(), 1);
        for task in tasks {
            task.await.unwrap();
        }
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_start_outside_runtime_is_ignored() {
        let scheduler = Scheduler::new();
        scheduler.add(CountingJob::default(), Duration::from_secs(1)).unwrap();

        scheduler.start();
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_missed_ticks_mapping() {
        assert_eq!(
            MissedTickBehavior::from(MissedTicks::default()),
            MissedTickBehavior::Skip
        );
        assert_eq!(
            MissedTickBehavior::from(MissedTicks::Burst),
            MissedTickBehavior::Burst
        );
    }
}
