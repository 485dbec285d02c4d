//! Rate-limited task executor
//!
//! This module handles:
//! - FIFO queue management for submitted tasks
//! - Fixed-rate dispatch (at most one task per tick)
//! - An admission check that pauses dispatch without dropping tasks
//! - Per-task skip checks evaluated at dispatch time
//!
//! The executor knows nothing about URLs. Tasks receive a `&mut C` context
//! when they run, so the owner of `C` keeps exclusive control of its state
//! while the executor only decides *when* each task runs.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Work run by the executor against its context
pub type TaskFn<C> = Box<dyn FnOnce(&mut C) + Send>;

/// Dispatch-time check; returning true drops the task unrun
pub type SkipFn<C> = Box<dyn FnOnce(&mut C) -> bool + Send>;

/// Admission check gating every tick
pub type AdmissionFn<C> = Box<dyn Fn(&C) -> bool + Send>;

/// A queued unit of work with an optional skip check
pub struct QueueTask<C> {
    run: TaskFn<C>,
    should_skip: Option<SkipFn<C>>,
}

impl<C> QueueTask<C> {
    /// Creates a task that always runs when dispatched
    pub fn new(run: impl FnOnce(&mut C) + Send + 'static) -> Self {
        Self {
            run: Box::new(run),
            should_skip: None,
        }
    }

    /// Attaches a check evaluated when the task reaches the head of the queue
    pub fn skip_if(mut self, should_skip: impl FnOnce(&mut C) -> bool + Send + 'static) -> Self {
        self.should_skip = Some(Box::new(should_skip));
        self
    }
}

impl<C> fmt::Debug for QueueTask<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueTask")
            .field("has_skip_check", &self.should_skip.is_some())
            .finish()
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// A task was run
    pub dispatched: bool,

    /// Tasks consumed without running because their skip check held
    pub skipped: usize,

    /// The admission check refused dispatch
    pub blocked: bool,
}

/// Fixed-rate task executor
///
/// Each tick dispatches at most one task. Tasks whose skip check holds are
/// consumed immediately within the same tick so stale entries never cost a
/// full interval. When the admission check fails or the queue is empty the
/// tick does nothing and the next one fires after the same interval.
pub struct Executor<C> {
    queue: VecDeque<QueueTask<C>>,
    period: Duration,
    should_proceed: AdmissionFn<C>,
    ticker: Option<Interval>,
    stopped: bool,
}

impl<C> Executor<C> {
    /// Creates a stopped executor dispatching at most `max_rate_per_second`
    /// tasks per second
    pub fn new(max_rate_per_second: u32) -> Self {
        let rate = u64::from(max_rate_per_second.max(1));
        Self {
            queue: VecDeque::new(),
            period: Duration::from_micros((1_000_000 / rate).max(1)),
            should_proceed: Box::new(|_: &C| true),
            ticker: None,
            stopped: false,
        }
    }

    /// Sets the admission check consulted before every dispatch
    pub fn with_admission(mut self, should_proceed: impl Fn(&C) -> bool + Send + 'static) -> Self {
        self.should_proceed = Box::new(should_proceed);
        self
    }

    /// Appends a task to the end of the queue
    ///
    /// Nothing runs until a later tick.
    pub fn submit(&mut self, task: QueueTask<C>) {
        self.queue.push_back(task);
    }

    /// Starts the tick timer; the first tick fires immediately
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
        self.stopped = false;
        tracing::debug!("Executor started with {:?} between dispatches", self.period);
    }

    /// Stops dispatching and drops the tick timer
    ///
    /// Tasks already dispatched are unaffected; queued tasks stay queued.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.ticker = None;
        tracing::debug!("Executor stopped with {} tasks queued", self.queue.len());
    }

    /// Returns true between `start` and `stop`
    pub fn is_running(&self) -> bool {
        self.ticker.is_some() && !self.stopped
    }

    /// Number of tasks waiting in the queue
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Minimum time between two dispatches
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Waits for the next tick
    ///
    /// Never resolves while the executor is stopped, which makes it safe to
    /// use as a `tokio::select!` branch. Cancel safe.
    pub async fn next_tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) if !self.stopped => {
                ticker.tick().await;
            }
            _ => std::future::pending::<()>().await,
        }
    }

    /// Runs one tick against `ctx`
    pub fn tick(&mut self, ctx: &mut C) -> TickReport {
        let mut report = TickReport::default();
        if self.stopped {
            return report;
        }

        loop {
            if !(self.should_proceed)(ctx) {
                report.blocked = true;
                break;
            }

            let task = match self.queue.pop_front() {
                Some(task) => task,
                None => break,
            };

            let skip = match task.should_skip {
                Some(should_skip) => should_skip(ctx),
                None => false,
            };

            if skip {
                report.skipped += 1;
                continue;
            }

            (task.run)(ctx);
            report.dispatched = true;
            break;
        }

        tracing::trace!(
            "Tick: dispatched={} skipped={} blocked={} queued={}",
            report.dispatched,
            report.skipped,
            report.blocked,
            self.queue.len()
        );
        report
    }
}

impl<C> fmt::Debug for Executor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("queued", &self.queue.len())
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}
