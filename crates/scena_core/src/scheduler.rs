//! Main-thread task scheduler
//!
//! Funnels work raised on arbitrary threads onto the owner thread:
//!
//! - posted from the owner thread: runs in place before `post` returns
//! - posted from any other thread: queued on the owner run loop, FIFO per
//!   source thread
//! - no run loop available: handed to the fallback pool, never run inline
//!
//! Tasks are fire-and-forget. Whether a task's captured objects are still
//! alive when it runs is the task's own business.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use crate::config::SchedulerConfig;
use crate::runner::{run_guarded, MainEventRunner, Task};

static FALLBACK_POOL: OnceLock<FallbackPool> = OnceLock::new();

/// How a posted task was dispatched
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Ran synchronously on the calling (owner) thread
    Inline,
    /// Queued on the owner thread's run loop
    Queued,
    /// Handed to the fallback pool
    Fallback,
}

/// Counters for dispatched tasks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub inline: u64,
    pub queued: u64,
    pub fallback: u64,
}

/// Generic pool for tasks that have no owner thread to go to
pub struct FallbackPool {
    runtime: Option<Runtime>,
}

impl FallbackPool {
    /// The shared pool, created on first use with `workers` blocking threads
    ///
    /// Only the first call's worker count takes effect.
    pub fn init(workers: usize) -> &'static FallbackPool {
        FALLBACK_POOL.get_or_init(|| {
            let runtime = Builder::new_multi_thread()
                .worker_threads(1)
                .max_blocking_threads(workers.max(1))
                .thread_name("scena-fallback")
                .enable_time()
                .build();
            match runtime {
                Ok(runtime) => FallbackPool {
                    runtime: Some(runtime),
                },
                Err(e) => {
                    tracing::error!("failed to build fallback pool, using one-shot threads: {e}");
                    FallbackPool { runtime: None }
                }
            }
        })
    }

    /// The shared pool with default sizing
    pub fn shared() -> &'static FallbackPool {
        Self::init(SchedulerConfig::default().fallback_workers)
    }

    /// Run `task` on a pool thread after `delay`
    ///
    /// The delay is a timer on the pool's runtime; no thread is held while
    /// it elapses.
    pub fn spawn(&self, task: Task, name: String, delay: Duration) {
        let job = move || run_guarded(task, &name, "fallback");
        match &self.runtime {
            Some(runtime) if delay.is_zero() => {
                runtime.spawn_blocking(job);
            }
            Some(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    tokio::task::spawn_blocking(job);
                });
            }
            None => {
                let spawned = thread::Builder::new()
                    .name("scena-fallback".to_string())
                    .spawn(move || {
                        thread::sleep(delay);
                        job();
                    });
                if let Err(e) = spawned {
                    tracing::error!("failed to spawn fallback thread, task dropped: {e}");
                }
            }
        }
    }
}

/// Posts tasks to the owner thread
pub struct MainThreadScheduler {
    runner: RwLock<Option<Arc<MainEventRunner>>>,
    /// Look up the process-wide main runner when none is bound
    follow_main: bool,
    pool: &'static FallbackPool,
    inline: AtomicU64,
    queued: AtomicU64,
    fallback: AtomicU64,
}

impl MainThreadScheduler {
    /// Scheduler bound to the process-wide main runner, resolved lazily
    pub fn new() -> Self {
        Self::build(None, true)
    }

    /// Scheduler bound to a specific runner
    pub fn with_runner(runner: Arc<MainEventRunner>) -> Self {
        Self::build(Some(runner), false)
    }

    /// Scheduler with no owner thread; every task goes to the fallback pool
    pub fn detached() -> Self {
        Self::build(None, false)
    }

    fn build(runner: Option<Arc<MainEventRunner>>, follow_main: bool) -> Self {
        Self {
            runner: RwLock::new(runner),
            follow_main,
            pool: FallbackPool::shared(),
            inline: AtomicU64::new(0),
            queued: AtomicU64::new(0),
            fallback: AtomicU64::new(0),
        }
    }

    /// Current owner-thread runner, if it is still accepting work
    pub fn event_runner(&self) -> Option<Arc<MainEventRunner>> {
        let bound = self
            .runner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(runner) = bound.filter(|r| r.is_running()) {
            return Some(runner);
        }
        if !self.follow_main {
            return None;
        }
        let main = MainEventRunner::main().filter(|r| r.is_running())?;
        *self.runner.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&main));
        Some(main)
    }

    /// Whether the caller is on the owner thread
    pub fn is_owner_thread(&self) -> bool {
        self.event_runner()
            .is_some_and(|runner| runner.is_current_runner_thread())
    }

    /// Post `task` with no delay
    pub fn post<F>(&self, task: F, trace_info: impl Into<String>) -> Dispatch
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_main_thread_task(task, trace_info, Duration::ZERO)
    }

    /// Post `task` to the owner thread
    ///
    /// A task posted from the owner thread with no delay runs before this
    /// returns. A delayed task is always queued.
    pub fn post_main_thread_task<F>(
        &self,
        task: F,
        trace_info: impl Into<String>,
        delay: Duration,
    ) -> Dispatch
    where
        F: FnOnce() + Send + 'static,
    {
        let trace_info = trace_info.into();
        let span_info = trace_info.clone();
        let task: Task = Box::new(move || {
            let _span = tracing::trace_span!("scb_callback", info = %span_info).entered();
            task();
        });

        let task = match self.event_runner() {
            Some(runner) if runner.is_current_runner_thread() && delay.is_zero() => {
                self.inline.fetch_add(1, Ordering::Relaxed);
                task();
                return Dispatch::Inline;
            }
            Some(runner) => match runner.try_post(task, &format!("wms:{trace_info}"), delay) {
                Ok(()) => {
                    self.queued.fetch_add(1, Ordering::Relaxed);
                    return Dispatch::Queued;
                }
                Err(task) => {
                    tracing::warn!(runner = runner.name(), task = %trace_info, "runner closed, using fallback pool");
                    task
                }
            },
            None => task,
        };

        tracing::debug!(task = %trace_info, "no event runner, posting to fallback pool");
        self.fallback.fetch_add(1, Ordering::Relaxed);
        self.pool.spawn(task, trace_info, delay);
        Dispatch::Fallback
    }

    /// Snapshot of dispatch counters
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            inline: self.inline.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            fallback: self.fallback.load(Ordering::Relaxed),
        }
    }
}

impl Default for MainThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Instant;

    #[test]
    fn test_owner_thread_post_runs_inline() {
        let runner = MainEventRunner::spawn("sched-inline").unwrap();
        let scheduler = Arc::new(MainThreadScheduler::with_runner(Arc::clone(&runner)));
        let (tx, rx) = mpsc::channel();

        let outer = Arc::clone(&scheduler);
        scheduler.post(
            move || {
                let ran = Arc::new(Mutex::new(false));
                let flag = Arc::clone(&ran);
                let dispatch = outer.post(move || *flag.lock().unwrap() = true, "inner");
                // Must have run before post returned
                let ran_before_return = *ran.lock().unwrap();
                tx.send((dispatch, ran_before_return)).unwrap();
            },
            "outer",
        );

        let (dispatch, ran_before_return) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(dispatch, Dispatch::Inline);
        assert!(ran_before_return);
    }

    #[test]
    fn test_detached_scheduler_uses_fallback_off_caller_thread() {
        let scheduler = MainThreadScheduler::detached();
        let (tx, rx) = mpsc::channel();
        let caller = thread::current().id();

        let dispatch = scheduler.post(move || tx.send(thread::current().id()).unwrap(), "detached");

        assert_eq!(dispatch, Dispatch::Fallback);
        let ran_on = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_ne!(ran_on, caller);
        assert_eq!(scheduler.stats().fallback, 1);
    }

    #[test]
    fn test_delayed_fallback_task_waits() {
        let scheduler = MainThreadScheduler::detached();
        let (tx, rx) = mpsc::channel();
        let delay = Duration::from_millis(50);
        let posted = Instant::now();

        let dispatch = scheduler.post_main_thread_task(
            move || tx.send(Instant::now()).unwrap(),
            "delayed-fallback",
            delay,
        );

        assert_eq!(dispatch, Dispatch::Fallback);
        let ran_at = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(ran_at.duration_since(posted) >= delay);
    }

    #[test]
    fn test_stopped_runner_falls_back() {
        let runner = MainEventRunner::spawn("sched-stopped").unwrap();
        let scheduler = MainThreadScheduler::with_runner(Arc::clone(&runner));
        runner.join();

        let (tx, rx) = mpsc::channel();
        let dispatch = scheduler.post(move || tx.send(()).unwrap(), "after-stop");

        assert_eq!(dispatch, Dispatch::Fallback);
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
}
