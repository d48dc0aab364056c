//! Owner-thread event runner
//!
//! A named thread that owns a FIFO task queue. Everything that touches the
//! scripting engine runs here. Delayed tasks are parked on the runner's timer
//! and run once their delay elapses.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{Result, WsError};

/// A unit of work posted across threads
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Process-wide main runner
static MAIN_RUNNER: RwLock<Option<Arc<MainEventRunner>>> = RwLock::new(None);

struct Envelope {
    task: Task,
    name: String,
    delay: Duration,
}

/// Owner thread with a FIFO event queue
pub struct MainEventRunner {
    name: String,
    thread_id: ThreadId,
    sender: Mutex<Option<UnboundedSender<Envelope>>>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MainEventRunner {
    /// Start a runner on a new thread named `name`
    pub fn spawn(name: impl Into<String>) -> Result<Arc<Self>> {
        let name = name.into();
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| WsError::Spawn(format!("{name}: {e}")))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));
        let loop_running = Arc::clone(&running);
        let loop_name = name.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_loop(runtime, receiver, loop_running, loop_name))
            .map_err(|e| WsError::Spawn(format!("{name}: {e}")))?;
        let thread_id = handle.thread().id();

        tracing::debug!(runner = %name, "event runner started");

        Ok(Arc::new(Self {
            name,
            thread_id,
            sender: Mutex::new(Some(sender)),
            running,
            handle: Mutex::new(Some(handle)),
        }))
    }

    /// Install `runner` as the process-wide main runner
    pub fn install_main(runner: Arc<Self>) -> Option<Arc<Self>> {
        MAIN_RUNNER
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(runner)
    }

    /// The process-wide main runner, if one is installed
    pub fn main() -> Option<Arc<Self>> {
        MAIN_RUNNER
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove the process-wide main runner
    pub fn clear_main() -> Option<Arc<Self>> {
        MAIN_RUNNER.write().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the owner thread
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Whether the caller is running on the owner thread
    pub fn is_current_runner_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Whether the runner still accepts tasks
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Queue `task` for the owner thread
    pub fn post_task<F>(&self, task: F, name: &str, delay: Duration) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.try_post(Box::new(task), name, delay)
            .map_err(|_| WsError::RunnerUnavailable(self.name.clone()))
    }

    /// Queue `task`, handing it back if the runner can no longer take it
    pub(crate) fn try_post(
        &self,
        task: Task,
        name: &str,
        delay: Duration,
    ) -> std::result::Result<(), Task> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref().filter(|_| self.is_running()) else {
            return Err(task);
        };
        let envelope = Envelope {
            task,
            name: name.to_string(),
            delay,
        };
        sender.send(envelope).map_err(|err| err.0.task)
    }

    /// Block until every task queued before this call has run
    ///
    /// Returns false if the runner stopped or `timeout` elapsed first. Calling
    /// from the owner thread returns immediately.
    pub fn flush(&self, timeout: Duration) -> bool {
        if self.is_current_runner_thread() {
            return true;
        }
        let (done_tx, done_rx) = std_mpsc::sync_channel(1);
        let posted = self.post_task(
            move || {
                let _ = done_tx.send(());
            },
            "flush",
            Duration::ZERO,
        );
        posted.is_ok() && done_rx.recv_timeout(timeout).is_ok()
    }

    /// Stop accepting tasks; already-queued undelayed tasks still run
    pub fn stop(&self) {
        // Dropping the sender closes the queue once it drains
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            tracing::debug!(runner = %self.name, "event runner stopping");
        }
        self.running.store(false, Ordering::Release);
    }

    /// Stop and wait for the owner thread to exit
    pub fn join(&self) {
        self.stop();
        if self.is_current_runner_thread() {
            return;
        }
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!(runner = %self.name, "event runner thread panicked");
            }
        }
    }
}

impl Drop for MainEventRunner {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_loop(
    runtime: Runtime,
    mut receiver: UnboundedReceiver<Envelope>,
    running: Arc<AtomicBool>,
    runner: String,
) {
    runtime.block_on(async {
        while let Some(envelope) = receiver.recv().await {
            if envelope.delay.is_zero() {
                run_guarded(envelope.task, &envelope.name, &runner);
                continue;
            }
            let runner = runner.clone();
            tokio::spawn(async move {
                tokio::time::sleep(envelope.delay).await;
                run_guarded(envelope.task, &envelope.name, &runner);
            });
        }
    });
    running.store(false, Ordering::Release);
    tracing::debug!(runner = %runner, "event runner exited");
}

/// Run a task, containing any panic so one bad task cannot take the queue down
pub(crate) fn run_guarded(task: Task, name: &str, runner: &str) {
    if catch_unwind(AssertUnwindSafe(task)).is_err() {
        tracing::error!(runner = %runner, task = %name, "task panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[test]
    fn test_tasks_run_on_runner_thread_in_order() {
        let runner = MainEventRunner::spawn("runner-order").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..50 {
            let seen = Arc::clone(&seen);
            let owner = runner.thread_id();
            runner
                .post_task(
                    move || {
                        assert_eq!(thread::current().id(), owner);
                        seen.lock().unwrap().push(i);
                    },
                    "order",
                    Duration::ZERO,
                )
                .unwrap();
        }

        assert!(runner.flush(Duration::from_secs(5)));
        assert_eq!(*seen.lock().unwrap(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_delayed_task_waits() {
        let runner = MainEventRunner::spawn("runner-delay").unwrap();
        let (tx, rx) = std_mpsc::channel();
        let posted_at = Instant::now();

        runner
            .post_task(
                move || tx.send(Instant::now()).unwrap(),
                "delayed",
                Duration::from_millis(50),
            )
            .unwrap();

        let ran_at = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(ran_at.duration_since(posted_at) >= Duration::from_millis(50));
    }

    #[test]
    fn test_panicking_task_does_not_kill_runner() {
        let runner = MainEventRunner::spawn("runner-panic").unwrap();
        let count = Arc::new(AtomicUsize::new(0));

        runner
            .post_task(|| panic!("boom"), "panics", Duration::ZERO)
            .unwrap();
        let after = Arc::clone(&count);
        runner
            .post_task(
                move || {
                    after.fetch_add(1, Ordering::SeqCst);
                },
                "after",
                Duration::ZERO,
            )
            .unwrap();

        assert!(runner.flush(Duration::from_secs(5)));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(runner.is_running());
    }

    #[test]
    fn test_stop_rejects_new_tasks() {
        let runner = MainEventRunner::spawn("runner-stop").unwrap();
        runner.join();

        assert!(!runner.is_running());
        let err = runner.post_task(|| {}, "late", Duration::ZERO).unwrap_err();
        assert!(matches!(err, WsError::RunnerUnavailable(_)));
        assert!(!runner.flush(Duration::from_millis(10)));
    }

    #[test]
    fn test_stop_drains_queued_tasks() {
        let runner = MainEventRunner::spawn("runner-drain").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let count = Arc::clone(&count);
            runner
                .post_task(
                    move || {
                        count.fetch_add(1, Ordering::SeqCst);
                    },
                    "queued",
                    Duration::ZERO,
                )
                .unwrap();
        }
        runner.join();
        assert_eq!(count.load(Ordering::SeqCst), 10);
    }
}
