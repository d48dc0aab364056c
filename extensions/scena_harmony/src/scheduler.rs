//! Scripting-aware task scheduling
//!
//! Wraps [`MainThreadScheduler`] so every task runs inside a handle scope of
//! the environment it will call into.
//!
//! A task that lands off the environment's owner thread (the fallback pool)
//! does not touch scripting state there. It is handed back as a completion
//! and runs the next time the owner thread drains the environment.

use std::time::Duration;

use scena_core::{Dispatch, MainThreadScheduler, SchedulerStats};
use scena_script::JsEnv;

/// Posts environment-bound tasks to the environment's owner thread
pub struct JsTaskScheduler {
    env: JsEnv,
    scheduler: MainThreadScheduler,
}

impl JsTaskScheduler {
    pub fn new(env: JsEnv, scheduler: MainThreadScheduler) -> Self {
        Self { env, scheduler }
    }

    pub fn env(&self) -> &JsEnv {
        &self.env
    }

    pub fn inner(&self) -> &MainThreadScheduler {
        &self.scheduler
    }

    /// Post `task` with no delay
    pub fn post<F>(&self, task: F, trace_info: impl Into<String>) -> Dispatch
    where
        F: FnOnce(&JsEnv) + Send + 'static,
    {
        self.post_main_thread_task(task, trace_info, Duration::ZERO)
    }

    /// Post `task`, handing it the environment once it runs
    pub fn post_main_thread_task<F>(
        &self,
        task: F,
        trace_info: impl Into<String>,
        delay: Duration,
    ) -> Dispatch
    where
        F: FnOnce(&JsEnv) + Send + 'static,
    {
        let env = self.env.clone();
        let trace_info = trace_info.into();
        let task_name = trace_info.clone();
        self.scheduler.post_main_thread_task(
            move || {
                if env.is_owner_thread() {
                    // Completions handed back earlier go first.
                    let _ = env.run_completions();
                    run_in_scope(&env, task);
                } else {
                    tracing::debug!(task = %task_name, "handing task back to the owner thread");
                    env.queue_completion(Box::new(move |env: &JsEnv| run_in_scope(env, task)));
                }
            },
            trace_info,
            delay,
        )
    }

    /// Run completions handed back by the fallback pool
    ///
    /// Must be called on the environment's owner thread.
    pub fn drain_completions(&self) -> scena_script::Result<usize> {
        self.env.run_completions()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }
}

fn run_in_scope<F>(env: &JsEnv, task: F)
where
    F: FnOnce(&JsEnv),
{
    let _scope = env.open_handle_scope().ok();
    task(env);
}

#[cfg(test)]
mod tests {
    use super::*;
    use scena_core::MainEventRunner;
    use scena_script::{JsFunction, JsValue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_task_runs_inside_handle_scope() {
        let runner = MainEventRunner::spawn("js-sched-scope").unwrap();
        let env = JsEnv::new(runner.thread_id());
        let scheduler = JsTaskScheduler::new(env, MainThreadScheduler::with_runner(Arc::clone(&runner)));
        let (tx, rx) = mpsc::channel();

        let dispatch = scheduler.post(move |env| tx.send(env.handle_scope_depth()).unwrap(), "scope");

        assert_eq!(dispatch, Dispatch::Queued);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
        assert!(runner.flush(Duration::from_secs(5)));
        assert_eq!(scheduler.env().handle_scope_depth(), 0);
    }

    #[test]
    fn test_detached_scheduler_delivers_on_env_thread() {
        let env = JsEnv::for_current_thread();
        let scheduler = JsTaskScheduler::new(env.clone(), MainThreadScheduler::detached());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let callback = JsValue::Function(JsFunction::new("count", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            JsValue::Undefined
        }));
        let (tx, rx) = mpsc::channel();

        let dispatch = scheduler.post(
            move |env| {
                let called = env.call_function(&JsValue::Undefined, &callback, &[]);
                tx.send((thread::current().id(), env.handle_scope_depth(), called.is_ok()))
                    .unwrap();
            },
            "detached",
        );

        assert_eq!(dispatch, Dispatch::Fallback);
        assert!(env.wait_for_completion(Duration::from_secs(5)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.drain_completions().unwrap(), 1);

        let (ran_on, depth, called) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ran_on, thread::current().id());
        assert_eq!(depth, 1);
        assert!(called);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(env.pending_completions(), 0);
    }
}
