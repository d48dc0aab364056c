//! Synthetic event traffic against a live owner thread
//!
//! Sessions are exposed to scripting code with counting callbacks, then
//! platform events are raised from worker threads while some wrappers are
//! finalized. Every raised event is either delivered or dropped by the
//! liveness checks; the summary reports both.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use scena_core::{FallbackPool, MainEventRunner, MainThreadScheduler, SchedulerConfig};
use scena_harmony::{export_scene_session_manager, JsSceneSession, JsTaskScheduler};
use scena_platform::{
    SceneSession, SceneSessionManager, SessionInfo, SessionState, SizeChangeReason, WsRect,
};
use scena_script::{JsEnv, JsFunction, JsObject, JsValue};
use serde::Serialize;

use crate::config::SimulateConfig;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Callback names each simulated session subscribes to
const SUBSCRIBED: [&str; 2] = ["sessionRectChange", "sessionStateChange"];

/// Outcome of a simulation run
#[derive(Debug, Serialize)]
pub struct Summary {
    pub sessions: usize,
    pub threads: usize,
    /// Wrappers finalized while events were in flight
    pub finalized: usize,
    /// Events that found a platform listener
    pub raised: usize,
    /// Events that reached a scripting callback
    pub delivered: usize,
    /// Events discarded because their wrapper was gone
    pub dropped: usize,
    pub scheduler: DispatchCounts,
    pub elapsed_ms: u128,
}

#[derive(Debug, Serialize)]
pub struct DispatchCounts {
    pub inline: u64,
    pub queued: u64,
    pub fallback: u64,
}

impl Summary {
    pub fn to_text(&self) -> String {
        format!(
            "sessions:  {}\nthreads:   {}\nfinalized: {}\nraised:    {}\ndelivered: {}\ndropped:   {}\ndispatch:  {} inline, {} queued, {} fallback\nelapsed:   {} ms",
            self.sessions,
            self.threads,
            self.finalized,
            self.raised,
            self.delivered,
            self.dropped,
            self.scheduler.inline,
            self.scheduler.queued,
            self.scheduler.fallback,
            self.elapsed_ms,
        )
    }
}

/// Run `f` on the owner thread and wait for its result
fn on_owner<R, F>(scheduler: &JsTaskScheduler, f: F) -> Result<R>
where
    R: Send + 'static,
    F: FnOnce(&JsEnv) -> R + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    scheduler.post(
        move |env| {
            let _ = tx.send(f(env));
        },
        "simulate",
    );
    rx.recv_timeout(DRAIN_TIMEOUT).context("owner thread did not answer")
}

fn counting_callback(hits: &Arc<AtomicUsize>) -> JsValue {
    let hits = Arc::clone(hits);
    JsValue::Function(JsFunction::new("count", move |_, _| {
        hits.fetch_add(1, Ordering::Relaxed);
        JsValue::Undefined
    }))
}

/// Expose `sessions` and subscribe each one to the counted events
fn expose_sessions(
    env: &JsEnv,
    manager: &scena_harmony::JsSceneSessionManager,
    sessions: &[Arc<SceneSession>],
    hits: &Arc<AtomicUsize>,
) -> scena_harmony::Result<Vec<JsObject>> {
    let mut objects = Vec::with_capacity(sessions.len());
    for session in sessions {
        let object = manager.create_session_object(env, session)?;
        let on = object.get_named_property("on").unwrap_or_default();
        for name in SUBSCRIBED {
            env.call_function(
                &JsValue::Object(object.clone()),
                &on,
                &[name.into(), counting_callback(hits)],
            )?;
        }
        objects.push(object);
    }
    Ok(objects)
}

/// Raise `events` alternating rect and state changes, round-robin over sessions
fn raise_events(sessions: &[Arc<SceneSession>], worker: usize, events: usize) -> usize {
    let mut raised = 0;
    for n in 0..events {
        let session = &sessions[(worker + n) % sessions.len()];
        let notified = if n % 2 == 0 {
            let offset = (n % 64) as i32;
            let rect = WsRect::new(offset, worker as i32, 320 + offset, 240);
            session.update_rect(rect, SizeChangeReason::Move)
        } else if session.state() == SessionState::Foreground {
            session.update_state(SessionState::Background)
        } else {
            session.update_state(SessionState::Foreground)
        };
        if notified {
            raised += 1;
        }
    }
    raised
}

pub fn run(config: &SchedulerConfig, options: &SimulateConfig) -> Result<Summary> {
    if options.sessions == 0 {
        anyhow::bail!("at least one session is required");
    }
    let started = Instant::now();

    FallbackPool::init(config.fallback_workers);
    let runner = MainEventRunner::spawn(config.runner_name.as_str())
        .context("Failed to start the owner-thread runner")?;
    let scheduler = Arc::new(JsTaskScheduler::new(
        JsEnv::new(runner.thread_id()),
        MainThreadScheduler::with_runner(Arc::clone(&runner)),
    ));
    let platform = Arc::new(SceneSessionManager::new());

    let sessions = (0..options.sessions)
        .map(|index| {
            platform.create_session(SessionInfo::new(
                "com.example.scena",
                "entry",
                format!("Ability{index}"),
            ))
        })
        .collect::<scena_platform::Result<Vec<_>>>()
        .context("Failed to create sessions")?;

    let hits = Arc::new(AtomicUsize::new(0));
    // The exports object owns the manager wrapper; keep it for the whole run.
    let (_exports, objects) = {
        let platform = Arc::clone(&platform);
        let export_scheduler = Arc::clone(&scheduler);
        let sessions = sessions.clone();
        let hits = Arc::clone(&hits);
        on_owner(&scheduler, move |env| -> scena_harmony::Result<_> {
            let (exports, manager) =
                export_scene_session_manager(env, platform, export_scheduler)?;
            let objects = expose_sessions(env, &manager, &sessions, &hits)?;
            Ok((exports, objects))
        })??
    };
    tracing::info!(sessions = objects.len(), "sessions exposed");

    let mut finalized = 0;
    let raised = thread::scope(|scope| {
        let workers: Vec<_> = (0..options.threads)
            .map(|worker| {
                let sessions = &sessions;
                let events = options.events;
                scope.spawn(move || raise_events(sessions, worker, events))
            })
            .collect();

        if options.destroy_every > 0 {
            let every = options.destroy_every;
            for object in objects.iter().skip(every - 1).step_by(every) {
                let object = object.clone();
                scheduler.post(
                    move |_| {
                        JsSceneSession::finalizer(&object);
                    },
                    "simulate:finalize",
                );
                finalized += 1;
            }
        }

        workers
            .into_iter()
            .map(|worker| worker.join().unwrap_or_default())
            .sum::<usize>()
    });

    if !runner.flush(DRAIN_TIMEOUT) {
        anyhow::bail!("owner thread did not drain within {DRAIN_TIMEOUT:?}");
    }
    runner.stop();

    let delivered = hits.load(Ordering::Relaxed);
    let stats = scheduler.stats();
    let summary = Summary {
        sessions: options.sessions,
        threads: options.threads,
        finalized,
        raised,
        delivered,
        dropped: raised.saturating_sub(delivered),
        scheduler: DispatchCounts {
            inline: stats.inline,
            queued: stats.queued,
            fallback: stats.fallback,
        },
        elapsed_ms: started.elapsed().as_millis(),
    };
    tracing::info!(
        raised = summary.raised,
        delivered = summary.delivered,
        dropped = summary.dropped,
        "simulation finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(
        sessions: usize,
        threads: usize,
        events: usize,
        destroy_every: usize,
    ) -> SimulateConfig {
        SimulateConfig {
            sessions,
            threads,
            events,
            destroy_every,
        }
    }

    fn scheduler_config(name: &str) -> SchedulerConfig {
        SchedulerConfig {
            runner_name: name.to_string(),
            ..SchedulerConfig::default()
        }
    }

    #[test]
    fn test_every_event_delivered_without_finalize() {
        let summary = run(&scheduler_config("sim-all"), &options(4, 3, 40, 0)).unwrap();
        assert_eq!(summary.finalized, 0);
        assert!(summary.raised > 0);
        assert_eq!(summary.delivered, summary.raised);
        assert_eq!(summary.dropped, 0);
    }

    #[test]
    fn test_finalized_sessions_account_for_every_event() {
        let summary = run(&scheduler_config("sim-finalize"), &options(4, 2, 60, 2)).unwrap();
        assert_eq!(summary.finalized, 2);
        assert_eq!(summary.delivered + summary.dropped, summary.raised);
        assert!(summary.scheduler.queued as usize >= summary.raised);
    }

    #[test]
    fn test_zero_sessions_is_rejected() {
        assert!(run(&scheduler_config("sim-empty"), &options(0, 1, 1, 0)).is_err());
    }

    #[test]
    fn test_summary_serializes() {
        let summary = run(&scheduler_config("sim-json"), &options(1, 1, 2, 0)).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["sessions"], 1);
        assert!(json["scheduler"]["queued"].is_u64());
        assert!(summary.to_text().contains("delivered:"));
    }
}
