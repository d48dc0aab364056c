//! Scripting wrapper for the session manager
//!
//! Manager events carry sessions by strong handle on the platform side; the
//! queued task only keeps `Weak`s and builds the session wrappers once it is
//! on the owner thread.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use rustc_hash::FxHashMap;
use scena_core::{ManagerEvent, PersistentId};
use scena_platform::{ManagerEventPayload, SceneSession, SceneSessionManager};
use scena_script::{convert_arg, CallbackInfo, JsEnv, JsObject, JsValue};
use smallvec::{smallvec, SmallVec};

use crate::callback_table::{CallbackTable, Registration};
use crate::error::Result;
use crate::scheduler::JsTaskScheduler;
use crate::session::{call_js_callback, JsSceneSession, SessionRegistry};
use crate::utils::{throw_invalid_param, unwrap_this};

/// Manager event data that can cross to the owner thread
#[derive(Debug)]
enum QueuedEvent {
    Sessions(SmallVec<[Weak<SceneSession>; 2]>),
    Flag(bool),
    Code(u32),
    Id(PersistentId),
    Point { x: i32, y: i32 },
    Empty,
}

impl From<&ManagerEventPayload> for QueuedEvent {
    fn from(payload: &ManagerEventPayload) -> Self {
        match payload {
            ManagerEventPayload::CreateSpecificSession(session)
            | ManagerEventPayload::RecoverSceneSession(session) => {
                QueuedEvent::Sessions(smallvec![Arc::downgrade(session)])
            }
            ManagerEventPayload::CreateKeyboardSession { keyboard, panel } => {
                QueuedEvent::Sessions(smallvec![Arc::downgrade(keyboard), Arc::downgrade(panel)])
            }
            ManagerEventPayload::OutsideDownEvent { x, y } => QueuedEvent::Point { x: *x, y: *y },
            ManagerEventPayload::GestureNavigationEnabledChange(flag)
            | ManagerEventPayload::StatusBarEnabledChange(flag) => QueuedEvent::Flag(*flag),
            ManagerEventPayload::ShiftFocus(id) => QueuedEvent::Id(*id),
            ManagerEventPayload::StartUiAbilityError(code)
            | ManagerEventPayload::CallingWindowIdChange(code) => QueuedEvent::Code(*code),
            ManagerEventPayload::SwitchToAnotherUser => QueuedEvent::Empty,
        }
    }
}

/// Scripting-side view of the `SceneSessionManager`
pub struct JsSceneSessionManager {
    env: JsEnv,
    manager: Arc<SceneSessionManager>,
    scheduler: Arc<JsTaskScheduler>,
    registry: Arc<SessionRegistry>,
    callbacks: CallbackTable<ManagerEvent>,
    session_objects: RwLock<FxHashMap<PersistentId, JsObject>>,
    weak_self: Weak<JsSceneSessionManager>,
}

impl JsSceneSessionManager {
    /// Bind `manager` to the scheduler's environment
    ///
    /// Session destruction is routed to the owner thread, where the session's
    /// wrapper is finalized.
    pub fn new(
        manager: Arc<SceneSessionManager>,
        scheduler: Arc<JsTaskScheduler>,
    ) -> Arc<Self> {
        let wrapper = Arc::new_cyclic(|weak_self| JsSceneSessionManager {
            env: scheduler.env().clone(),
            manager: Arc::clone(&manager),
            scheduler: Arc::clone(&scheduler),
            registry: Arc::new(SessionRegistry::new()),
            callbacks: CallbackTable::new(),
            session_objects: RwLock::new(FxHashMap::default()),
            weak_self: weak_self.clone(),
        });

        let weak = Arc::downgrade(&wrapper);
        manager.add_destroy_hook(Arc::new(move |persistent_id: PersistentId| {
            let weak = weak.clone();
            scheduler.post(
                move |env| match weak.upgrade() {
                    Some(me) => me.on_session_destroyed(env, persistent_id),
                    None => tracing::debug!(id = persistent_id, "manager wrapper released"),
                },
                format!("OnSessionDestroyed:{persistent_id}"),
            );
        }));
        wrapper
    }

    /// `on(type, callback)` entry point
    pub(crate) fn register_callback(env: &JsEnv, info: &CallbackInfo) -> JsValue {
        match unwrap_this::<JsSceneSessionManager>(info) {
            Some(me) => me.on_register_callback(env, info),
            None => {
                tracing::error!("on() called without a manager wrapper");
                JsValue::Undefined
            }
        }
    }

    /// Validate `on` arguments and register the callback
    pub fn on_register_callback(&self, env: &JsEnv, info: &CallbackInfo) -> JsValue {
        if info.argc() < 2 {
            tracing::error!(argc = info.argc(), "argc is invalid");
            return throw_invalid_param(env);
        }
        let Ok(name) = convert_arg::<String>(info, 0) else {
            tracing::error!("failed to convert callback type");
            return throw_invalid_param(env);
        };
        let callback = match info.arg(1) {
            Some(callback) if callback.is_callable() => callback,
            _ => {
                tracing::error!(%name, "callback is not callable");
                return throw_invalid_param(env);
            }
        };
        let Some(event) = ManagerEvent::from_name(&name) else {
            tracing::warn!(%name, "unsupported manager callback type");
            return JsValue::Undefined;
        };

        if let Err(e) = self.register(env, event, callback) {
            tracing::error!(%event, "failed to register manager callback: {e}");
        }
        JsValue::Undefined
    }

    /// Store `callback` for `event`, wiring the manager listener on first use
    pub fn register(
        &self,
        env: &JsEnv,
        event: ManagerEvent,
        callback: &JsValue,
    ) -> Result<Registration> {
        let outcome = self.callbacks.register(env, event, callback)?;
        if let Registration::Stored {
            needs_wiring: true, ..
        } = outcome
        {
            self.process_register(event);
        }
        Ok(outcome)
    }

    fn process_register(&self, event: ManagerEvent) {
        let weak = self.weak_self.clone();
        let scheduler = Arc::clone(&self.scheduler);
        self.manager.set_listener(
            event,
            Arc::new(move |payload: &ManagerEventPayload| {
                let weak = weak.clone();
                let queued = QueuedEvent::from(payload);
                let trace_info = match &queued {
                    QueuedEvent::Point { x, y } => format!("{event}:[{x}, {y}]"),
                    _ => event.to_string(),
                };
                scheduler.post(move |env| Self::dispatch(env, &weak, event, queued), trace_info);
            }),
        );
        tracing::debug!(%event, "manager listener wired");
    }

    fn dispatch(
        env: &JsEnv,
        weak: &Weak<JsSceneSessionManager>,
        event: ManagerEvent,
        queued: QueuedEvent,
    ) {
        let Some(me) = weak.upgrade() else {
            tracing::warn!(%event, "manager wrapper released, event dropped");
            return;
        };
        let Some(callback) = me.callbacks.get(event) else {
            tracing::warn!(%event, "no manager callback registered, event dropped");
            return;
        };

        let args: SmallVec<[JsValue; 4]> = match queued {
            QueuedEvent::Sessions(sessions) => {
                let mut args = SmallVec::new();
                for session in sessions {
                    let Some(session) = session.upgrade() else {
                        tracing::warn!(%event, "session released before delivery, event dropped");
                        return;
                    };
                    match me.create_session_object(env, &session) {
                        Ok(object) => args.push(JsValue::Object(object)),
                        Err(e) => {
                            tracing::error!(
                                id = session.persistent_id(),
                                %event,
                                "failed to create session object: {e}"
                            );
                            return;
                        }
                    }
                }
                args
            }
            QueuedEvent::Flag(flag) => smallvec![flag.into()],
            QueuedEvent::Code(code) => smallvec![code.into()],
            QueuedEvent::Id(id) => smallvec![id.into()],
            QueuedEvent::Point { x, y } => {
                let object = JsObject::new();
                object.set_named_property("x", x);
                object.set_named_property("y", y);
                smallvec![JsValue::Object(object)]
            }
            QueuedEvent::Empty => SmallVec::new(),
        };
        call_js_callback(env, &callback, &args, None, event.name());
    }

    /// Scripting object for `session`, created on first request
    ///
    /// Must run on the owner thread.
    pub fn create_session_object(
        &self,
        env: &JsEnv,
        session: &Arc<SceneSession>,
    ) -> Result<JsObject> {
        let persistent_id = session.persistent_id();
        if let Some(object) = self.session_object(persistent_id) {
            return Ok(object);
        }
        let object = JsSceneSession::create(env, session, &self.scheduler, &self.registry)?;
        self.session_objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(persistent_id, object.clone());
        Ok(object)
    }

    /// Existing scripting object for `persistent_id`
    pub fn session_object(&self, persistent_id: PersistentId) -> Option<JsObject> {
        self.session_objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&persistent_id)
            .cloned()
    }

    /// Drop the scripting object for a destroyed session and finalize its wrapper
    pub fn on_session_destroyed(&self, env: &JsEnv, persistent_id: PersistentId) {
        if let Err(e) = env.check_thread("JsSceneSessionManager::on_session_destroyed") {
            tracing::error!(id = persistent_id, "{e}");
            return;
        }
        let object = self
            .session_objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&persistent_id);
        match object {
            Some(object) => {
                JsSceneSession::finalizer(&object);
            }
            None => {
                tracing::debug!(id = persistent_id, "destroyed session had no scripting object")
            }
        }
        self.registry.prune();
    }

    pub fn env(&self) -> &JsEnv {
        &self.env
    }

    pub fn manager(&self) -> &Arc<SceneSessionManager> {
        &self.manager
    }

    pub fn scheduler(&self) -> &Arc<JsTaskScheduler> {
        &self.scheduler
    }

    /// Live session wrappers, shared by every session this manager exposes
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn has_callback(&self, event: ManagerEvent) -> bool {
        self.callbacks.contains(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scena_platform::SessionInfo;

    #[test]
    fn test_queued_event_drops_strong_session_handles() {
        let session = Arc::new(SceneSession::new(1, SessionInfo::new("b", "m", "a")));
        let payload = ManagerEventPayload::CreateSpecificSession(Arc::clone(&session));
        let queued = QueuedEvent::from(&payload);
        drop(payload);
        assert_eq!(Arc::strong_count(&session), 1);
        match queued {
            QueuedEvent::Sessions(weaks) => {
                assert_eq!(weaks.len(), 1);
                drop(session);
                assert!(weaks[0].upgrade().is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_outside_down_keeps_coordinates() {
        let queued = QueuedEvent::from(&ManagerEventPayload::OutsideDownEvent { x: 10, y: -4 });
        assert!(matches!(queued, QueuedEvent::Point { x: 10, y: -4 }));
    }
}
