//! Scripting wrapper for a single scene session
//!
//! A `JsSceneSession` is owned by the scripting object it is wrapped into.
//! Platform listeners and queued tasks only ever hold a `Weak` to it, so a
//! task that outlives the wrapper finds it gone and does nothing.

use std::sync::{Arc, Weak};

use scena_core::{LivenessRegistry, PersistentId, SceneSessionEvent, WsError};
use scena_platform::{SceneSession, SessionEventPayload};
use scena_script::{
    convert_arg, CallbackInfo, JsEnv, JsFunction, JsObject, JsValue, NativeReference,
};
use smallvec::{smallvec, SmallVec};

use crate::callback_table::{CallbackTable, Registration};
use crate::error::{HarmonyError, Result};
use crate::scheduler::JsTaskScheduler;
use crate::utils::{
    create_js_session_info, create_js_session_rect, throw_invalid_param, unwrap_this,
};

/// Registry of live session wrappers
pub type SessionRegistry = LivenessRegistry<JsSceneSession>;

type CallbackArgs = SmallVec<[JsValue; 4]>;

/// Scripting-side view of a `SceneSession`
pub struct JsSceneSession {
    persistent_id: PersistentId,
    session: Weak<SceneSession>,
    scheduler: Arc<JsTaskScheduler>,
    registry: Arc<SessionRegistry>,
    callbacks: CallbackTable<SceneSessionEvent>,
    weak_self: Weak<JsSceneSession>,
}

impl JsSceneSession {
    /// Wrap `session` into a new scripting object
    ///
    /// Must run on the owner thread. The wrapper becomes the live wrapper for
    /// the session's persistent id.
    pub fn create(
        env: &JsEnv,
        session: &Arc<SceneSession>,
        scheduler: &Arc<JsTaskScheduler>,
        registry: &Arc<SessionRegistry>,
    ) -> Result<JsObject> {
        env.check_thread("JsSceneSession::create")?;
        let persistent_id = session.persistent_id();
        let wrapper = Arc::new_cyclic(|weak_self| JsSceneSession {
            persistent_id,
            session: Arc::downgrade(session),
            scheduler: Arc::clone(scheduler),
            registry: Arc::clone(registry),
            callbacks: CallbackTable::new(),
            weak_self: weak_self.clone(),
        });
        if registry.insert(persistent_id, &wrapper).is_some() {
            tracing::warn!(id = persistent_id, "replacing live session wrapper");
        }

        let object = JsObject::new();
        object.set_named_property("persistentId", persistent_id);
        object.set_named_property("sessionName", session.info().session_name());
        object.set_named_property("on", JsFunction::new("on", Self::register_callback));
        object.wrap(wrapper);
        tracing::debug!(id = persistent_id, "session wrapper created");
        Ok(object)
    }

    /// `on(type, callback)` entry point
    fn register_callback(env: &JsEnv, info: &CallbackInfo) -> JsValue {
        match unwrap_this::<JsSceneSession>(info) {
            Some(me) => me.on_register_callback(env, info),
            None => {
                tracing::error!("on() called without a session wrapper");
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
        let Some(event) = SceneSessionEvent::from_name(&name) else {
            tracing::warn!(id = self.persistent_id, %name, "unsupported callback type");
            return JsValue::Undefined;
        };

        if let Err(e) = self.register(env, event, callback) {
            tracing::error!(id = self.persistent_id, %event, "failed to register callback: {e}");
        }
        JsValue::Undefined
    }

    /// Store `callback` for `event`, wiring the platform listener on first use
    pub fn register(
        &self,
        env: &JsEnv,
        event: SceneSessionEvent,
        callback: &JsValue,
    ) -> Result<Registration> {
        let outcome = self.callbacks.register(env, event, callback)?;
        if let Registration::Stored {
            needs_wiring: true, ..
        } = outcome
        {
            self.process_register(event)?;
        }
        Ok(outcome)
    }

    /// Route platform `event`s from any thread to the owner thread
    fn process_register(&self, event: SceneSessionEvent) -> Result<()> {
        let session = self.session.upgrade().ok_or_else(|| {
            HarmonyError::Ws(WsError::Destroyed(format!("session {}", self.persistent_id)))
        })?;

        let weak = self.weak_self.clone();
        let scheduler = Arc::clone(&self.scheduler);
        let persistent_id = self.persistent_id;
        session.set_listener(
            event,
            Arc::new(move |payload: &SessionEventPayload| {
                let weak = weak.clone();
                let payload = payload.clone();
                scheduler.post(
                    move |env| Self::dispatch(env, &weak, persistent_id, payload),
                    format!("{event}:{persistent_id}"),
                );
            }),
        );
        tracing::debug!(id = self.persistent_id, %event, "platform listener wired");
        Ok(())
    }

    /// Owner-thread half of an event: re-validate, then call scripting code
    fn dispatch(
        env: &JsEnv,
        weak: &Weak<JsSceneSession>,
        persistent_id: PersistentId,
        payload: SessionEventPayload,
    ) {
        let event = payload.event();
        let Some(me) = weak.upgrade() else {
            tracing::warn!(id = persistent_id, %event, "session wrapper released, event dropped");
            return;
        };
        if !me.registry.is_registered(persistent_id, &me) {
            tracing::warn!(
                id = persistent_id,
                %event,
                "session wrapper no longer registered, event dropped"
            );
            return;
        }
        let Some(callback) = me.callbacks.get(event) else {
            tracing::warn!(id = persistent_id, %event, "no callback registered, event dropped");
            return;
        };

        let args = payload_args(&payload);
        call_js_callback(env, &callback, &args, Some(persistent_id), event.name());
    }

    /// Detach the wrapper: forget its registry entry and release callbacks
    pub fn finalize(&self) {
        self.registry
            .remove_instance(self.persistent_id, self as *const JsSceneSession);
        let released = self.callbacks.clear();
        tracing::debug!(id = self.persistent_id, released, "session wrapper finalized");
    }

    /// Finalize the wrapper owned by `object` and drop the object's hold on it
    pub fn finalizer(object: &JsObject) -> bool {
        let Some(native) = object.remove_wrap() else {
            return false;
        };
        match native.downcast::<JsSceneSession>() {
            Ok(wrapper) => {
                wrapper.finalize();
                true
            }
            Err(_) => {
                tracing::error!("object does not wrap a scene session");
                false
            }
        }
    }

    pub fn persistent_id(&self) -> PersistentId {
        self.persistent_id
    }

    /// The platform session, while it is still alive
    pub fn session(&self) -> Option<Arc<SceneSession>> {
        self.session.upgrade()
    }

    pub fn has_callback(&self, event: SceneSessionEvent) -> bool {
        self.callbacks.contains(event)
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }
}

impl Drop for JsSceneSession {
    fn drop(&mut self) {
        self.registry
            .remove_instance(self.persistent_id, self as *const JsSceneSession);
    }
}

/// Arguments passed to the scripting callback for `payload`
fn payload_args(payload: &SessionEventPayload) -> CallbackArgs {
    match payload {
        SessionEventPayload::PendingActivation(info) | SessionEventPayload::Terminate(info) => {
            smallvec![JsValue::Object(create_js_session_info(info, None))]
        }
        SessionEventPayload::StateChange(state) => smallvec![state.as_u32().into()],
        SessionEventPayload::SessionEvent(code) => smallvec![(*code).into()],
        SessionEventPayload::RectChange { rect, reason } => smallvec![
            JsValue::Object(create_js_session_rect(rect)),
            reason.as_u32().into()
        ],
        SessionEventPayload::RaiseToTop | SessionEventPayload::Click => SmallVec::new(),
        SessionEventPayload::BackPressed {
            need_move_to_background,
        } => smallvec![(*need_move_to_background).into()],
        SessionEventPayload::BufferAvailable(flag)
        | SessionEventPayload::FocusableChange(flag)
        | SessionEventPayload::TouchableChange(flag)
        | SessionEventPayload::NeedAvoid(flag)
        | SessionEventPayload::ShowWhenLocked(flag)
        | SessionEventPayload::LandscapeMultiWindow(flag)
        | SessionEventPayload::LayoutFullScreen(flag) => smallvec![(*flag).into()],
        SessionEventPayload::Exception { error_code, reason } => {
            let object = JsObject::new();
            object.set_named_property("errorCode", *error_code);
            object.set_named_property("reason", reason.as_str());
            smallvec![JsValue::Object(object)]
        }
        SessionEventPayload::LabelUpdate(label) => smallvec![label.as_str().into()],
        SessionEventPayload::RequestedOrientation(orientation) => smallvec![(*orientation).into()],
        SessionEventPayload::RaiseAboveTarget(target) => smallvec![(*target).into()],
        SessionEventPayload::KeyboardGravity(gravity) => smallvec![gravity.as_u32().into()],
    }
}

/// Call a stored callback with `undefined` as receiver, logging failures
pub(crate) fn call_js_callback(
    env: &JsEnv,
    callback: &NativeReference,
    args: &[JsValue],
    persistent_id: Option<PersistentId>,
    event: &str,
) {
    let result = callback
        .value(env)
        .and_then(|func| env.call_function(&JsValue::Undefined, func, args));
    match result {
        Ok(_) => tracing::trace!(id = ?persistent_id, event, "callback delivered"),
        Err(e) => tracing::error!(id = ?persistent_id, event, "callback failed: {e}"),
    }
}
