//! Scripting wrapper for the root scene

use std::sync::{Arc, Weak};

use scena_core::{Dispatch, PersistentId, RootSceneEvent};
use scena_platform::SessionInfo;
use scena_script::{convert_arg, CallbackInfo, JsEnv, JsFunction, JsObject, JsValue};

use crate::callback_table::{CallbackTable, Registration};
use crate::error::Result;
use crate::manager::JsSceneSessionManager;
use crate::session::call_js_callback;
use crate::utils::{create_js_session_info, throw_invalid_param, unwrap_this};

/// Scripting-side view of the root scene
pub struct JsRootSceneSession {
    manager: Weak<JsSceneSessionManager>,
    callbacks: CallbackTable<RootSceneEvent>,
    weak_self: Weak<JsRootSceneSession>,
}

impl JsRootSceneSession {
    /// Build the root scene object; must run on the owner thread
    pub fn create(env: &JsEnv, manager: &Arc<JsSceneSessionManager>) -> Result<JsObject> {
        env.check_thread("JsRootSceneSession::create")?;
        let wrapper = Arc::new_cyclic(|weak_self| JsRootSceneSession {
            manager: Arc::downgrade(manager),
            callbacks: CallbackTable::new(),
            weak_self: weak_self.clone(),
        });

        let object = JsObject::new();
        object.set_named_property("on", JsFunction::new("on", Self::register_callback));
        object.wrap(wrapper);
        Ok(object)
    }

    fn register_callback(env: &JsEnv, info: &CallbackInfo) -> JsValue {
        match unwrap_this::<JsRootSceneSession>(info) {
            Some(me) => me.on_register_callback(env, info),
            None => {
                tracing::error!("on() called without a root scene wrapper");
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
        let Some(event) = RootSceneEvent::from_name(&name) else {
            tracing::warn!(%name, "unsupported root scene callback type");
            return JsValue::Undefined;
        };

        match self.callbacks.register(env, event, callback) {
            Ok(Registration::Stored {
                needs_wiring: true, ..
            }) => tracing::debug!(%event, "root scene listener wired"),
            Ok(_) => {}
            Err(e) => tracing::error!(%event, "failed to register root scene callback: {e}"),
        }
        JsValue::Undefined
    }

    /// Ask scripting code to activate a session; callable from any thread
    ///
    /// When `persistent_id` names a live session it is reused, otherwise a
    /// new session is created for `info`. Returns `None` when nothing is
    /// listening for activations.
    pub fn pending_session_activation(
        &self,
        info: SessionInfo,
        persistent_id: Option<PersistentId>,
    ) -> Option<Dispatch> {
        let event = RootSceneEvent::PendingSceneSessionActivation;
        if !self.callbacks.is_wired(event) {
            tracing::debug!(%event, "no activation listener");
            return None;
        }
        let manager = self.manager.upgrade()?;
        let weak = self.weak_self.clone();
        let trace_info = format!("{event}:{}", info.ability_name);
        let dispatch = manager.scheduler().post(
            move |env| Self::dispatch(env, &weak, info, persistent_id),
            trace_info,
        );
        Some(dispatch)
    }

    fn dispatch(
        env: &JsEnv,
        weak: &Weak<JsRootSceneSession>,
        info: SessionInfo,
        persistent_id: Option<PersistentId>,
    ) {
        let event = RootSceneEvent::PendingSceneSessionActivation;
        let Some(me) = weak.upgrade() else {
            tracing::warn!(%event, "root scene wrapper released, activation dropped");
            return;
        };
        let Some(callback) = me.callbacks.get(event) else {
            tracing::warn!(%event, "no callback registered, activation dropped");
            return;
        };
        let Some(manager) = me.manager.upgrade() else {
            tracing::warn!(%event, "manager wrapper released, activation dropped");
            return;
        };

        let existing = persistent_id.and_then(|id| manager.manager().get_session(id));
        let session = match existing {
            Some(session) => session,
            None => match manager.manager().create_session(info) {
                Ok(session) => session,
                Err(e) => {
                    tracing::error!(%event, "failed to create session: {e}");
                    return;
                }
            },
        };
        if let Err(e) = manager.create_session_object(env, &session) {
            tracing::error!(id = session.persistent_id(), "failed to create session object: {e}");
            return;
        }

        let id = session.persistent_id();
        let info_object = create_js_session_info(session.info(), Some(id));
        call_js_callback(
            env,
            &callback,
            &[JsValue::Object(info_object)],
            Some(id),
            event.name(),
        );
    }
}
