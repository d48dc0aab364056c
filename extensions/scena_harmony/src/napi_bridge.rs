//! N-API style module export
//!
//! Builds the object a native module hands back from its init function.
//!
//! # ArkTS Usage
//!
//! ```typescript
//! import sceneSessionManager from '@ohos.sceneSessionManager'
//!
//! sceneSessionManager.on('createSpecificSession', (session) => {
//!   session.on('sessionRectChange', (rect, reason) => { ... })
//! })
//! let root = sceneSessionManager.getRootSceneSession()
//! root.on('pendingSceneSessionActivation', (info) => { ... })
//! ```

use std::sync::Arc;

use scena_platform::SceneSessionManager;
use scena_script::{CallbackInfo, JsEnv, JsFunction, JsObject, JsValue};

use crate::error::Result;
use crate::manager::JsSceneSessionManager;
use crate::root::JsRootSceneSession;
use crate::scheduler::JsTaskScheduler;
use crate::utils::{create_js_keyboard_gravity, create_js_session_state, unwrap_this};

/// Build the `sceneSessionManager` exports for `env`
///
/// Must run on the environment's owner thread. Returns the exports object
/// and the native wrapper it carries.
pub fn export_scene_session_manager(
    env: &JsEnv,
    manager: Arc<SceneSessionManager>,
    scheduler: Arc<JsTaskScheduler>,
) -> Result<(JsObject, Arc<JsSceneSessionManager>)> {
    env.check_thread("export_scene_session_manager")?;
    let wrapper = JsSceneSessionManager::new(manager, scheduler);

    let exports = JsObject::new();
    exports.set_named_property(
        "on",
        JsFunction::new("on", JsSceneSessionManager::register_callback),
    );
    exports.set_named_property(
        "getRootSceneSession",
        JsFunction::new("getRootSceneSession", get_root_scene_session),
    );
    exports.set_named_property("SessionState", create_js_session_state());
    exports.set_named_property("KeyboardGravity", create_js_keyboard_gravity());
    exports.wrap(wrapper.clone());

    tracing::info!("scene session manager exported");
    Ok((exports, wrapper))
}

fn get_root_scene_session(env: &JsEnv, info: &CallbackInfo) -> JsValue {
    let Some(manager) = unwrap_this::<JsSceneSessionManager>(info) else {
        tracing::error!("getRootSceneSession() called without a manager wrapper");
        return JsValue::Undefined;
    };
    match JsRootSceneSession::create(env, &manager) {
        Ok(object) => JsValue::Object(object),
        Err(e) => {
            tracing::error!("failed to create root scene session: {e}");
            JsValue::Undefined
        }
    }
}
