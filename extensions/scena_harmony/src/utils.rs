//! Conversions from platform types to scripting objects

use std::any::Any;
use std::sync::Arc;

use scena_core::{PersistentId, WsErrorCode};
use scena_platform::{KeyboardGravity, SessionInfo, SessionState, WsRect};
use scena_script::{CallbackInfo, JsEnv, JsObject, JsValue};

/// Session info as handed to scripting callbacks
pub fn create_js_session_info(info: &SessionInfo, persistent_id: Option<PersistentId>) -> JsObject {
    let object = JsObject::new();
    object.set_named_property("bundleName", info.bundle_name.as_str());
    object.set_named_property("moduleName", info.module_name.as_str());
    object.set_named_property("abilityName", info.ability_name.as_str());
    object.set_named_property("persistentId", persistent_id);
    object.set_named_property("sessionType", info.session_type as u32);
    object
}

pub fn create_js_session_rect(rect: &WsRect) -> JsObject {
    let object = JsObject::new();
    object.set_named_property("posX_", rect.pos_x);
    object.set_named_property("posY_", rect.pos_y);
    object.set_named_property("width_", rect.width);
    object.set_named_property("height_", rect.height);
    object
}

/// `SessionState` enum object exported to scripting code
pub fn create_js_session_state() -> JsObject {
    let object = JsObject::new();
    for state in SessionState::ALL {
        object.set_named_property(state.js_name(), state.as_u32());
    }
    object
}

/// `KeyboardGravity` enum object exported to scripting code
pub fn create_js_keyboard_gravity() -> JsObject {
    let object = JsObject::new();
    for gravity in KeyboardGravity::ALL {
        object.set_named_property(gravity.js_name(), gravity.as_u32());
    }
    object
}

/// Throw the standard invalid-parameter error
pub fn throw_invalid_param(env: &JsEnv) -> JsValue {
    env.throw_error(
        WsErrorCode::InvalidParam,
        Some(WsErrorCode::InvalidParam.message()),
    );
    JsValue::Undefined
}

/// Native wrapper attached to the call's receiver
pub fn unwrap_this<T: Any + Send + Sync>(info: &CallbackInfo) -> Option<Arc<T>> {
    info.this().as_object()?.unwrap_native::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_enum_object() {
        let states = create_js_session_state();
        assert!(states
            .get_named_property("STATE_FOREGROUND")
            .is_some_and(|v| v.strict_equals(&JsValue::Number(2.0))));
        assert_eq!(states.entries().len(), SessionState::ALL.len());
    }

    #[test]
    fn test_session_info_without_id_is_undefined() {
        let info = SessionInfo::new("com.example", "entry", "Main");
        let object = create_js_session_info(&info, None);
        assert!(object
            .get_named_property("persistentId")
            .is_some_and(|v| v.is_undefined()));
        assert!(object
            .get_named_property("abilityName")
            .is_some_and(|v| v.strict_equals(&JsValue::from("Main"))));
    }

    #[test]
    fn test_invalid_param_sets_pending_exception() {
        let env = JsEnv::for_current_thread();
        assert!(throw_invalid_param(&env).is_undefined());
        let error = env.take_exception().unwrap();
        let code = error.as_object().and_then(|e| e.get_named_property("code"));
        assert!(code.is_some_and(|c| c.strict_equals(&JsValue::Number(401.0))));
    }
}
