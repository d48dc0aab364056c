//! Conversions between Rust and scripting values

use crate::error::{Result, ScriptError};
use crate::value::{CallbackInfo, JsFunction, JsObject, JsValue};

/// Types that can be read out of a scripting value
pub trait FromJsValue: Sized {
    /// Type name used in conversion errors
    const EXPECTED: &'static str;

    fn from_js_value(value: &JsValue) -> Option<Self>;
}

impl FromJsValue for String {
    const EXPECTED: &'static str = "string";

    fn from_js_value(value: &JsValue) -> Option<Self> {
        match value {
            JsValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromJsValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_js_value(value: &JsValue) -> Option<Self> {
        match value {
            JsValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromJsValue for f64 {
    const EXPECTED: &'static str = "number";

    fn from_js_value(value: &JsValue) -> Option<Self> {
        match value {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

// Integer reads truncate toward zero and saturate, like the engine's int32 reads.
macro_rules! impl_from_js_integer {
    ($($ty:ty),+) => {
        $(
            impl FromJsValue for $ty {
                const EXPECTED: &'static str = "number";

                fn from_js_value(value: &JsValue) -> Option<Self> {
                    match value {
                        JsValue::Number(n) if n.is_finite() => Some(*n as $ty),
                        _ => None,
                    }
                }
            }
        )+
    };
}

impl_from_js_integer!(i32, u32, i64);

impl FromJsValue for JsFunction {
    const EXPECTED: &'static str = "function";

    fn from_js_value(value: &JsValue) -> Option<Self> {
        value.as_function().cloned()
    }
}

impl FromJsValue for JsObject {
    const EXPECTED: &'static str = "object";

    fn from_js_value(value: &JsValue) -> Option<Self> {
        value.as_object().cloned()
    }
}

/// Read argument `index` as `T`
pub fn convert_arg<T: FromJsValue>(info: &CallbackInfo, index: usize) -> Result<T> {
    info.arg(index)
        .and_then(T::from_js_value)
        .ok_or(ScriptError::Conversion {
            index,
            expected: T::EXPECTED,
        })
}

impl From<bool> for JsValue {
    fn from(value: bool) -> Self {
        JsValue::Bool(value)
    }
}

impl From<f64> for JsValue {
    fn from(value: f64) -> Self {
        JsValue::Number(value)
    }
}

impl From<i32> for JsValue {
    fn from(value: i32) -> Self {
        JsValue::Number(f64::from(value))
    }
}

impl From<u32> for JsValue {
    fn from(value: u32) -> Self {
        JsValue::Number(f64::from(value))
    }
}

impl From<&str> for JsValue {
    fn from(value: &str) -> Self {
        JsValue::String(value.to_string())
    }
}

impl From<String> for JsValue {
    fn from(value: String) -> Self {
        JsValue::String(value)
    }
}

impl From<JsObject> for JsValue {
    fn from(value: JsObject) -> Self {
        JsValue::Object(value)
    }
}

impl From<JsFunction> for JsValue {
    fn from(value: JsFunction) -> Self {
        JsValue::Function(value)
    }
}

impl<T: Into<JsValue>> From<Option<T>> for JsValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(JsValue::Undefined, Into::into)
    }
}
