//! Stored references to scripting values
//!
//! A reference keeps a value alive past the native call that received it.
//! Reading it back is only allowed on the owner thread.

use crate::env::JsEnv;
use crate::error::Result;
use crate::value::JsValue;

/// A scripting value held by native code
pub struct NativeReference {
    value: JsValue,
}

impl NativeReference {
    pub(crate) fn new(value: JsValue) -> Self {
        Self { value }
    }

    /// The referenced value; owner thread only
    pub fn value(&self, env: &JsEnv) -> Result<&JsValue> {
        env.check_thread("NativeReference::value")?;
        Ok(&self.value)
    }

    /// `===` against `other`; owner thread only
    pub fn strict_equals(&self, env: &JsEnv, other: &JsValue) -> Result<bool> {
        env.check_thread("NativeReference::strict_equals")?;
        Ok(self.value.strict_equals(other))
    }
}

impl std::fmt::Debug for NativeReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeReference")
            .field("type", &self.value.type_name())
            .finish()
    }
}
