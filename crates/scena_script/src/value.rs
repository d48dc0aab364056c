//! Scripting values
//!
//! Objects and functions have reference identity: clones share the same
//! underlying storage, and strict equality compares that storage.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use smallvec::SmallVec;

use crate::env::JsEnv;

/// Native data attached to an object
pub type NativeData = Arc<dyn Any + Send + Sync>;

/// Signature of a function callable from scripting code
pub type NativeCallback = dyn Fn(&JsEnv, &CallbackInfo) -> JsValue + Send + Sync;

/// A scripting value
#[derive(Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(JsObject),
    Function(JsFunction),
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    /// Whether the value can be called
    pub fn is_callable(&self) -> bool {
        matches!(self, JsValue::Function(_))
    }

    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            JsValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&JsFunction> {
        match self {
            JsValue::Function(function) => Some(function),
            _ => None,
        }
    }

    /// `===` semantics
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
            (JsValue::Bool(a), JsValue::Bool(b)) => a == b,
            // NaN !== NaN falls out of f64 comparison
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => a.ptr_eq(b),
            (JsValue::Function(a), JsValue::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Name of the value's type, as `typeof` would report it
    pub fn type_name(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null | JsValue::Object(_) => "object",
            JsValue::Bool(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Function(_) => "function",
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => f.write_str("undefined"),
            JsValue::Null => f.write_str("null"),
            JsValue::Bool(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{n}"),
            JsValue::String(s) => write!(f, "{s:?}"),
            JsValue::Object(object) => {
                let mut map = f.debug_map();
                for (key, value) in object.entries() {
                    map.entry(&key, &value);
                }
                map.finish()
            }
            JsValue::Function(function) => write!(f, "[Function: {}]", function.name()),
        }
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::String(s) => f.write_str(s),
            JsValue::Object(object) => match object.get_named_property("message") {
                Some(JsValue::String(message)) => f.write_str(&message),
                _ => f.write_str("[object Object]"),
            },
            other => fmt::Debug::fmt(other, f),
        }
    }
}

struct ObjectInner {
    properties: RwLock<BTreeMap<String, JsValue>>,
    native: RwLock<Option<NativeData>>,
}

/// A scripting object with named properties and optional native data
#[derive(Clone)]
pub struct JsObject {
    inner: Arc<ObjectInner>,
}

impl JsObject {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                properties: RwLock::new(BTreeMap::new()),
                native: RwLock::new(None),
            }),
        }
    }

    pub fn set_named_property(&self, name: &str, value: impl Into<JsValue>) {
        self.inner
            .properties
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.into());
    }

    pub fn get_named_property(&self, name: &str) -> Option<JsValue> {
        self.inner
            .properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn has_named_property(&self, name: &str) -> bool {
        self.inner
            .properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Snapshot of every property, ordered by name
    pub fn entries(&self) -> Vec<(String, JsValue)> {
        self.inner
            .properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Attach native data; fails if the object already wraps something
    pub fn wrap(&self, native: NativeData) -> bool {
        let mut slot = self
            .inner
            .native
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(native);
        true
    }

    /// Native data of type `T`, if this object wraps one
    pub fn unwrap_native<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let native = self
            .inner
            .native
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        native.downcast::<T>().ok()
    }

    /// Detach and return the native data
    pub fn remove_wrap(&self) -> Option<NativeData> {
        self.inner
            .native
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Whether both handles refer to the same object
    pub fn ptr_eq(&self, other: &JsObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for JsObject {
    fn default() -> Self {
        Self::new()
    }
}

/// A callable scripting value
#[derive(Clone)]
pub struct JsFunction {
    name: Arc<str>,
    callback: Arc<NativeCallback>,
}

impl JsFunction {
    pub fn new<F>(name: &str, callback: F) -> Self
    where
        F: Fn(&JsEnv, &CallbackInfo) -> JsValue + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            callback: Arc::new(callback),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether both handles refer to the same function
    pub fn ptr_eq(&self, other: &JsFunction) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }

    /// Invoke without any thread or exception bookkeeping
    ///
    /// Use [`JsEnv::call_function`] instead.
    pub(crate) fn invoke(&self, env: &JsEnv, info: &CallbackInfo) -> JsValue {
        (self.callback)(env, info)
    }
}

/// Receiver and arguments of a native call
#[derive(Clone, Debug, Default)]
pub struct CallbackInfo {
    this: JsValue,
    argv: SmallVec<[JsValue; 4]>,
}

impl CallbackInfo {
    pub fn new(this: JsValue, args: &[JsValue]) -> Self {
        Self {
            this,
            argv: args.iter().cloned().collect(),
        }
    }

    pub fn this(&self) -> &JsValue {
        &self.this
    }

    pub fn argc(&self) -> usize {
        self.argv.len()
    }

    pub fn arg(&self, index: usize) -> Option<&JsValue> {
        self.argv.get(index)
    }

    pub fn args(&self) -> &[JsValue] {
        &self.argv
    }
}
