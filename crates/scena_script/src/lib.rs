//! Scena Scripting Interop
//!
//! The host-side view of a single-threaded scripting engine, shaped after the
//! N-API surface that native modules program against:
//!
//! - **Values**: primitives plus objects and functions with reference identity
//! - **Environment**: bound to one owner thread; calls made anywhere else fail
//! - **References**: keep a value alive between native calls
//! - **Exceptions**: thrown into the environment and surfaced to the caller
//! - **Completions**: work queued from any thread, drained by the owner thread
//!
//! Nothing here schedules work. Getting onto the owner thread is the job of
//! `scena_core::MainThreadScheduler`.

pub mod convert;
pub mod env;
pub mod error;
pub mod reference;
pub mod value;

pub use convert::{convert_arg, FromJsValue};
pub use env::{create_js_error, Completion, HandleScope, JsEnv};
pub use error::{Result, ScriptError};
pub use reference::NativeReference;
pub use value::{CallbackInfo, JsFunction, JsObject, JsValue, NativeData};
