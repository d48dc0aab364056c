//! Scripting interop errors

use thiserror::Error;

use crate::value::JsValue;

/// Errors raised while touching scripting values
#[derive(Error, Debug)]
pub enum ScriptError {
    /// A scripting value was touched off the environment's owner thread
    #[error("{op} called off the owner thread")]
    WrongThread { op: &'static str },

    /// The callee is not a function
    #[error("Value of type {0} is not callable")]
    NotCallable(&'static str),

    /// The callee threw
    #[error("Uncaught exception: {0}")]
    Exception(JsValue),

    /// An argument did not have the expected type
    #[error("Expected {expected} for argument {index}")]
    Conversion { index: usize, expected: &'static str },
}

/// Result type for scripting operations
pub type Result<T> = std::result::Result<T, ScriptError>;
