//! Scripting environment
//!
//! One environment belongs to exactly one owner thread. Calls into scripting
//! code and reads through stored references are refused anywhere else.
//!
//! Work that finishes on another thread hands its scripting half back through
//! the completion queue, which only the owner thread drains.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use scena_core::WsErrorCode;

use crate::error::{Result, ScriptError};
use crate::reference::NativeReference;
use crate::value::{CallbackInfo, JsObject, JsValue};

/// Scripting half of work finished elsewhere, run on the owner thread
pub type Completion = Box<dyn FnOnce(&JsEnv) + Send + 'static>;

struct EnvInner {
    owner: ThreadId,
    pending_exception: Mutex<Option<JsValue>>,
    scope_depth: AtomicUsize,
    calls: AtomicU64,
    completions: Mutex<VecDeque<Completion>>,
    completion_ready: Condvar,
}

/// Handle to a scripting environment
#[derive(Clone)]
pub struct JsEnv {
    inner: Arc<EnvInner>,
}

impl JsEnv {
    /// Environment owned by thread `owner`
    pub fn new(owner: ThreadId) -> Self {
        Self {
            inner: Arc::new(EnvInner {
                owner,
                pending_exception: Mutex::new(None),
                scope_depth: AtomicUsize::new(0),
                calls: AtomicU64::new(0),
                completions: Mutex::new(VecDeque::new()),
                completion_ready: Condvar::new(),
            }),
        }
    }

    /// Environment owned by the calling thread
    pub fn for_current_thread() -> Self {
        Self::new(thread::current().id())
    }

    pub fn owner_thread(&self) -> ThreadId {
        self.inner.owner
    }

    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.inner.owner
    }

    /// Fail with `WrongThread` unless called on the owner thread
    pub fn check_thread(&self, op: &'static str) -> Result<()> {
        if self.is_owner_thread() {
            return Ok(());
        }
        tracing::error!(op, "scripting value touched off the owner thread");
        Err(ScriptError::WrongThread { op })
    }

    /// Open a handle scope, closed when the guard drops
    pub fn open_handle_scope(&self) -> Result<HandleScope<'_>> {
        self.check_thread("open_handle_scope")?;
        self.inner.scope_depth.fetch_add(1, Ordering::Relaxed);
        Ok(HandleScope { env: self })
    }

    /// Number of currently open handle scopes
    pub fn handle_scope_depth(&self) -> usize {
        self.inner.scope_depth.load(Ordering::Relaxed)
    }

    /// Call `func` with `recv` as `this`
    ///
    /// An exception thrown by the callee comes back as
    /// [`ScriptError::Exception`] and is no longer pending afterwards.
    pub fn call_function(&self, recv: &JsValue, func: &JsValue, args: &[JsValue]) -> Result<JsValue> {
        self.check_thread("call_function")?;
        let function = func
            .as_function()
            .ok_or(ScriptError::NotCallable(func.type_name()))?;

        self.inner.calls.fetch_add(1, Ordering::Relaxed);
        let info = CallbackInfo::new(recv.clone(), args);
        let result = function.invoke(self, &info);

        match self.take_exception() {
            Some(exception) => Err(ScriptError::Exception(exception)),
            None => Ok(result),
        }
    }

    /// Total successful entries into `call_function`
    pub fn call_count(&self) -> u64 {
        self.inner.calls.load(Ordering::Relaxed)
    }

    /// Make `error` the pending exception
    ///
    /// An exception that is already pending wins.
    pub fn throw(&self, error: JsValue) {
        let mut pending = self
            .inner
            .pending_exception
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if pending.is_none() {
            *pending = Some(error);
        } else {
            tracing::warn!("exception already pending, dropping new one");
        }
    }

    /// Throw a business error carrying `code`
    pub fn throw_error(&self, code: WsErrorCode, message: Option<&str>) {
        self.throw(create_js_error(code, message));
    }

    pub fn is_exception_pending(&self) -> bool {
        self.inner
            .pending_exception
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Clear and return the pending exception
    pub fn take_exception(&self) -> Option<JsValue> {
        self.inner
            .pending_exception
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Hold `value` beyond the current call
    pub fn create_reference(&self, value: &JsValue) -> Result<Arc<NativeReference>> {
        self.check_thread("create_reference")?;
        Ok(Arc::new(NativeReference::new(value.clone())))
    }

    /// Queue `task` for the owner thread; callable from any thread
    pub fn queue_completion(&self, task: Completion) {
        self.inner
            .completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
        self.inner.completion_ready.notify_all();
    }

    pub fn pending_completions(&self) -> usize {
        self.inner
            .completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Block until a completion is queued or `timeout` elapses
    pub fn wait_for_completion(&self, timeout: Duration) -> bool {
        let completions = self
            .inner
            .completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (completions, _) = self
            .inner
            .completion_ready
            .wait_timeout_while(completions, timeout, |queue| queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        !completions.is_empty()
    }

    /// Run queued completions in FIFO order; returns how many ran
    ///
    /// Completions queued while draining run in the same pass.
    pub fn run_completions(&self) -> Result<usize> {
        self.check_thread("run_completions")?;
        let mut ran = 0;
        loop {
            let next = self
                .inner
                .completions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(task) = next else {
                return Ok(ran);
            };
            task(self);
            ran += 1;
        }
    }

    /// Whether both handles refer to the same environment
    pub fn ptr_eq(&self, other: &JsEnv) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Guard for an open handle scope
pub struct HandleScope<'env> {
    env: &'env JsEnv,
}

impl Drop for HandleScope<'_> {
    fn drop(&mut self) {
        self.env.inner.scope_depth.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Build the error object thrown to scripting callers
pub fn create_js_error(code: WsErrorCode, message: Option<&str>) -> JsValue {
    let error = JsObject::new();
    error.set_named_property("code", JsValue::Number(f64::from(code.code())));
    error.set_named_property(
        "message",
        JsValue::String(message.unwrap_or(code.message()).to_string()),
    );
    error.set_named_property("name", JsValue::String("BusinessError".to_string()));
    JsValue::Object(error)
}
