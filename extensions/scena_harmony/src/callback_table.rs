//! Per-wrapper callback tables
//!
//! Each wrapper keeps at most one scripting callback per event. Once an event
//! has a callback, registering it again is a no-op if the new callback is
//! already stored under any event.

use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use rustc_hash::{FxHashMap, FxHashSet};
use scena_script::{JsEnv, JsValue, NativeReference};

use crate::error::{HarmonyError, Result};

/// Outcome of a registration attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// The callback is already stored; nothing changed
    Duplicate,
    /// The callback was stored
    Stored {
        /// A different callback for the same event was dropped
        replaced: bool,
        /// First registration for this event; the platform listener must be
        /// wired now
        needs_wiring: bool,
    },
}

/// Event-keyed store of scripting callbacks
pub struct CallbackTable<E> {
    callbacks: RwLock<FxHashMap<E, Arc<NativeReference>>>,
    wired: Mutex<FxHashSet<E>>,
}

impl<E> CallbackTable<E>
where
    E: Copy + Eq + Hash + Display,
{
    pub fn new() -> Self {
        Self {
            callbacks: RwLock::new(FxHashMap::default()),
            wired: Mutex::new(FxHashSet::default()),
        }
    }

    /// Store `callback` for `event`
    ///
    /// Must run on the environment's owner thread, since stored references
    /// are compared by identity.
    pub fn register(&self, env: &JsEnv, event: E, callback: &JsValue) -> Result<Registration> {
        if !callback.is_callable() {
            return Err(HarmonyError::InvalidParam(format!(
                "callback for {event} is a {}",
                callback.type_name()
            )));
        }

        let mut callbacks = self
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // The scan only applies once `event` has an entry of its own.
        if callbacks.contains_key(&event) {
            for stored in callbacks.values() {
                if stored.strict_equals(env, callback)? {
                    tracing::debug!(%event, "callback already registered");
                    return Ok(Registration::Duplicate);
                }
            }
        }

        let reference = env.create_reference(callback)?;
        let replaced = callbacks.insert(event, reference).is_some();
        drop(callbacks);

        let needs_wiring = self
            .wired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event);
        tracing::debug!(%event, replaced, needs_wiring, "callback registered");
        Ok(Registration::Stored {
            replaced,
            needs_wiring,
        })
    }

    /// Callback stored for `event`
    pub fn get(&self, event: E) -> Option<Arc<NativeReference>> {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .cloned()
    }

    pub fn contains(&self, event: E) -> bool {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&event)
    }

    /// Whether the platform listener for `event` has been wired
    pub fn is_wired(&self, event: E) -> bool {
        self.wired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&event)
    }

    pub fn len(&self) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release every stored callback; returns how many were dropped
    pub fn clear(&self) -> usize {
        let mut callbacks = self
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let count = callbacks.len();
        callbacks.clear();
        count
    }
}

impl<E> Default for CallbackTable<E>
where
    E: Copy + Eq + Hash + Display,
{
    fn default() -> Self {
        Self::new()
    }
}
