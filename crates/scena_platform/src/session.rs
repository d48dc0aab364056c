//! Scene sessions
//!
//! A `SceneSession` is the platform's record of one window: identity, state,
//! geometry, and the listeners interested in its changes. Changes are raised
//! on whatever thread the platform happens to be running (IPC, render, timer)
//! and listeners are invoked synchronously on that thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use rustc_hash::FxHashMap;
use scena_core::{PersistentId, SceneSessionEvent};
use serde::Serialize;

use crate::geometry::{KeyboardGravity, SessionInfo, SessionState, SizeChangeReason, WsRect};

/// Data carried by a session event
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEventPayload {
    PendingActivation(SessionInfo),
    StateChange(SessionState),
    BufferAvailable(bool),
    SessionEvent(i32),
    RectChange { rect: WsRect, reason: SizeChangeReason },
    RaiseToTop,
    BackPressed { need_move_to_background: bool },
    FocusableChange(bool),
    TouchableChange(bool),
    Click,
    Terminate(SessionInfo),
    Exception { error_code: i32, reason: String },
    LabelUpdate(String),
    NeedAvoid(bool),
    ShowWhenLocked(bool),
    RequestedOrientation(u32),
    RaiseAboveTarget(PersistentId),
    LandscapeMultiWindow(bool),
    KeyboardGravity(KeyboardGravity),
    LayoutFullScreen(bool),
}

impl SessionEventPayload {
    /// The event this payload belongs to
    pub fn event(&self) -> SceneSessionEvent {
        match self {
            SessionEventPayload::PendingActivation(_) => SceneSessionEvent::PendingSceneSessionActivation,
            SessionEventPayload::StateChange(_) => SceneSessionEvent::SessionStateChange,
            SessionEventPayload::BufferAvailable(_) => SceneSessionEvent::BufferAvailableChange,
            SessionEventPayload::SessionEvent(_) => SceneSessionEvent::SessionEvent,
            SessionEventPayload::RectChange { .. } => SceneSessionEvent::SessionRectChange,
            SessionEventPayload::RaiseToTop => SceneSessionEvent::RaiseToTop,
            SessionEventPayload::BackPressed { .. } => SceneSessionEvent::BackPressed,
            SessionEventPayload::FocusableChange(_) => SceneSessionEvent::SessionFocusableChange,
            SessionEventPayload::TouchableChange(_) => SceneSessionEvent::SessionTouchableChange,
            SessionEventPayload::Click => SceneSessionEvent::Click,
            SessionEventPayload::Terminate(_) => SceneSessionEvent::TerminateSession,
            SessionEventPayload::Exception { .. } => SceneSessionEvent::SessionException,
            SessionEventPayload::LabelUpdate(_) => SceneSessionEvent::UpdateSessionLabel,
            SessionEventPayload::NeedAvoid(_) => SceneSessionEvent::NeedAvoid,
            SessionEventPayload::ShowWhenLocked(_) => SceneSessionEvent::ShowWhenLocked,
            SessionEventPayload::RequestedOrientation(_) => {
                SceneSessionEvent::RequestedOrientationChange
            }
            SessionEventPayload::RaiseAboveTarget(_) => SceneSessionEvent::RaiseAboveTarget,
            SessionEventPayload::LandscapeMultiWindow(_) => SceneSessionEvent::LandscapeMultiWindow,
            SessionEventPayload::KeyboardGravity(_) => SceneSessionEvent::KeyboardGravityChange,
            SessionEventPayload::LayoutFullScreen(_) => SceneSessionEvent::LayoutFullScreenChange,
        }
    }
}

/// Listener invoked when a session raises an event
pub type SessionListener = Arc<dyn Fn(&SessionEventPayload) + Send + Sync>;

/// Point-in-time copy of a session's observable state
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub persistent_id: PersistentId,
    pub info: SessionInfo,
    pub state: SessionState,
    pub rect: WsRect,
    pub focusable: bool,
    pub touchable: bool,
    pub label: String,
}

/// Platform record of one window
pub struct SceneSession {
    persistent_id: PersistentId,
    info: SessionInfo,
    state: RwLock<SessionState>,
    rect: RwLock<WsRect>,
    focusable: AtomicBool,
    touchable: AtomicBool,
    label: RwLock<String>,
    listeners: RwLock<FxHashMap<SceneSessionEvent, SessionListener>>,
}

impl SceneSession {
    pub fn new(persistent_id: PersistentId, info: SessionInfo) -> Self {
        let label = info.ability_name.clone();
        Self {
            persistent_id,
            info,
            state: RwLock::new(SessionState::Disconnect),
            rect: RwLock::new(WsRect::default()),
            focusable: AtomicBool::new(true),
            touchable: AtomicBool::new(true),
            label: RwLock::new(label),
            listeners: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn persistent_id(&self) -> PersistentId {
        self.persistent_id
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn state(&self) -> SessionState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn rect(&self) -> WsRect {
        *self.rect.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_focusable(&self) -> bool {
        self.focusable.load(Ordering::Acquire)
    }

    pub fn is_touchable(&self) -> bool {
        self.touchable.load(Ordering::Acquire)
    }

    pub fn label(&self) -> String {
        self.label
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            persistent_id: self.persistent_id,
            info: self.info.clone(),
            state: self.state(),
            rect: self.rect(),
            focusable: self.is_focusable(),
            touchable: self.is_touchable(),
            label: self.label(),
        }
    }

    /// Install the listener for `event`, replacing any previous one
    pub fn set_listener(&self, event: SceneSessionEvent, listener: SessionListener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event, listener);
    }

    pub fn has_listener(&self, event: SceneSessionEvent) -> bool {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&event)
    }

    /// Drop every listener
    pub fn clear_listeners(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Raise `payload` to its listener on the calling thread
    ///
    /// Returns whether a listener was installed.
    pub fn notify(&self, payload: SessionEventPayload) -> bool {
        let event = payload.event();
        // Clone out so the listener runs without the table locked
        let listener = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .cloned();
        match listener {
            Some(listener) => {
                listener(&payload);
                true
            }
            None => {
                tracing::trace!(id = self.persistent_id, %event, "no listener");
                false
            }
        }
    }

    /// Move to `rect` and report the change
    pub fn update_rect(&self, rect: WsRect, reason: SizeChangeReason) -> bool {
        *self.rect.write().unwrap_or_else(PoisonError::into_inner) = rect;
        self.notify(SessionEventPayload::RectChange { rect, reason })
    }

    /// Enter `state` and report the change
    pub fn update_state(&self, state: SessionState) -> bool {
        {
            let mut current = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if *current == state {
                return false;
            }
            *current = state;
        }
        self.notify(SessionEventPayload::StateChange(state))
    }

    pub fn set_focusable(&self, focusable: bool) -> bool {
        if self.focusable.swap(focusable, Ordering::AcqRel) == focusable {
            return false;
        }
        self.notify(SessionEventPayload::FocusableChange(focusable))
    }

    pub fn set_touchable(&self, touchable: bool) -> bool {
        if self.touchable.swap(touchable, Ordering::AcqRel) == touchable {
            return false;
        }
        self.notify(SessionEventPayload::TouchableChange(touchable))
    }

    pub fn update_label(&self, label: &str) -> bool {
        *self.label.write().unwrap_or_else(PoisonError::into_inner) = label.to_string();
        self.notify(SessionEventPayload::LabelUpdate(label.to_string()))
    }
}

impl std::fmt::Debug for SceneSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneSession")
            .field("persistent_id", &self.persistent_id)
            .field("info", &self.info)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
