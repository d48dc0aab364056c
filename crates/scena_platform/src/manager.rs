//! Scene session manager
//!
//! Owns every live `SceneSession`, hands out persistent ids and reports
//! manager-level events (creation, focus, user switch) to its listeners.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use rustc_hash::FxHashMap;
use scena_core::{ManagerEvent, PersistentId};

use crate::error::{PlatformError, Result};
use crate::geometry::{SessionInfo, SessionState, SessionType};
use crate::session::SceneSession;

/// Data carried by a manager event
#[derive(Clone, Debug)]
pub enum ManagerEventPayload {
    CreateSpecificSession(Arc<SceneSession>),
    CreateKeyboardSession {
        keyboard: Arc<SceneSession>,
        panel: Arc<SceneSession>,
    },
    OutsideDownEvent { x: i32, y: i32 },
    GestureNavigationEnabledChange(bool),
    ShiftFocus(PersistentId),
    StatusBarEnabledChange(bool),
    RecoverSceneSession(Arc<SceneSession>),
    StartUiAbilityError(u32),
    CallingWindowIdChange(u32),
    SwitchToAnotherUser,
}

impl ManagerEventPayload {
    pub fn event(&self) -> ManagerEvent {
        match self {
            ManagerEventPayload::CreateSpecificSession(_) => ManagerEvent::CreateSpecificSession,
            ManagerEventPayload::CreateKeyboardSession { .. } => ManagerEvent::CreateKeyboardSession,
            ManagerEventPayload::OutsideDownEvent { .. } => ManagerEvent::OutsideDownEvent,
            ManagerEventPayload::GestureNavigationEnabledChange(_) => {
                ManagerEvent::GestureNavigationEnabledChange
            }
            ManagerEventPayload::ShiftFocus(_) => ManagerEvent::ShiftFocus,
            ManagerEventPayload::StatusBarEnabledChange(_) => ManagerEvent::StatusBarEnabledChange,
            ManagerEventPayload::RecoverSceneSession(_) => ManagerEvent::RecoverSceneSession,
            ManagerEventPayload::StartUiAbilityError(_) => ManagerEvent::StartUiAbilityError,
            ManagerEventPayload::CallingWindowIdChange(_) => ManagerEvent::CallingWindowIdChange,
            ManagerEventPayload::SwitchToAnotherUser => ManagerEvent::SwitchToAnotherUser,
        }
    }
}

/// Listener invoked when the manager raises an event
pub type ManagerListener = Arc<dyn Fn(&ManagerEventPayload) + Send + Sync>;

/// Hook invoked after a session has been removed
pub type DestroyHook = Arc<dyn Fn(PersistentId) + Send + Sync>;

/// Registry of live sessions
pub struct SceneSessionManager {
    sessions: RwLock<FxHashMap<PersistentId, Arc<SceneSession>>>,
    next_id: AtomicI32,
    focused: AtomicI32,
    listeners: RwLock<FxHashMap<ManagerEvent, ManagerListener>>,
    destroy_hooks: RwLock<Vec<DestroyHook>>,
}

impl SceneSessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(FxHashMap::default()),
            next_id: AtomicI32::new(1),
            focused: AtomicI32::new(0),
            listeners: RwLock::new(FxHashMap::default()),
            destroy_hooks: RwLock::new(Vec::new()),
        }
    }

    /// Install the listener for `event`, replacing any previous one
    pub fn set_listener(&self, event: ManagerEvent, listener: ManagerListener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event, listener);
    }

    pub fn has_listener(&self, event: ManagerEvent) -> bool {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&event)
    }

    /// Run `hook` with the id of every session destroyed from now on
    pub fn add_destroy_hook(&self, hook: DestroyHook) {
        self.destroy_hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    /// Raise `payload` to its listener on the calling thread
    pub fn notify(&self, payload: ManagerEventPayload) -> bool {
        let event = payload.event();
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
                tracing::trace!(%event, "no manager listener");
                false
            }
        }
    }

    fn allocate(&self, info: SessionInfo) -> Result<Arc<SceneSession>> {
        if !info.is_valid() {
            return Err(PlatformError::InvalidSessionInfo(info.session_name()));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(SceneSession::new(id, info));
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&session));
        tracing::debug!(id, name = %session.info().session_name(), "session created");
        Ok(session)
    }

    /// Create a session without telling listeners
    pub fn create_session(&self, info: SessionInfo) -> Result<Arc<SceneSession>> {
        self.allocate(info)
    }

    /// Create a session on a system request and report it
    pub fn create_specific_session(&self, info: SessionInfo) -> Result<Arc<SceneSession>> {
        let session = self.allocate(info.with_type(SessionType::System))?;
        self.notify(ManagerEventPayload::CreateSpecificSession(Arc::clone(
            &session,
        )));
        Ok(session)
    }

    /// Create a keyboard session and its panel and report the pair
    pub fn create_keyboard_session(
        &self,
        info: SessionInfo,
    ) -> Result<(Arc<SceneSession>, Arc<SceneSession>)> {
        let keyboard = self.allocate(info.clone().with_type(SessionType::Keyboard))?;
        let panel = self.allocate(info.with_type(SessionType::KeyboardPanel))?;
        self.notify(ManagerEventPayload::CreateKeyboardSession {
            keyboard: Arc::clone(&keyboard),
            panel: Arc::clone(&panel),
        });
        Ok((keyboard, panel))
    }

    /// Recreate a session after its client restarted and report it
    pub fn recover_session(&self, info: SessionInfo) -> Result<Arc<SceneSession>> {
        let session = self.allocate(info)?;
        self.notify(ManagerEventPayload::RecoverSceneSession(Arc::clone(
            &session,
        )));
        Ok(session)
    }

    /// Remove a session and run the destroy hooks
    ///
    /// The session stays usable through any `Arc` still held elsewhere; its
    /// listeners are cleared so no further events reach scripting code.
    pub fn destroy_session(&self, id: PersistentId) -> Result<Arc<SceneSession>> {
        let session = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .ok_or(PlatformError::SessionNotFound(id))?;
        session.update_state(SessionState::Disconnect);
        session.clear_listeners();
        let _ = self
            .focused
            .compare_exchange(id, 0, Ordering::AcqRel, Ordering::Acquire);
        let hooks = self
            .destroy_hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for hook in hooks {
            hook(id);
        }
        tracing::debug!(id, "session destroyed");
        Ok(session)
    }

    pub fn get_session(&self, id: PersistentId) -> Option<Arc<SceneSession>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Ids of all live sessions in ascending order
    pub fn session_ids(&self) -> Vec<PersistentId> {
        let mut ids: Vec<_> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Move focus to `id` and report the shift
    pub fn update_focus(&self, id: PersistentId) -> Result<()> {
        let session = self
            .get_session(id)
            .ok_or(PlatformError::SessionNotFound(id))?;
        if !session.is_focusable() {
            return Err(PlatformError::InvalidState {
                id,
                reason: "session is not focusable".to_string(),
            });
        }
        if self.focused.swap(id, Ordering::AcqRel) != id {
            self.notify(ManagerEventPayload::ShiftFocus(id));
        }
        Ok(())
    }

    /// Currently focused session, if any
    pub fn focused_session(&self) -> Option<PersistentId> {
        match self.focused.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }
}

impl Default for SceneSessionManager {
    fn default() -> Self {
        Self::new()
    }
}
