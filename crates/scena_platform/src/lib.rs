//! Scena Platform Layer
//!
//! The window-manager side of the bridge. Sessions and the manager raise
//! events from whatever thread they run on; the scripting bindings decide
//! how those events reach the owner thread.
//!
//! - [`SceneSession`]: one window with its state, geometry and listeners
//! - [`SceneSessionManager`]: owns live sessions and allocates persistent ids

pub mod error;
pub mod geometry;
pub mod manager;
pub mod session;

pub use error::{PlatformError, Result};
pub use geometry::{KeyboardGravity, SessionInfo, SessionState, SessionType, SizeChangeReason, WsRect};
pub use manager::{DestroyHook, ManagerEventPayload, ManagerListener, SceneSessionManager};
pub use session::{SceneSession, SessionEventPayload, SessionListener, SessionSnapshot};
