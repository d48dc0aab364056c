//! Scena HarmonyOS Bindings
//!
//! Exposes scene sessions to a single-threaded scripting environment.
//!
//! # Architecture
//!
//! Platform events fire on arbitrary threads. Each wrapper turns them into
//! owner-thread tasks through a [`JsTaskScheduler`]; a queued task re-checks
//! that its wrapper is still alive and registered before it calls into
//! scripting code.
//!
//! - [`JsSceneSession`]: per-session wrapper, callbacks keyed by
//!   `SceneSessionEvent`
//! - [`JsSceneSessionManager`]: manager-level callbacks and the liveness
//!   registry shared by its session wrappers
//! - [`JsRootSceneSession`]: pending-activation requests from the root scene
//! - [`export_scene_session_manager`]: the module's exports object
//!
//! # Usage
//!
//! ```ignore
//! use scena_harmony::{export_scene_session_manager, JsTaskScheduler};
//!
//! let env = JsEnv::new(runner.thread_id());
//! let scheduler = Arc::new(JsTaskScheduler::new(env.clone(), MainThreadScheduler::new()));
//! // On the owner thread:
//! let (exports, manager) = export_scene_session_manager(&env, platform_manager, scheduler)?;
//! ```

pub mod callback_table;
pub mod error;
pub mod manager;
pub mod napi_bridge;
pub mod root;
pub mod scheduler;
pub mod session;
pub mod utils;

pub use callback_table::{CallbackTable, Registration};
pub use error::{HarmonyError, Result};
pub use manager::JsSceneSessionManager;
pub use napi_bridge::export_scene_session_manager;
pub use root::JsRootSceneSession;
pub use scheduler::JsTaskScheduler;
pub use session::{JsSceneSession, SessionRegistry};
