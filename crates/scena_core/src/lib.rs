//! Scena Core Runtime
//!
//! The thread-safety foundation of the scene-session bridge:
//!
//! - **Event runner**: a named owner thread with a FIFO task queue
//! - **Main-thread scheduler**: posts work from any thread onto the owner
//!   thread, with a thread-pool fallback when no runner is available
//! - **Liveness registry**: weak wrapper handles keyed by persistent id, checked
//!   by queued tasks before they touch a wrapper
//! - **Callback registries**: the fixed event names scripting code subscribes to
//!
//! # Example
//!
//! ```rust
//! use scena_core::{MainEventRunner, MainThreadScheduler};
//! use std::time::Duration;
//!
//! let runner = MainEventRunner::spawn("scena-main").unwrap();
//! let scheduler = MainThreadScheduler::with_runner(runner.clone());
//!
//! scheduler.post(|| println!("on the owner thread"), "hello");
//! assert!(runner.flush(Duration::from_secs(1)));
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod liveness;
pub mod runner;
pub mod scheduler;

pub use config::SchedulerConfig;
pub use error::{Result, WsError, WsErrorCode};
pub use events::{ManagerEvent, RootSceneEvent, SceneSessionEvent};
pub use liveness::{LivenessRegistry, PersistentId};
pub use runner::{MainEventRunner, Task};
pub use scheduler::{Dispatch, FallbackPool, MainThreadScheduler, SchedulerStats};
