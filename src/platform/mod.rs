//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Storage (LocalStorage on web, in-memory natively)
//! - Remote progress calls (`fetch` on web)
//! - Driving the session from `requestAnimationFrame`

pub mod storage;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use storage::{KvStore, MemoryStorage};
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
