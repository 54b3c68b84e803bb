//! Progress persistence
//!
//! Features:
//! - Per-player local cache with a versioned JSON envelope
//! - Outbox of remote progress calls, drained by the platform layer
//! - Play time that is re-queued when a flush fails
//! - In-memory progress store for tests and the native demo

pub mod bridge;
pub mod cache;
pub mod progress;
pub mod store;
pub mod sync;
pub mod wire;

pub use bridge::{PROGRESS_KEY, PersistenceBridge, SyncEvent};
pub use cache::LocalCache;
pub use progress::{ItemKey, PlayerProgress};
pub use store::InMemoryProgressStore;
pub use sync::{Completion, OutgoingRequest, ProgressService, RequestId};
pub use wire::{FlushReason, Method, ProgressRequest, ProgressResponse};
