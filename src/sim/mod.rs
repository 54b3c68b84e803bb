//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Virtual clock only
//! - Seeded RNG only
//! - Stable iteration order
//! - No rendering, network or platform dependencies

pub mod collectibles;
pub mod gear_network;
pub mod puzzle;
pub mod rotation_lock;
pub mod session;
pub mod state;
pub mod tick;
pub mod timers;
pub mod valve_sum;

pub use collectibles::{CollectibleItem, SpawnOutcome, SpawnScheduler, stage_pool};
pub use gear_network::{
    CellRole, Coord, GearGrid, GearMove, GearNetwork, GridCell, NetworkFailure, Propagation,
    Rotation, Spin, Topology, propagate,
};
pub use puzzle::{ActivePuzzle, Puzzle, PuzzleContext, Verdict};
pub use rotation_lock::{LockSave, Ring, RotationLock};
pub use session::{ActionOutcome, RejectReason, SOLVED_KEY, Session};
pub use state::{Failure, GameEvent, Phase, SceneDecor, SessionFlags, Stage, TimerEvent};
pub use tick::{PlayerAction, TickInput, tick};
pub use timers::{TimerHandle, TimerQueue};
pub use valve_sum::{Gauge, ReadoutTone, ValveSum, ValveTile, generate_values};
