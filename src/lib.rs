//! Zenith - puzzle engine for a three-stage brass-code adventure
//!
//! Core modules:
//! - `sim`: Deterministic gameplay (puzzles, collectibles, timers, session flow)
//! - `persistence`: Per-player local cache and remote progress sync
//! - `platform`: Key/value storage backends and browser glue
//! - `config`: Data-driven timings and puzzle tuning

pub mod config;
pub mod error;
pub mod persistence;
pub mod platform;
pub mod sim;

pub use config::EngineConfig;
pub use error::{ConfigError, RemoteError, StorageError};
pub use sim::{PlayerAction, Session, TickInput, tick};

/// Fixed game constants (not tunable at runtime)
pub mod consts {
    /// Scaled pressure the valve puzzle must hit exactly (100.0 BAR)
    pub const VALVE_TARGET: u32 = 1000;
    /// Number of valves that make up the planted solution
    pub const VALVE_SOLUTION_PARTS: usize = 4;
    /// Number of decoy valves
    pub const VALVE_DECOYS: usize = 4;
    /// Valve values are rounded down to this granularity (0.5 BAR)
    pub const VALVE_GRANULARITY: u32 = 5;
    /// Addend range for the first three solution valves, [lo, hi)
    pub const VALVE_ADDEND_RANGE: (u32, u32) = (100, 400);
    /// Decoy valve range, [lo, hi)
    pub const VALVE_DECOY_RANGE: (u32, u32) = (50, 450);

    /// Highest level stored remotely (game complete)
    pub const MAX_LEVEL: u8 = 4;

    /// Degrees in a full turn
    pub const FULL_TURN: u64 = 360;
}

/// Wrap an unbounded angle into [0, 360)
#[inline]
pub fn wrap_degrees(angle: u64) -> u32 {
    (angle % consts::FULL_TURN) as u32
}

/// Format a scaled integer (tenths) as a one-decimal readout, e.g. 1000 -> "100.0"
#[inline]
pub fn format_tenths(value: u32) -> String {
    format!("{}.{}", value / 10, value % 10)
}
