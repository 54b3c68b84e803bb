//! Shared puzzle lifecycle
//!
//! Every puzzle is entered (fresh, restored from cache, or forced solved),
//! mutated by player moves, and evaluated by an explicit check action.

use rand_pcg::Pcg32;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::gear_network::GearNetwork;
use super::rotation_lock::RotationLock;
use super::state::{Failure, Stage};
use super::valve_sum::ValveSum;
use crate::config::EngineConfig;
use crate::persistence::PersistenceBridge;

/// What a puzzle needs when it is entered
pub struct PuzzleContext<'a> {
    pub rng: &'a mut Pcg32,
    pub config: &'a EngineConfig,
    /// Total gear collected by the player
    pub gear_collected: u32,
}

/// Result of a check/activate action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// First success: advance progress
    Solved,
    /// Already solved earlier; replay the success flow only
    Replay,
    /// Wrong answer; timed feedback follows
    Rejected(Failure),
    /// Feedback or lockout in progress
    Busy,
}

pub trait Puzzle: Sized {
    /// Cached working state
    type Save: Serialize + DeserializeOwned;
    /// A single player move
    type Move: Copy;

    const CACHE_KEY: &'static str;
    const STAGE: Stage;

    fn enter(saved: Option<Self::Save>, solved: bool, ctx: &mut PuzzleContext<'_>) -> Self;

    /// Apply a move. Returns false (and changes nothing) if it is not allowed.
    fn mutate(&mut self, mv: Self::Move) -> bool;

    fn evaluate(&mut self) -> Verdict;

    /// End failure feedback and re-enable interaction
    fn recover(&mut self);

    fn is_solved(&self) -> bool;

    fn save(&self) -> Self::Save;
}

/// Restore or create a puzzle from the player's cache
pub fn open<P: Puzzle>(
    bridge: &mut PersistenceBridge,
    solved: bool,
    ctx: &mut PuzzleContext<'_>,
) -> P {
    let saved = bridge.load_or_init::<P::Save>(P::CACHE_KEY);
    let puzzle = P::enter(saved, solved, ctx);
    persist(&puzzle, bridge);
    puzzle
}

pub fn persist<P: Puzzle>(puzzle: &P, bridge: &mut PersistenceBridge) {
    bridge.save(P::CACHE_KEY, &puzzle.save());
}

/// The one puzzle currently open
#[derive(Debug, Clone)]
pub enum ActivePuzzle {
    Lock(RotationLock),
    Valves(ValveSum),
    Gears(GearNetwork),
}

impl ActivePuzzle {
    pub fn open(
        stage: Stage,
        bridge: &mut PersistenceBridge,
        solved: bool,
        ctx: &mut PuzzleContext<'_>,
    ) -> Option<Self> {
        Some(match stage {
            Stage::Lock => ActivePuzzle::Lock(open(bridge, solved, ctx)),
            Stage::Boiler => ActivePuzzle::Valves(open(bridge, solved, ctx)),
            Stage::Core => ActivePuzzle::Gears(open(bridge, solved, ctx)),
            Stage::Prologue | Stage::Epilogue => return None,
        })
    }

    pub fn stage(&self) -> Stage {
        match self {
            ActivePuzzle::Lock(_) => RotationLock::STAGE,
            ActivePuzzle::Valves(_) => ValveSum::STAGE,
            ActivePuzzle::Gears(_) => GearNetwork::STAGE,
        }
    }

    pub fn evaluate(&mut self) -> Verdict {
        match self {
            ActivePuzzle::Lock(p) => p.evaluate(),
            ActivePuzzle::Valves(p) => p.evaluate(),
            ActivePuzzle::Gears(p) => p.evaluate(),
        }
    }

    pub fn recover(&mut self) {
        match self {
            ActivePuzzle::Lock(p) => p.recover(),
            ActivePuzzle::Valves(p) => p.recover(),
            ActivePuzzle::Gears(p) => p.recover(),
        }
    }

    pub fn is_solved(&self) -> bool {
        match self {
            ActivePuzzle::Lock(p) => p.is_solved(),
            ActivePuzzle::Valves(p) => p.is_solved(),
            ActivePuzzle::Gears(p) => p.is_solved(),
        }
    }

    pub fn persist(&self, bridge: &mut PersistenceBridge) {
        match self {
            ActivePuzzle::Lock(p) => persist(p, bridge),
            ActivePuzzle::Valves(p) => persist(p, bridge),
            ActivePuzzle::Gears(p) => persist(p, bridge),
        }
    }
}
