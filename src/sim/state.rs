//! Stage flow and session-wide types

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::gear_network::{Coord, NetworkFailure};
use super::valve_sum::Gauge;
use crate::consts::MAX_LEVEL;

/// The five stages, one per stored level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Narrative letter (level 0)
    Prologue,
    /// Rotation lock (level 1)
    Lock,
    /// Valve sum (level 2)
    Boiler,
    /// Gear network (level 3)
    Core,
    /// Game complete (level 4)
    Epilogue,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Prologue,
        Stage::Lock,
        Stage::Boiler,
        Stage::Core,
        Stage::Epilogue,
    ];

    pub fn level(self) -> u8 {
        match self {
            Stage::Prologue => 0,
            Stage::Lock => 1,
            Stage::Boiler => 2,
            Stage::Core => 3,
            Stage::Epilogue => 4,
        }
    }

    pub fn from_level(level: u8) -> Self {
        Self::ALL[level.min(MAX_LEVEL) as usize]
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Stage::Epilogue => None,
            s => Some(Self::from_level(s.level() + 1)),
        }
    }

    /// Stages that host a puzzle and collectibles
    pub fn has_puzzle(self) -> bool {
        matches!(self, Stage::Lock | Stage::Boiler | Stage::Core)
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::Prologue => "The Letter",
            Stage::Lock => "Level 1 - The Vault Door",
            Stage::Boiler => "Level 2 - The Boiler Room",
            Stage::Core => "Level 3 - The Core",
            Stage::Epilogue => "Epilogue",
        }
    }
}

/// Phase within a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Title card showing
    Intro,
    /// Walking around; collectibles spawn
    Exploration,
    /// Puzzle open; collectibles paused
    Puzzle,
    /// Post-success fade to the next stage
    Transition,
}

/// Ambient decoration of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneDecor {
    Normal,
    /// Boiler running after the valves were solved
    Completed,
}

/// Why a puzzle check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Failure {
    /// Some lock ring is off its reference angle
    Misaligned,
    /// Valve total is not the target
    WrongPressure { total: u32 },
    Network(NetworkFailure),
}

/// Everything the presentation layer reacts to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    StageEntered { stage: Stage, title: &'static str },
    PhaseChanged { phase: Phase },
    Dialogue { line: &'static str },
    InputBlocked { blocked: bool },
    DecorChanged { decor: SceneDecor },
    ProgressLoaded { level: u8, gear: u32 },

    ItemSpawned { item: u32, position: Vec2 },
    ItemExpired { item: u32 },
    GearCollected { item: u32, position: Vec2, feedback_ms: u64 },

    RingRotated { ring: usize, display_angle: u32 },
    ValveToggled { valve: usize, active: bool, gauge: Gauge },
    GearToggled { cell: Coord, placed: bool, inventory: u32 },

    PuzzleRejected { failure: Failure },
    /// Failure feedback is over; interaction is re-enabled
    FeedbackCleared,
    PuzzleSolved { stage: Stage },
    /// An already solved puzzle was checked again; progress is unchanged
    PuzzleReplayed { stage: Stage },

    GameCompleted,
    GameReset,
}

/// Everything that can be scheduled on the session clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    IntroDone,
    SpawnDue { level: u8 },
    ItemExpired { level: u8, item: u32 },
    FeedbackEnd,
    LockOpened,
    BoilerReturn,
    CoreVictory,
    /// Local play-time tick; also drives the periodic flush
    PlaytimeTick,
}

/// Per-session flags
#[derive(Debug, Clone, Default)]
pub struct SessionFlags {
    /// Stages whose one-time puzzle dialogue has been shown
    pub dialogue_shown: BTreeSet<Stage>,
    /// Boiler blackboard examined this session
    pub clue_examined: bool,
    /// Stages marked solved (cached per player)
    pub solved: BTreeSet<Stage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_levels() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_level(stage.level()), stage);
        }
        assert_eq!(Stage::from_level(200), Stage::Epilogue);
        assert_eq!(Stage::Core.next(), Some(Stage::Epilogue));
        assert_eq!(Stage::Epilogue.next(), None);
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let json = serde_json::to_value(GameEvent::InputBlocked { blocked: true }).unwrap();
        assert_eq!(json["type"], "InputBlocked");
        assert_eq!(json["blocked"], true);

        let json = serde_json::to_value(GameEvent::PuzzleRejected {
            failure: Failure::WrongPressure { total: 650 },
        })
        .unwrap();
        assert_eq!(json["failure"]["WrongPressure"]["total"], 650);

        let json = serde_json::to_value(GameEvent::GameReset).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "GameReset" }));
    }
}
