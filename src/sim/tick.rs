//! Frame step
//!
//! Applies the player actions gathered during a frame, then advances the
//! session clock.

use super::gear_network::Coord;
use super::session::Session;
use super::state::Stage;

/// A single point-and-click gesture, already resolved to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    /// Read the letter and begin (prologue only)
    StartGame,
    /// Walk through a door to another stage
    GoTo(Stage),
    OpenPuzzle,
    LeavePuzzle,
    /// Read the boiler-room blackboard
    ExamineClue,
    CollectItem(u32),
    RotateRing(usize),
    CheckLock,
    ToggleValve(usize),
    ActivateValves,
    ToggleGear(Coord),
    RunGears,
    /// Start over from the epilogue
    ResetGame,
    /// Tab shown or hidden
    SetSceneVisible(bool),
}

/// Input commands for a single frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub actions: Vec<PlayerAction>,
}

impl TickInput {
    pub fn single(action: PlayerAction) -> Self {
        Self {
            actions: vec![action],
        }
    }
}

/// Advance the session by one frame of `dt_ms` milliseconds
pub fn tick(session: &mut Session, input: &TickInput, dt_ms: u64) {
    for &action in &input.actions {
        session.apply(action);
    }
    session.advance(dt_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::persistence::{InMemoryProgressStore, LocalCache};
    use crate::platform::MemoryStorage;
    use crate::sim::state::Phase;

    #[test]
    fn test_tick_applies_actions_then_time() {
        let mut store = InMemoryProgressStore::new();
        let cache = LocalCache::new(Box::new(MemoryStorage::new()), "ada");
        let mut session = Session::new(EngineConfig::default(), cache, 5);
        session.pump(&mut store);

        let intro = session.config().stage_intro_ms;
        tick(&mut session, &TickInput::default(), intro);
        assert_eq!(session.phase(), Phase::Exploration);

        tick(&mut session, &TickInput::single(PlayerAction::StartGame), 16);
        assert_eq!(session.stage(), Stage::Lock);
        assert_eq!(session.now(), intro + 16);
    }
}
