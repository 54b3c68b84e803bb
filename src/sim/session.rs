//! Game session
//!
//! Owns the stage flow, the open puzzle, collectible schedulers, the virtual
//! clock and the persistence bridge. Everything runs on one thread: player
//! actions and timer callbacks are applied one at a time.

use std::collections::{BTreeMap, BTreeSet};

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::collectibles::{CollectibleItem, SpawnOutcome, SpawnScheduler};
use super::gear_network::{CellRole, GearMove, GearNetwork};
use super::puzzle::{self, ActivePuzzle, Puzzle, PuzzleContext, Verdict};
use super::rotation_lock::RotationLock;
use super::state::{Failure, GameEvent, Phase, SceneDecor, SessionFlags, Stage, TimerEvent};
use super::tick::PlayerAction;
use super::timers::{TimerHandle, TimerQueue};
use super::valve_sum::ValveSum;
use crate::config::EngineConfig;
use crate::error::RemoteError;
use crate::persistence::{
    Completion, FlushReason, ItemKey, LocalCache, OutgoingRequest, PersistenceBridge,
    PlayerProgress, ProgressResponse, ProgressService, RequestId, SyncEvent,
};

/// Cache entry listing stages marked solved
pub const SOLVED_KEY: &str = "solved_stages";

mod lines {
    pub const LOCK_INTRO: &str = "Three rings of brass. Every symbol must return to its origin.";
    pub const BOILER_INTRO: &str = "The pressure must read exactly 100.0 BAR.";
    pub const BOILER_HINT: &str = "I should read the blackboard before touching those valves.";
    pub const BOILER_CLUE: &str = "Chalk on the board: \"Exactly one hundred. Not a breath more.\"";
    pub const CORE_INTRO: &str = "Connect the drive gear to the output. Gears that touch turn opposite ways.";
}

/// Why an action was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Progress not loaded yet
    NotBooted,
    /// Input-blocking overlay showing
    InputBlocked,
    WrongStage,
    WrongPhase,
    /// Stage not reached yet
    StageLocked,
    /// Boiler blackboard not examined
    ClueRequired,
    NotCollectible,
    InvalidMove,
    /// Feedback window in progress
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Rejected(RejectReason),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied)
    }
}

pub struct Session {
    config: EngineConfig,
    rng: Pcg32,
    timers: TimerQueue<TimerEvent>,
    bridge: PersistenceBridge,

    stage: Stage,
    phase: Phase,
    booted: bool,
    boot_request: Option<RequestId>,
    scene_visible: bool,
    input_blocked: bool,
    flags: SessionFlags,

    /// One scheduler per puzzle stage, kept for the whole session
    collectibles: BTreeMap<u8, SpawnScheduler>,
    puzzle: Option<ActivePuzzle>,
    /// Timers owned by the current scene; cancelled on every scene change
    scene_timers: Vec<(TimerHandle, TimerEvent)>,
    /// Sub-second remainder of local play time
    playtime_carry_ms: u64,
    playtime_since_flush_ms: u64,

    events: Vec<GameEvent>,
}

impl Session {
    /// Create a session and queue the boot progress load
    pub fn new(config: EngineConfig, cache: LocalCache, seed: u64) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::error!("Invalid engine config ({}), using defaults", e);
                EngineConfig::default()
            }
        };
        let bridge = PersistenceBridge::new(cache);
        let flags = SessionFlags {
            solved: bridge.load_or_init(SOLVED_KEY).unwrap_or_default(),
            ..Default::default()
        };

        let mut session = Self {
            rng: Pcg32::seed_from_u64(seed),
            timers: TimerQueue::new(),
            bridge,
            stage: Stage::Prologue,
            phase: Phase::Intro,
            booted: false,
            boot_request: None,
            scene_visible: true,
            input_blocked: false,
            flags,
            collectibles: BTreeMap::new(),
            puzzle: None,
            scene_timers: Vec::new(),
            playtime_carry_ms: 0,
            playtime_since_flush_ms: 0,
            events: Vec::new(),
            config,
        };
        session.rebuild_collectibles();
        session.boot_request = Some(session.bridge.request_load());
        session
            .timers
            .schedule(session.config.playtime_tick_ms, TimerEvent::PlaytimeTick);
        log::info!("Session started for `{}`", session.bridge.player());
        session
    }

    // === Queries ===

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    pub fn is_input_blocked(&self) -> bool {
        self.input_blocked
    }

    pub fn is_scene_visible(&self) -> bool {
        self.scene_visible
    }

    /// Virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.timers.now()
    }

    pub fn progress(&self) -> &PlayerProgress {
        self.bridge.progress()
    }

    pub fn unsent_play_seconds(&self) -> u32 {
        self.bridge.unsent_seconds()
    }

    pub fn is_solved(&self, stage: Stage) -> bool {
        stage.has_puzzle()
            && (self.progress().current_level > stage.level() || self.flags.solved.contains(&stage))
    }

    pub fn decor(&self) -> SceneDecor {
        if self.stage == Stage::Boiler && self.is_solved(Stage::Boiler) {
            SceneDecor::Completed
        } else {
            SceneDecor::Normal
        }
    }

    pub fn puzzle(&self) -> Option<&ActivePuzzle> {
        self.puzzle.as_ref()
    }

    pub fn lock(&self) -> Option<&RotationLock> {
        match &self.puzzle {
            Some(ActivePuzzle::Lock(p)) => Some(p),
            _ => None,
        }
    }

    pub fn valves(&self) -> Option<&ValveSum> {
        match &self.puzzle {
            Some(ActivePuzzle::Valves(p)) => Some(p),
            _ => None,
        }
    }

    pub fn gears(&self) -> Option<&GearNetwork> {
        match &self.puzzle {
            Some(ActivePuzzle::Gears(p)) => Some(p),
            _ => None,
        }
    }

    pub fn collectibles(&self, level_id: u8) -> Option<&SpawnScheduler> {
        self.collectibles.get(&level_id)
    }

    /// Items clickable right now
    pub fn visible_items(&self) -> Vec<CollectibleItem> {
        self.collectibles
            .get(&self.stage.level())
            .map(|s| s.visible().copied().collect())
            .unwrap_or_default()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // === Remote plumbing ===

    pub fn take_outgoing(&mut self) -> Vec<OutgoingRequest> {
        self.bridge.take_outgoing()
    }

    pub fn has_outgoing(&self) -> bool {
        self.bridge.has_outgoing()
    }

    /// Report the result of a remote call handed out by `take_outgoing`
    pub fn on_remote_response(
        &mut self,
        id: RequestId,
        result: Result<ProgressResponse, RemoteError>,
    ) {
        let Some(completion) = self.bridge.complete(id, result) else {
            return;
        };
        let is_boot = self.boot_request == Some(id);

        match completion {
            Completion::Loaded(snapshot) if is_boot => {
                self.boot_request = None;
                let level = snapshot.current_level;
                self.flags.solved.retain(|s| s.level() < level);
                self.bridge.save(SOLVED_KEY, &self.flags.solved);
                self.bridge.adopt_remote(snapshot);
                self.finish_boot();
            }
            Completion::LoadFailed(e) if is_boot => {
                self.boot_request = None;
                log::warn!(
                    "Remote progress unavailable ({}), continuing from local cache at level {}",
                    e,
                    self.progress().current_level
                );
                self.finish_boot();
            }
            Completion::Loaded(snapshot) => {
                self.bridge.merge_remote(&snapshot);
                self.sync_collectibles();
                self.emit_progress();
            }
            Completion::LoadFailed(_) | Completion::Acknowledged(_) | Completion::Failed(..) => {}
        }
    }

    /// Perform every queued call against a synchronous service
    pub fn pump<S: ProgressService + ?Sized>(&mut self, service: &mut S) {
        loop {
            let outgoing = self.take_outgoing();
            if outgoing.is_empty() {
                break;
            }
            for out in outgoing {
                let result = service.call(&out.request);
                self.on_remote_response(out.id, result);
            }
        }
    }

    /// Flush play time before the player leaves
    pub fn shutdown(&mut self) {
        self.bridge.sync_remote(SyncEvent::PlayTime(FlushReason::Logout));
        log::info!("Session for `{}` shut down", self.bridge.player());
    }

    // === Clock ===

    /// Advance the virtual clock, firing every timer that comes due
    pub fn advance(&mut self, dt_ms: u64) {
        let until = self.timers.now().saturating_add(dt_ms);
        while let Some((_, event)) = self.timers.pop_due(until) {
            self.on_timer(event);
        }
        self.timers.advance_to(until);
    }

    fn on_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::IntroDone => {
                self.set_phase(Phase::Exploration);
                self.start_collectibles();
            }
            TimerEvent::SpawnDue { level } => {
                if level != self.stage.level() || self.phase != Phase::Exploration {
                    return;
                }
                let Some(scheduler) = self.collectibles.get_mut(&level) else {
                    return;
                };
                let outcome = scheduler.on_spawn_due(
                    &mut self.timers,
                    &mut self.rng,
                    &self.config,
                    self.scene_visible,
                );
                if let SpawnOutcome::Spawned(item) = outcome {
                    self.events.push(GameEvent::ItemSpawned {
                        item: item.id,
                        position: item.position,
                    });
                }
            }
            TimerEvent::ItemExpired { level, item } => {
                let expired = self
                    .collectibles
                    .get_mut(&level)
                    .is_some_and(|s| s.on_item_expired(item));
                if expired {
                    self.events.push(GameEvent::ItemExpired { item });
                }
            }
            TimerEvent::FeedbackEnd => {
                if let Some(puzzle) = &mut self.puzzle {
                    puzzle.recover();
                }
                self.set_input_blocked(false);
                self.events.push(GameEvent::FeedbackCleared);
            }
            TimerEvent::LockOpened => {
                if let Some(next) = self.stage.next() {
                    self.enter_stage(next, true);
                }
            }
            TimerEvent::BoilerReturn => {
                if self.stage == Stage::Boiler && self.phase == Phase::Puzzle {
                    self.close_puzzle();
                }
            }
            TimerEvent::CoreVictory => self.enter_stage(Stage::Epilogue, true),
            TimerEvent::PlaytimeTick => {
                let tick = self.config.playtime_tick_ms;
                self.playtime_carry_ms += tick;
                let seconds = self.playtime_carry_ms / 1000;
                self.playtime_carry_ms %= 1000;
                self.bridge.tick_playtime(seconds as u32);

                self.playtime_since_flush_ms += tick;
                if self.playtime_since_flush_ms >= self.config.playtime_flush_ms {
                    self.playtime_since_flush_ms = 0;
                    self.bridge
                        .sync_remote(SyncEvent::PlayTime(FlushReason::Interval));
                }
                self.timers.schedule(tick, TimerEvent::PlaytimeTick);
            }
        }
    }

    // === Player actions ===

    pub fn apply(&mut self, action: PlayerAction) -> ActionOutcome {
        if let PlayerAction::SetSceneVisible(visible) = action {
            self.scene_visible = visible;
            return ActionOutcome::Applied;
        }

        let result = if !self.booted {
            Err(RejectReason::NotBooted)
        } else if self.input_blocked {
            Err(RejectReason::InputBlocked)
        } else {
            self.dispatch(action)
        };

        match result {
            Ok(()) => ActionOutcome::Applied,
            Err(reason) => {
                log::debug!("Ignored {:?}: {:?}", action, reason);
                ActionOutcome::Rejected(reason)
            }
        }
    }

    fn dispatch(&mut self, action: PlayerAction) -> Result<(), RejectReason> {
        match action {
            PlayerAction::StartGame => {
                self.require(Stage::Prologue, Phase::Exploration)?;
                self.bridge.sync_remote(SyncEvent::LevelAdvanced(1));
                self.enter_stage(Stage::Lock, true);
            }
            PlayerAction::GoTo(target) => self.go_to(target)?,
            PlayerAction::OpenPuzzle => self.open_puzzle()?,
            PlayerAction::LeavePuzzle => {
                if self.phase != Phase::Puzzle {
                    return Err(RejectReason::WrongPhase);
                }
                self.close_puzzle();
            }
            PlayerAction::ExamineClue => {
                self.require(Stage::Boiler, Phase::Exploration)?;
                self.flags.clue_examined = true;
                self.events.push(GameEvent::Dialogue {
                    line: lines::BOILER_CLUE,
                });
            }
            PlayerAction::CollectItem(item_id) => self.collect(item_id)?,
            PlayerAction::RotateRing(ring) => {
                let Some(ActivePuzzle::Lock(lock)) = &mut self.puzzle else {
                    return Err(RejectReason::WrongStage);
                };
                if !lock.mutate(ring) {
                    return Err(RejectReason::InvalidMove);
                }
                let display_angle = lock.rings()[ring].display_angle();
                puzzle::persist(lock, &mut self.bridge);
                self.events.push(GameEvent::RingRotated {
                    ring,
                    display_angle,
                });
            }
            PlayerAction::ToggleValve(valve) => {
                let Some(ActivePuzzle::Valves(valves)) = &mut self.puzzle else {
                    return Err(RejectReason::WrongStage);
                };
                if !valves.mutate(valve) {
                    return Err(RejectReason::InvalidMove);
                }
                let active = valves.tiles()[valve].active;
                let gauge = valves.gauge();
                puzzle::persist(valves, &mut self.bridge);
                self.events.push(GameEvent::ValveToggled {
                    valve,
                    active,
                    gauge,
                });
            }
            PlayerAction::ToggleGear(cell) => {
                let Some(ActivePuzzle::Gears(gears)) = &mut self.puzzle else {
                    return Err(RejectReason::WrongStage);
                };
                if !gears.mutate(GearMove::Toggle(cell)) {
                    return Err(RejectReason::InvalidMove);
                }
                let placed = gears
                    .grid()
                    .cell(cell)
                    .is_some_and(|c| c.role == CellRole::Placed);
                let inventory = gears.inventory();
                puzzle::persist(gears, &mut self.bridge);
                self.events.push(GameEvent::GearToggled {
                    cell,
                    placed,
                    inventory,
                });
            }
            PlayerAction::CheckLock => self.evaluate(Stage::Lock)?,
            PlayerAction::ActivateValves => self.evaluate(Stage::Boiler)?,
            PlayerAction::RunGears => self.evaluate(Stage::Core)?,
            PlayerAction::ResetGame => {
                if self.stage != Stage::Epilogue {
                    return Err(RejectReason::WrongStage);
                }
                self.reset();
            }
            PlayerAction::SetSceneVisible(_) => {}
        }
        Ok(())
    }

    fn require(&self, stage: Stage, phase: Phase) -> Result<(), RejectReason> {
        if self.stage != stage {
            Err(RejectReason::WrongStage)
        } else if self.phase != phase {
            Err(RejectReason::WrongPhase)
        } else {
            Ok(())
        }
    }

    fn go_to(&mut self, target: Stage) -> Result<(), RejectReason> {
        if self.phase != Phase::Exploration {
            return Err(RejectReason::WrongPhase);
        }
        if target == self.stage {
            return Err(RejectReason::InvalidMove);
        }

        let boiler_to_core = self.stage == Stage::Boiler && target == Stage::Core;
        if boiler_to_core {
            if !self.is_solved(Stage::Boiler) {
                return Err(RejectReason::StageLocked);
            }
            // No-op once the valves have already raised the level
            self.bridge
                .sync_remote(SyncEvent::LevelAdvanced(Stage::Core.level()));
        } else if target.level() > self.progress().current_level {
            return Err(RejectReason::StageLocked);
        }

        self.enter_stage(target, true);
        Ok(())
    }

    fn open_puzzle(&mut self) -> Result<(), RejectReason> {
        if !self.stage.has_puzzle() {
            return Err(RejectReason::WrongStage);
        }
        if self.phase != Phase::Exploration {
            return Err(RejectReason::WrongPhase);
        }
        if self.stage == Stage::Boiler && !self.flags.clue_examined {
            self.events.push(GameEvent::Dialogue {
                line: lines::BOILER_HINT,
            });
            return Err(RejectReason::ClueRequired);
        }

        self.stop_collectibles();

        let stage = self.stage;
        let solved = self.is_solved(stage);
        let mut ctx = PuzzleContext {
            rng: &mut self.rng,
            config: &self.config,
            gear_collected: self.bridge.progress().total_gear,
        };
        self.puzzle = ActivePuzzle::open(stage, &mut self.bridge, solved, &mut ctx);
        self.set_phase(Phase::Puzzle);

        if self.flags.dialogue_shown.insert(stage) {
            let line = match stage {
                Stage::Lock => lines::LOCK_INTRO,
                Stage::Boiler => lines::BOILER_INTRO,
                _ => lines::CORE_INTRO,
            };
            self.events.push(GameEvent::Dialogue { line });
        }

        if stage == Stage::Boiler && solved {
            self.schedule_scene(self.config.valve_return_ms, TimerEvent::BoilerReturn);
        }
        Ok(())
    }

    fn close_puzzle(&mut self) {
        self.cancel_scene_timers();
        if let Some(puzzle) = self.puzzle.take() {
            puzzle.persist(&mut self.bridge);
        }
        self.set_input_blocked(false);
        self.set_phase(Phase::Exploration);
        self.start_collectibles();
    }

    fn collect(&mut self, item_id: u32) -> Result<(), RejectReason> {
        if self.phase != Phase::Exploration {
            return Err(RejectReason::WrongPhase);
        }
        let level = self.stage.level();
        let item = self
            .collectibles
            .get_mut(&level)
            .and_then(|s| s.collect(item_id, &mut self.timers))
            .ok_or(RejectReason::NotCollectible)?;

        self.bridge
            .sync_remote(SyncEvent::GearPickup(ItemKey::new(level, item.id)));
        log::info!("Collected gear {} on level {}", item.id, level);
        self.events.push(GameEvent::GearCollected {
            item: item.id,
            position: item.position,
            feedback_ms: self.config.pickup_feedback_ms,
        });
        Ok(())
    }

    fn evaluate(&mut self, stage: Stage) -> Result<(), RejectReason> {
        let puzzle = self
            .puzzle
            .as_mut()
            .filter(|p| p.stage() == stage)
            .ok_or(RejectReason::WrongStage)?;
        let verdict = puzzle.evaluate();

        match verdict {
            Verdict::Busy => return Err(RejectReason::Busy),
            Verdict::Rejected(failure) => self.on_failure(stage, failure),
            Verdict::Solved => {
                log::info!("{:?} puzzle solved", stage);
                self.flags.solved.insert(stage);
                self.bridge.save(SOLVED_KEY, &self.flags.solved);
                if let Some(puzzle) = &self.puzzle {
                    puzzle.persist(&mut self.bridge);
                }
                self.events.push(GameEvent::PuzzleSolved { stage });
                self.on_success(stage, true);
            }
            Verdict::Replay => {
                self.events.push(GameEvent::PuzzleReplayed { stage });
                self.on_success(stage, false);
            }
        }
        Ok(())
    }

    fn on_failure(&mut self, stage: Stage, failure: Failure) {
        self.events.push(GameEvent::PuzzleRejected { failure });
        let feedback_ms = match stage {
            Stage::Lock => {
                self.set_input_blocked(true);
                self.config.lock_feedback_ms
            }
            Stage::Boiler => self.config.valve_feedback_ms,
            _ => self.config.gear_failure_ms,
        };
        self.schedule_scene(feedback_ms, TimerEvent::FeedbackEnd);
    }

    /// Success flow; `first` is false when replaying an earlier success
    fn on_success(&mut self, stage: Stage, first: bool) {
        match stage {
            Stage::Lock => {
                if first {
                    self.bridge
                        .sync_remote(SyncEvent::LevelAdvanced(Stage::Boiler.level()));
                }
                self.set_input_blocked(true);
                self.set_phase(Phase::Transition);
                let delay = self.config.lock_success_delay_ms + self.config.lock_fade_ms;
                self.schedule_scene(delay, TimerEvent::LockOpened);
            }
            Stage::Boiler => {
                if first {
                    self.bridge
                        .sync_remote(SyncEvent::LevelAdvanced(Stage::Core.level()));
                    self.events.push(GameEvent::DecorChanged {
                        decor: SceneDecor::Completed,
                    });
                }
                self.schedule_scene(self.config.valve_return_ms, TimerEvent::BoilerReturn);
            }
            _ => {
                if first {
                    self.bridge
                        .sync_remote(SyncEvent::LevelAdvanced(Stage::Epilogue.level()));
                }
                self.set_phase(Phase::Transition);
                self.schedule_scene(self.config.gear_victory_ms, TimerEvent::CoreVictory);
            }
        }
    }

    // === Stage flow ===

    fn finish_boot(&mut self) {
        self.booted = true;
        self.sync_collectibles();
        self.emit_progress();
        let stage = Stage::from_level(self.progress().current_level);
        self.enter_stage(stage, false);
    }

    fn enter_stage(&mut self, stage: Stage, refresh: bool) {
        self.cancel_scene_timers();
        self.stop_collectibles();
        if let Some(puzzle) = self.puzzle.take() {
            puzzle.persist(&mut self.bridge);
        }
        self.set_input_blocked(false);

        log::info!("Entering {:?}", stage);
        self.stage = stage;
        self.events.push(GameEvent::StageEntered {
            stage,
            title: stage.title(),
        });
        self.set_phase(Phase::Intro);
        if stage == Stage::Boiler {
            self.events.push(GameEvent::DecorChanged {
                decor: self.decor(),
            });
        }
        if stage == Stage::Epilogue {
            self.events.push(GameEvent::GameCompleted);
        }
        self.schedule_scene(self.config.stage_intro_ms, TimerEvent::IntroDone);

        if refresh {
            self.bridge.request_load();
        }
    }

    fn reset(&mut self) {
        self.bridge.reset();
        self.flags = SessionFlags::default();
        self.rebuild_collectibles();
        self.events.push(GameEvent::GameReset);
        self.enter_stage(Stage::Prologue, false);
    }

    // === Helpers ===

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            self.phase = phase;
            self.events.push(GameEvent::PhaseChanged { phase });
        }
    }

    fn set_input_blocked(&mut self, blocked: bool) {
        if self.input_blocked != blocked {
            self.input_blocked = blocked;
            self.events.push(GameEvent::InputBlocked { blocked });
        }
    }

    /// Schedule a scene timer unless the same event is already pending
    fn schedule_scene(&mut self, delay_ms: u64, event: TimerEvent) {
        let timers = &self.timers;
        self.scene_timers.retain(|(h, _)| timers.is_pending(*h));
        if self.scene_timers.iter().any(|(_, e)| *e == event) {
            return;
        }
        let handle = self.timers.schedule(delay_ms, event);
        self.scene_timers.push((handle, event));
    }

    fn cancel_scene_timers(&mut self) {
        for (handle, _) in self.scene_timers.drain(..) {
            self.timers.cancel(handle);
        }
    }

    fn start_collectibles(&mut self) {
        if self.phase != Phase::Exploration {
            return;
        }
        if let Some(scheduler) = self.collectibles.get_mut(&self.stage.level()) {
            scheduler.start(&mut self.timers, &mut self.rng, &self.config);
        }
    }

    fn stop_collectibles(&mut self) {
        let Some(scheduler) = self.collectibles.get_mut(&self.stage.level()) else {
            return;
        };
        for item in scheduler.stop(&mut self.timers) {
            self.events.push(GameEvent::ItemExpired { item });
        }
    }

    fn rebuild_collectibles(&mut self) {
        self.collectibles = [Stage::Lock, Stage::Boiler, Stage::Core]
            .into_iter()
            .map(|s| (s.level(), SpawnScheduler::new(s.level())))
            .collect();
        self.sync_collectibles();
    }

    fn sync_collectibles(&mut self) {
        let progress = self.bridge.progress();
        for scheduler in self.collectibles.values_mut() {
            scheduler.sync_collected(progress);
        }
    }

    fn emit_progress(&mut self) {
        let progress = self.progress();
        let event = GameEvent::ProgressLoaded {
            level: progress.current_level,
            gear: progress.total_gear,
        };
        self.events.push(event);
    }

    /// Stages marked solved this session or loaded from cache
    pub fn solved_flags(&self) -> &BTreeSet<Stage> {
        &self.flags.solved
    }
}
