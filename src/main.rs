//! Zenith entry point
//!
//! On the web this only installs logging; the page constructs `WebGame`.
//! Natively it runs a headless scripted playthrough against an in-memory
//! progress store and logs the event stream.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).expect("Failed to init logger");
    log::info!("Zenith puzzle engine loaded");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Zenith (native) starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(2);
            }
        },
        None => zenith_puzzles::EngineConfig::load(),
    };

    demo::run(config);
}

#[cfg(not(target_arch = "wasm32"))]
fn load_config(path: &str) -> Result<zenith_puzzles::EngineConfig, String> {
    let json = std::fs::read_to_string(path).map_err(|e| format!("Cannot read {}: {}", path, e))?;
    zenith_puzzles::EngineConfig::from_json(&json).map_err(|e| format!("{}: {}", path, e))
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use zenith_puzzles::EngineConfig;
    use zenith_puzzles::persistence::{InMemoryProgressStore, LocalCache};
    use zenith_puzzles::platform::MemoryStorage;
    use zenith_puzzles::sim::{Coord, Phase, PlayerAction, Session, Stage, TickInput, tick};

    const FRAME_MS: u64 = 100;
    const SEED: u64 = 0x5EED;
    /// Give up waiting for a condition after this much virtual time
    const PATIENCE_MS: u64 = 120_000;

    struct Demo {
        session: Session,
        store: InMemoryProgressStore,
    }

    pub fn run(config: EngineConfig) {
        let cache = LocalCache::new(Box::new(MemoryStorage::new()), config.default_player.clone());
        let mut demo = Demo {
            session: Session::new(config, cache, SEED),
            store: InMemoryProgressStore::new(),
        };
        demo.pump();

        demo.explore();
        demo.act(PlayerAction::StartGame);

        // Level 1: rotation lock
        demo.explore();
        demo.act(PlayerAction::OpenPuzzle);
        demo.solve_lock();
        demo.act(PlayerAction::CheckLock);
        demo.wait_for(|s| s.stage() == Stage::Boiler);

        // Level 2: valves
        demo.explore();
        demo.act(PlayerAction::ExamineClue);
        demo.act(PlayerAction::OpenPuzzle);
        demo.solve_valves();
        demo.act(PlayerAction::ActivateValves);
        demo.wait_for(|s| s.phase() == Phase::Exploration);
        demo.act(PlayerAction::GoTo(Stage::Core));

        // Level 3: gear network
        demo.explore();
        demo.act(PlayerAction::OpenPuzzle);
        demo.solve_gears();
        demo.act(PlayerAction::RunGears);
        demo.wait_for(|s| s.stage() == Stage::Epilogue);

        demo.session.shutdown();
        demo.pump();

        let progress = demo.store.progress();
        log::info!(
            "Finished: level {}, {} gear, {} items, {}s played ({} remote calls)",
            progress.current_level,
            progress.total_gear,
            progress.collected.len(),
            demo.store.play_seconds(),
            demo.store.calls()
        );
    }

    impl Demo {
        fn pump(&mut self) {
            self.session.pump(&mut self.store);
            for event in self.session.drain_events() {
                log::info!("[{:>7} ms] {:?}", self.session.now(), event);
            }
        }

        fn step(&mut self, input: &TickInput) {
            tick(&mut self.session, input, FRAME_MS);
            self.pump();
        }

        fn act(&mut self, action: PlayerAction) {
            let outcome = self.session.apply(action);
            if !outcome.is_applied() {
                log::warn!("{:?} -> {:?}", action, outcome);
            }
            self.step(&TickInput::default());
        }

        fn wait_for(&mut self, done: impl Fn(&Session) -> bool) -> bool {
            let start = self.session.now();
            while !done(&self.session) {
                if self.session.now() - start > PATIENCE_MS {
                    log::warn!(
                        "Gave up waiting at {:?}/{:?}",
                        self.session.stage(),
                        self.session.phase()
                    );
                    return false;
                }
                self.step(&TickInput::default());
            }
            true
        }

        /// Wait out the intro, then pick up every gear the stage offers
        fn explore(&mut self) {
            self.wait_for(|s| s.phase() == Phase::Exploration);
            let level = self.session.stage().level();
            let start = self.session.now();
            while self
                .session
                .collectibles(level)
                .is_some_and(|c| !c.is_exhausted())
            {
                if self.session.now() - start > PATIENCE_MS {
                    log::warn!("Some gears on level {} were never collected", level);
                    break;
                }
                let input = TickInput {
                    actions: self
                        .session
                        .visible_items()
                        .iter()
                        .map(|item| PlayerAction::CollectItem(item.id))
                        .collect(),
                };
                self.step(&input);
            }
        }

        fn solve_lock(&mut self) {
            let clicks: Vec<(usize, u64)> = match self.session.lock() {
                Some(lock) => lock
                    .rings()
                    .iter()
                    .map(|ring| {
                        let offset = ring.angle % 360;
                        (ring.id, ((360 - offset) % 360) / ring.step())
                    })
                    .collect(),
                None => return,
            };
            for (ring, count) in clicks {
                for _ in 0..count {
                    self.act(PlayerAction::RotateRing(ring));
                }
            }
        }

        fn solve_valves(&mut self) {
            let Some(valves) = self.session.valves() else {
                return;
            };
            let target = self.session.config().valve_target;
            let tiles = valves.tiles().to_vec();
            let Some(mask) = (0u32..1u32 << tiles.len()).find(|&mask| {
                tiles
                    .iter()
                    .filter(|t| mask & (1u32 << t.id) != 0)
                    .map(|t| t.value)
                    .sum::<u32>()
                    == target
            }) else {
                log::warn!("No valve combination reaches {}", target);
                return;
            };
            for tile in tiles.iter().filter(|t| mask & (1u32 << t.id) != 0) {
                self.act(PlayerAction::ToggleValve(tile.id));
            }
        }

        /// Lay gears down the first column and along the bottom row
        fn solve_gears(&mut self) {
            let (rows, cols) = (self.session.config().gear_rows, self.session.config().gear_cols);
            let path = (1..rows)
                .map(|row| Coord::new(row, 0))
                .chain((1..cols - 1).map(|col| Coord::new(rows - 1, col)));
            for cell in path.collect::<Vec<_>>() {
                self.act(PlayerAction::ToggleGear(cell));
            }
        }
    }
}
