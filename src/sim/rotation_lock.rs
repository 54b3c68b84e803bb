//! Rotation lock: three concentric symbol rings
//!
//! A ring with `n` symbols turns by `360 / n` degrees per click. Angles
//! accumulate without wrapping; the lock opens when every ring sits on a
//! multiple of 360.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::puzzle::{Puzzle, PuzzleContext, Verdict};
use super::state::{Failure, Stage};
use crate::consts::FULL_TURN;
use crate::wrap_degrees;

/// Outer ring: eight alchemical symbols
pub const OUTER_SYMBOLS: &[&str] = &["☉", "☽", "☿", "♀", "♂", "♃", "♄", "⚶"];
/// Middle ring: roman numerals
pub const MIDDLE_SYMBOLS: &[&str] = &["I", "II", "III", "IV", "V", "VI"];
/// Inner ring: four glyphs
pub const INNER_SYMBOLS: &[&str] = &["▲", "◆", "●", "■"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    pub id: usize,
    pub symbols: &'static [&'static str],
    /// Unbounded accumulated angle
    pub angle: u64,
}

impl Ring {
    pub fn new(id: usize, symbols: &'static [&'static str]) -> Self {
        Self { id, symbols, angle: 0 }
    }

    /// Degrees per click
    pub fn step(&self) -> u64 {
        FULL_TURN / self.symbols.len() as u64
    }

    pub fn rotate(&mut self) {
        self.angle += self.step();
    }

    pub fn is_aligned(&self) -> bool {
        self.angle % FULL_TURN == 0
    }

    /// Rotation shown on screen
    pub fn display_angle(&self) -> u32 {
        wrap_degrees(self.angle)
    }
}

/// Cached ring angles, outer to inner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSave {
    pub angles: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct RotationLock {
    rings: Vec<Ring>,
    solved: bool,
    /// Failure feedback showing
    rejecting: bool,
}

impl RotationLock {
    pub fn with_rings(rings: Vec<Ring>) -> Self {
        Self {
            rings,
            solved: false,
            rejecting: false,
        }
    }

    fn default_rings() -> Vec<Ring> {
        vec![
            Ring::new(0, OUTER_SYMBOLS),
            Ring::new(1, MIDDLE_SYMBOLS),
            Ring::new(2, INNER_SYMBOLS),
        ]
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn is_rejecting(&self) -> bool {
        self.rejecting
    }

    pub fn all_aligned(&self) -> bool {
        self.rings.iter().all(Ring::is_aligned)
    }
}

impl Puzzle for RotationLock {
    type Save = LockSave;
    /// Ring index
    type Move = usize;

    const CACHE_KEY: &'static str = "lock_rings";
    const STAGE: Stage = Stage::Lock;

    fn enter(saved: Option<LockSave>, solved: bool, ctx: &mut PuzzleContext<'_>) -> Self {
        let mut lock = Self::with_rings(Self::default_rings());
        if solved {
            lock.solved = true;
            return lock;
        }

        match saved {
            Some(save) if save.angles.len() == lock.rings.len() => {
                for (ring, angle) in lock.rings.iter_mut().zip(save.angles) {
                    ring.angle = angle;
                }
            }
            _ => {
                for ring in &mut lock.rings {
                    let clicks = ctx.rng.random_range(0..ring.symbols.len() as u64);
                    ring.angle = clicks * ring.step();
                }
            }
        }
        lock
    }

    fn mutate(&mut self, ring: usize) -> bool {
        if self.solved || self.rejecting {
            return false;
        }
        match self.rings.get_mut(ring) {
            Some(r) => {
                r.rotate();
                true
            }
            None => false,
        }
    }

    fn evaluate(&mut self) -> Verdict {
        if self.solved {
            return Verdict::Replay;
        }
        if self.rejecting {
            return Verdict::Busy;
        }
        if self.all_aligned() {
            self.solved = true;
            Verdict::Solved
        } else {
            self.rejecting = true;
            Verdict::Rejected(Failure::Misaligned)
        }
    }

    fn recover(&mut self) {
        self.rejecting = false;
    }

    fn is_solved(&self) -> bool {
        self.solved
    }

    fn save(&self) -> LockSave {
        LockSave {
            angles: self.rings.iter().map(|r| r.angle).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn enter(saved: Option<LockSave>, solved: bool) -> RotationLock {
        let config = EngineConfig::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut ctx = PuzzleContext {
            rng: &mut rng,
            config: &config,
            gear_collected: 0,
        };
        RotationLock::enter(saved, solved, &mut ctx)
    }

    #[test]
    fn test_ring_steps() {
        let lock = enter(None, false);
        let steps: Vec<u64> = lock.rings().iter().map(Ring::step).collect();
        assert_eq!(steps, vec![45, 60, 90]);
    }

    #[test]
    fn test_fresh_angles_are_multiples_of_step() {
        for seed in 0..20 {
            let config = EngineConfig::default();
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut ctx = PuzzleContext {
                rng: &mut rng,
                config: &config,
                gear_collected: 0,
            };
            let lock = RotationLock::enter(None, false, &mut ctx);
            for ring in lock.rings() {
                assert_eq!(ring.angle % ring.step(), 0);
                assert!(ring.angle < FULL_TURN);
            }
        }
    }

    #[test]
    fn test_clicks_until_open() {
        let mut lock = enter(
            Some(LockSave {
                angles: vec![0, 0, 0],
            }),
            false,
        );
        for ring in 0..3 {
            lock.mutate(ring);
        }
        let angles: Vec<u64> = lock.rings().iter().map(|r| r.angle).collect();
        assert_eq!(angles, vec![45, 60, 90]);
        assert_eq!(lock.evaluate(), Verdict::Rejected(Failure::Misaligned));

        // Rings are blocked until the feedback ends
        assert!(!lock.mutate(0));
        assert_eq!(lock.evaluate(), Verdict::Busy);
        lock.recover();

        for (ring, clicks) in [(0, 7), (1, 5), (2, 3)] {
            for _ in 0..clicks {
                assert!(lock.mutate(ring));
            }
        }
        assert_eq!(lock.rings()[0].angle, 360);
        assert_eq!(lock.evaluate(), Verdict::Solved);
        assert!(!lock.mutate(0));
        assert_eq!(lock.evaluate(), Verdict::Replay);
    }

    #[test]
    fn test_angles_accumulate_past_full_turn() {
        let mut lock = enter(
            Some(LockSave {
                angles: vec![360, 0, 0],
            }),
            false,
        );
        lock.mutate(0);
        assert_eq!(lock.rings()[0].angle, 405);
        assert_eq!(lock.rings()[0].display_angle(), 45);
        assert_eq!(lock.save().angles, vec![405, 0, 0]);
    }

    #[test]
    fn test_solved_forces_reference_angle() {
        let lock = enter(
            Some(LockSave {
                angles: vec![45, 60, 90],
            }),
            true,
        );
        assert!(lock.is_solved());
        assert!(lock.all_aligned());
    }

    #[test]
    fn test_bad_save_is_ignored() {
        let lock = enter(Some(LockSave { angles: vec![45] }), false);
        assert_eq!(lock.rings().len(), 3);
    }

    proptest! {
        #[test]
        fn prop_open_iff_all_aligned(a in 0u64..5000, b in 0u64..5000, c in 0u64..5000) {
            let mut lock = RotationLock::with_rings(vec![
                Ring { id: 0, symbols: OUTER_SYMBOLS, angle: a * 45 },
                Ring { id: 1, symbols: MIDDLE_SYMBOLS, angle: b * 60 },
                Ring { id: 2, symbols: INNER_SYMBOLS, angle: c * 90 },
            ]);
            let expected = (a * 45) % 360 == 0 && (b * 60) % 360 == 0 && (c * 90) % 360 == 0;
            prop_assert_eq!(lock.evaluate() == Verdict::Solved, expected);
        }
    }
}
