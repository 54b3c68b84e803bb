//! Valve sum: open the subset of valves that reaches the target pressure
//!
//! Values are tenths of a bar. Four planted valves sum exactly to the
//! target; four decoys are drawn independently and may collide with them.

use rand::Rng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::puzzle::{Puzzle, PuzzleContext, Verdict};
use super::state::{Failure, Stage};
use crate::consts::{
    VALVE_ADDEND_RANGE, VALVE_DECOY_RANGE, VALVE_DECOYS, VALVE_GRANULARITY, VALVE_SOLUTION_PARTS,
};
use crate::format_tenths;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveTile {
    /// Display index
    pub id: usize,
    /// Scaled value (tenths)
    pub value: u32,
    pub active: bool,
}

impl ValveTile {
    pub fn label(&self) -> String {
        format_tenths(self.value)
    }
}

/// Readout color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReadoutTone {
    Normal,
    /// Running total above target
    Over,
}

/// Needle gauge state after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gauge {
    pub total: u32,
    /// -90 (empty) to +90 (at or past the gauge scale)
    pub needle_degrees: f32,
    pub tone: ReadoutTone,
}

impl Gauge {
    pub fn new(total: u32, target: u32, scale: u32) -> Self {
        let needle = -90.0 + (total as f32 / scale as f32) * 180.0;
        Self {
            total,
            needle_degrees: needle.clamp(-90.0, 90.0),
            tone: if total > target {
                ReadoutTone::Over
            } else {
                ReadoutTone::Normal
            },
        }
    }

    pub fn readout(&self) -> String {
        format_tenths(self.total)
    }
}

fn draw(rng: &mut Pcg32, (lo, hi): (u32, u32)) -> u32 {
    rng.random_range(lo..hi) / VALVE_GRANULARITY * VALVE_GRANULARITY
}

/// Generate the eight valve values in display order.
///
/// The first `VALVE_SOLUTION_PARTS` values before shuffling are the planted
/// solution; the three drawn addends are redrawn until the remainder is
/// positive.
pub fn generate_values(rng: &mut Pcg32, target: u32) -> Vec<u32> {
    let mut values = loop {
        let addends: Vec<u32> = (0..VALVE_SOLUTION_PARTS - 1)
            .map(|_| draw(rng, VALVE_ADDEND_RANGE))
            .collect();
        let sum: u32 = addends.iter().sum();
        if sum < target {
            let mut parts = addends;
            parts.push(target - sum);
            break parts;
        }
    };
    values.extend((0..VALVE_DECOYS).map(|_| draw(rng, VALVE_DECOY_RANGE)));
    values.shuffle(rng);
    values
}

#[derive(Debug, Clone)]
pub struct ValveSum {
    tiles: Vec<ValveTile>,
    target: u32,
    gauge_scale: u32,
    solved: bool,
    /// "Pressure error" showing
    rejecting: bool,
}

impl ValveSum {
    pub fn from_values(values: &[u32], target: u32, gauge_scale: u32) -> Self {
        Self {
            tiles: values
                .iter()
                .enumerate()
                .map(|(id, &value)| ValveTile {
                    id,
                    value,
                    active: false,
                })
                .collect(),
            target,
            gauge_scale,
            solved: false,
            rejecting: false,
        }
    }

    pub fn tiles(&self) -> &[ValveTile] {
        &self.tiles
    }

    pub fn total(&self) -> u32 {
        self.tiles.iter().filter(|t| t.active).map(|t| t.value).sum()
    }

    pub fn gauge(&self) -> Gauge {
        Gauge::new(self.total(), self.target, self.gauge_scale)
    }

    pub fn is_rejecting(&self) -> bool {
        self.rejecting
    }
}

impl Puzzle for ValveSum {
    type Save = Vec<ValveTile>;
    /// Tile index
    type Move = usize;

    const CACHE_KEY: &'static str = "boiler_valves";
    const STAGE: Stage = Stage::Boiler;

    fn enter(saved: Option<Vec<ValveTile>>, solved: bool, ctx: &mut PuzzleContext<'_>) -> Self {
        let target = ctx.config.valve_target;
        let scale = ctx.config.valve_gauge_scale;
        let expected = VALVE_SOLUTION_PARTS + VALVE_DECOYS;

        let mut puzzle = match saved {
            Some(tiles) if tiles.len() == expected => Self {
                tiles: tiles
                    .into_iter()
                    .enumerate()
                    .map(|(id, t)| ValveTile { id, ..t })
                    .collect(),
                target,
                gauge_scale: scale,
                solved: false,
                rejecting: false,
            },
            _ => Self::from_values(&generate_values(ctx.rng, target), target, scale),
        };
        puzzle.solved = solved;
        puzzle
    }

    fn mutate(&mut self, tile: usize) -> bool {
        if self.solved {
            return false;
        }
        match self.tiles.get_mut(tile) {
            Some(t) => {
                t.active = !t.active;
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
        let total = self.total();
        if total == self.target {
            self.solved = true;
            Verdict::Solved
        } else {
            self.rejecting = true;
            Verdict::Rejected(Failure::WrongPressure { total })
        }
    }

    fn recover(&mut self) {
        self.rejecting = false;
    }

    fn is_solved(&self) -> bool {
        self.solved
    }

    fn save(&self) -> Vec<ValveTile> {
        self.tiles.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::consts::VALVE_TARGET;
    use proptest::prelude::*;
    use rand::SeedableRng;

    const SCENARIO: [u32; 8] = [150, 300, 200, 350, 80, 120, 90, 60];

    fn scenario() -> ValveSum {
        ValveSum::from_values(&SCENARIO, VALVE_TARGET, 1500)
    }

    #[test]
    fn test_planted_solution() {
        let mut valves = scenario();
        for i in 0..4 {
            valves.mutate(i);
        }
        assert_eq!(valves.total(), 1000);
        assert_eq!(valves.evaluate(), Verdict::Solved);
        assert!(!valves.mutate(5));
    }

    #[test]
    fn test_coincidental_solution() {
        // 350 + 300 + 200 + 90 + 60 = 1000
        let mut valves = scenario();
        for i in [3, 1, 2, 6, 7] {
            valves.mutate(i);
        }
        assert_eq!(valves.evaluate(), Verdict::Solved);
    }

    #[test]
    fn test_failure_keeps_tiles() {
        let mut valves = scenario();
        valves.mutate(0);
        valves.mutate(4);
        assert_eq!(
            valves.evaluate(),
            Verdict::Rejected(Failure::WrongPressure { total: 230 })
        );
        assert_eq!(valves.evaluate(), Verdict::Busy);
        // Toggling stays allowed during feedback
        assert!(valves.mutate(1));
        valves.recover();
        assert_eq!(valves.total(), 530);
    }

    #[test]
    fn test_gauge() {
        let g = Gauge::new(0, 1000, 1500);
        assert_eq!(g.needle_degrees, -90.0);
        assert_eq!(g.tone, ReadoutTone::Normal);

        let g = Gauge::new(750, 1000, 1500);
        assert!(g.needle_degrees.abs() < 1e-4);

        let g = Gauge::new(1005, 1000, 1500);
        assert_eq!(g.tone, ReadoutTone::Over);
        assert_eq!(g.readout(), "100.5");

        let g = Gauge::new(4000, 1000, 1500);
        assert_eq!(g.needle_degrees, 90.0);
    }

    #[test]
    fn test_saved_tiles_are_restored() {
        let config = EngineConfig::default();
        let mut rng = Pcg32::seed_from_u64(3);
        let mut saved = scenario().save();
        saved[2].active = true;
        let mut ctx = PuzzleContext {
            rng: &mut rng,
            config: &config,
            gear_collected: 0,
        };
        let valves = ValveSum::enter(Some(saved.clone()), false, &mut ctx);
        assert_eq!(valves.tiles(), saved.as_slice());
        assert_eq!(valves.total(), 200);
        assert_eq!(valves.tiles()[0].label(), "15.0");
    }

    #[test]
    fn test_short_save_regenerates() {
        let config = EngineConfig::default();
        let mut rng = Pcg32::seed_from_u64(3);
        let mut ctx = PuzzleContext {
            rng: &mut rng,
            config: &config,
            gear_collected: 0,
        };
        let saved = vec![ValveTile {
            id: 0,
            value: 1000,
            active: true,
        }];
        let valves = ValveSum::enter(Some(saved), false, &mut ctx);
        assert_eq!(valves.tiles().len(), 8);
        assert_eq!(valves.total(), 0);
    }

    proptest! {
        #[test]
        fn prop_generation_plants_exact_solution(seed in any::<u64>()) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let values = generate_values(&mut rng, VALVE_TARGET);
            prop_assert_eq!(values.len(), 8);
            for v in &values {
                prop_assert_eq!(v % VALVE_GRANULARITY, 0);
                prop_assert!(*v > 0);
            }

            // Some 4-subset sums to the target
            let found = (0u32..256)
                .filter(|mask| mask.count_ones() == 4)
                .any(|mask| {
                    values
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| mask & (1u32 << i) != 0)
                        .map(|(_, v)| v)
                        .sum::<u32>()
                        == VALVE_TARGET
                });
            prop_assert!(found);
        }
    }
}
