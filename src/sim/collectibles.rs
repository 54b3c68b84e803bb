//! Collectible spawn scheduler
//!
//! Each stage owns a fixed pool of gear items. While the stage is being
//! explored, one spawn cycle surfaces a random uncollected item every
//! 1.0-2.5 s for a short lifetime. Collected items are never offered again.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;
use rand_pcg::Pcg32;

use super::state::TimerEvent;
use super::timers::{TimerHandle, TimerQueue};
use crate::config::EngineConfig;
use crate::persistence::{ItemKey, PlayerProgress};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectibleItem {
    /// Unique within its stage
    pub id: u32,
    /// Normalized scene coordinate (0..1, top-left origin)
    pub position: Vec2,
    pub collected: bool,
}

/// Fixed item pool of a stage
pub fn stage_pool(level_id: u8) -> Vec<CollectibleItem> {
    let positions: &[(f32, f32)] = match level_id {
        1 => &[(0.30, 0.77), (0.70, 0.77), (0.10, 0.98)],
        2 => &[(0.30, 0.80), (0.90, 0.95), (0.40, 0.65)],
        3 => &[(0.30, 0.80), (0.90, 0.95)],
        _ => &[],
    };
    positions
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| CollectibleItem {
            id: i as u32 + 1,
            position: Vec2::new(x, y),
            collected: false,
        })
        .collect()
}

/// What a spawn timer did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnOutcome {
    Spawned(CollectibleItem),
    /// Scene hidden or item already showing; cycle re-armed
    Skipped,
    /// Pool exhausted; cycle stopped
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct SpawnScheduler {
    level_id: u8,
    items: Vec<CollectibleItem>,
    /// Pending spawn timer (at most one cycle per scene)
    cycle: Option<TimerHandle>,
    /// Visible items and their lifetime timers
    visible: BTreeMap<u32, TimerHandle>,
}

impl SpawnScheduler {
    pub fn new(level_id: u8) -> Self {
        Self {
            level_id,
            items: stage_pool(level_id),
            cycle: None,
            visible: BTreeMap::new(),
        }
    }

    pub fn level_id(&self) -> u8 {
        self.level_id
    }

    pub fn items(&self) -> &[CollectibleItem] {
        &self.items
    }

    pub fn is_running(&self) -> bool {
        self.cycle.is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.items.iter().all(|i| i.collected)
    }

    /// Items currently clickable
    pub fn visible(&self) -> impl Iterator<Item = &CollectibleItem> {
        self.items.iter().filter(|i| self.visible.contains_key(&i.id))
    }

    /// Mark items the player already owns. Never un-collects.
    pub fn sync_collected(&mut self, progress: &PlayerProgress) {
        for item in &mut self.items {
            if progress.is_collected(ItemKey::new(self.level_id, item.id)) {
                item.collected = true;
            }
        }
    }

    /// Arm the spawn cycle unless it is already live or nothing is left
    pub fn start(
        &mut self,
        timers: &mut TimerQueue<TimerEvent>,
        rng: &mut Pcg32,
        config: &EngineConfig,
    ) {
        if self.cycle.is_some() || self.is_exhausted() {
            return;
        }
        self.arm(timers, rng, config);
    }

    /// Cancel the cycle and hide every visible item
    pub fn stop(&mut self, timers: &mut TimerQueue<TimerEvent>) -> Vec<u32> {
        if let Some(handle) = self.cycle.take() {
            timers.cancel(handle);
        }
        let hidden: Vec<u32> = self.visible.keys().copied().collect();
        for (_, handle) in std::mem::take(&mut self.visible) {
            timers.cancel(handle);
        }
        hidden
    }

    /// Handle a spawn timer
    pub fn on_spawn_due(
        &mut self,
        timers: &mut TimerQueue<TimerEvent>,
        rng: &mut Pcg32,
        config: &EngineConfig,
        scene_visible: bool,
    ) -> SpawnOutcome {
        self.cycle = None;

        let available: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.collected)
            .map(|(i, _)| i)
            .collect();
        if available.is_empty() {
            log::debug!("Level {} pool exhausted, spawn cycle stopped", self.level_id);
            return SpawnOutcome::Exhausted;
        }

        self.arm(timers, rng, config);

        if !scene_visible {
            return SpawnOutcome::Skipped;
        }

        let Some(&index) = available.choose(rng) else {
            return SpawnOutcome::Skipped;
        };
        let item = self.items[index];
        if self.visible.contains_key(&item.id) {
            return SpawnOutcome::Skipped;
        }

        let handle = timers.schedule(
            config.item_lifetime_ms,
            TimerEvent::ItemExpired {
                level: self.level_id,
                item: item.id,
            },
        );
        self.visible.insert(item.id, handle);
        SpawnOutcome::Spawned(item)
    }

    /// Handle a lifetime timer. Returns true if the item was still showing.
    pub fn on_item_expired(&mut self, item_id: u32) -> bool {
        self.visible.remove(&item_id).is_some()
    }

    /// Collect a visible item. Rejected if it is not showing.
    pub fn collect(
        &mut self,
        item_id: u32,
        timers: &mut TimerQueue<TimerEvent>,
    ) -> Option<CollectibleItem> {
        let handle = self.visible.remove(&item_id)?;
        timers.cancel(handle);
        let item = self.items.iter_mut().find(|i| i.id == item_id)?;
        if item.collected {
            return None;
        }
        item.collected = true;
        Some(*item)
    }

    fn arm(&mut self, timers: &mut TimerQueue<TimerEvent>, rng: &mut Pcg32, config: &EngineConfig) {
        let delay = rng.random_range(config.spawn_interval_min_ms..=config.spawn_interval_max_ms);
        self.cycle = Some(timers.schedule(
            delay,
            TimerEvent::SpawnDue {
                level: self.level_id,
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    struct Fixture {
        timers: TimerQueue<TimerEvent>,
        rng: Pcg32,
        config: EngineConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                timers: TimerQueue::new(),
                rng: Pcg32::seed_from_u64(7),
                config: EngineConfig::default(),
            }
        }

        /// Fire the next timer, feeding spawn/expiry events to the scheduler
        fn step(&mut self, scheduler: &mut SpawnScheduler, visible: bool) -> Option<SpawnOutcome> {
            let (_, event) = self.timers.pop_due(u64::MAX)?;
            match event {
                TimerEvent::SpawnDue { .. } => Some(scheduler.on_spawn_due(
                    &mut self.timers,
                    &mut self.rng,
                    &self.config,
                    visible,
                )),
                TimerEvent::ItemExpired { item, .. } => {
                    scheduler.on_item_expired(item);
                    Some(SpawnOutcome::Skipped)
                }
                _ => None,
            }
        }
    }

    #[test]
    fn test_pools() {
        assert_eq!(stage_pool(1).len(), 3);
        assert_eq!(stage_pool(2).len(), 3);
        assert_eq!(stage_pool(3).len(), 2);
        assert!(stage_pool(0).is_empty());
    }

    #[test]
    fn test_spawn_interval_is_in_range() {
        let mut f = Fixture::new();
        let mut s = SpawnScheduler::new(1);
        s.start(&mut f.timers, &mut f.rng, &f.config);
        s.start(&mut f.timers, &mut f.rng, &f.config);
        assert_eq!(f.timers.len(), 1);

        let (_, event) = f.timers.pop_due(u64::MAX).unwrap();
        assert_eq!(event, TimerEvent::SpawnDue { level: 1 });
        assert!((1000..=2500).contains(&f.timers.now()));
    }

    #[test]
    fn test_collected_item_is_never_offered() {
        let mut f = Fixture::new();
        let mut s = SpawnScheduler::new(1);
        let mut progress = PlayerProgress::default();
        progress.record_pickup(ItemKey::new(1, 2));
        s.sync_collected(&progress);
        s.start(&mut f.timers, &mut f.rng, &f.config);

        for _ in 0..200 {
            if let Some(SpawnOutcome::Spawned(item)) = f.step(&mut s, true) {
                assert_ne!(item.id, 2);
            }
        }
    }

    #[test]
    fn test_collect_cancels_lifetime() {
        let mut f = Fixture::new();
        let mut s = SpawnScheduler::new(3);
        s.start(&mut f.timers, &mut f.rng, &f.config);
        let item = loop {
            if let Some(SpawnOutcome::Spawned(item)) = f.step(&mut s, true) {
                break item;
            }
        };
        let collected = s.collect(item.id, &mut f.timers).unwrap();
        assert!(collected.collected);
        assert!(s.collect(item.id, &mut f.timers).is_none());
        assert_eq!(s.visible().count(), 0);
    }

    #[test]
    fn test_cycle_stops_when_exhausted() {
        let mut f = Fixture::new();
        let mut s = SpawnScheduler::new(3);
        s.start(&mut f.timers, &mut f.rng, &f.config);
        let mut exhausted = false;
        for _ in 0..500 {
            match f.step(&mut s, true) {
                Some(SpawnOutcome::Spawned(item)) => {
                    s.collect(item.id, &mut f.timers);
                }
                Some(SpawnOutcome::Exhausted) => {
                    exhausted = true;
                    break;
                }
                _ => {}
            }
        }
        assert!(exhausted);
        assert!(!s.is_running());
        assert!(f.timers.is_empty());
    }

    #[test]
    fn test_hidden_scene_reschedules_without_spawning() {
        let mut f = Fixture::new();
        let mut s = SpawnScheduler::new(1);
        s.start(&mut f.timers, &mut f.rng, &f.config);
        assert_eq!(f.step(&mut s, false), Some(SpawnOutcome::Skipped));
        assert!(s.is_running());
        assert_eq!(s.visible().count(), 0);
    }

    #[test]
    fn test_stop_clears_everything() {
        let mut f = Fixture::new();
        let mut s = SpawnScheduler::new(1);
        s.start(&mut f.timers, &mut f.rng, &f.config);
        while !matches!(f.step(&mut s, true), Some(SpawnOutcome::Spawned(_))) {}
        let hidden = s.stop(&mut f.timers);
        assert_eq!(hidden.len(), 1);
        assert!(f.timers.is_empty());
        assert!(!s.is_running());
    }
}
