//! Player progress (the remote-synced record)

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::consts::MAX_LEVEL;

/// A collected item, unique per (level, item)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub level_id: u8,
    pub item_id: u32,
}

impl ItemKey {
    pub fn new(level_id: u8, item_id: u32) -> Self {
        Self { level_id, item_id }
    }
}

/// Level, gear count and collected items.
///
/// All three only grow during play; only an explicit reset shrinks them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProgress {
    pub current_level: u8,
    pub total_gear: u32,
    pub collected: BTreeSet<ItemKey>,
}

impl PlayerProgress {
    /// Raise the level (never lowers it). Returns true if it changed.
    pub fn advance_to(&mut self, level: u8) -> bool {
        let level = level.min(MAX_LEVEL);
        if level > self.current_level {
            self.current_level = level;
            true
        } else {
            false
        }
    }

    /// Record a pickup; a repeated key neither re-adds nor bumps the gear count
    pub fn record_pickup(&mut self, key: ItemKey) -> bool {
        if self.collected.insert(key) {
            self.total_gear += 1;
            true
        } else {
            false
        }
    }

    pub fn is_collected(&self, key: ItemKey) -> bool {
        self.collected.contains(&key)
    }

    /// Monotonic merge used while playing: nothing local is lost
    pub fn merge(&mut self, other: &PlayerProgress) {
        self.advance_to(other.current_level);
        self.total_gear = self.total_gear.max(other.total_gear);
        self.collected.extend(other.collected.iter().copied());
    }

    /// Item ids collected on one level
    pub fn collected_on(&self, level_id: u8) -> impl Iterator<Item = u32> + '_ {
        self.collected
            .iter()
            .filter(move |k| k.level_id == level_id)
            .map(|k| k.item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_is_monotonic() {
        let mut p = PlayerProgress::default();
        assert!(p.advance_to(2));
        assert!(!p.advance_to(1));
        assert_eq!(p.current_level, 2);
        assert!(p.advance_to(9));
        assert_eq!(p.current_level, MAX_LEVEL);
    }

    #[test]
    fn test_duplicate_pickup_is_ignored() {
        let mut p = PlayerProgress::default();
        assert!(p.record_pickup(ItemKey::new(1, 2)));
        assert!(!p.record_pickup(ItemKey::new(1, 2)));
        assert_eq!(p.total_gear, 1);
    }

    #[test]
    fn test_merge_keeps_local_gains() {
        let mut local = PlayerProgress::default();
        local.advance_to(2);
        local.record_pickup(ItemKey::new(1, 1));
        local.record_pickup(ItemKey::new(1, 3));

        let mut remote = PlayerProgress::default();
        remote.advance_to(1);
        remote.record_pickup(ItemKey::new(2, 1));

        local.merge(&remote);
        assert_eq!(local.current_level, 2);
        assert_eq!(local.total_gear, 2);
        assert_eq!(local.collected.len(), 3);
        assert_eq!(local.collected_on(1).collect::<Vec<_>>(), vec![1, 3]);
    }
}
