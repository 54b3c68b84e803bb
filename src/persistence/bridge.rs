//! Persistence bridge: local cache plus remote progress sync
//!
//! Local writes are synchronous and never fatal. Remote writes are queued
//! and fire-and-forget; the local progress mirror is updated optimistically
//! before the request leaves.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::cache::LocalCache;
use super::progress::{ItemKey, PlayerProgress};
use super::sync::{Completion, OutgoingRequest, RemoteSync, RequestId};
use super::wire::{FlushReason, ProgressRequest, ProgressResponse};
use crate::error::RemoteError;

/// Cache entry holding the last known progress
pub const PROGRESS_KEY: &str = "progress";

/// Events reported to the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    LevelAdvanced(u8),
    GearPickup(ItemKey),
    PlayTime(FlushReason),
}

pub struct PersistenceBridge {
    cache: LocalCache,
    remote: RemoteSync,
    progress: PlayerProgress,
}

impl PersistenceBridge {
    /// Open the bridge, purging legacy entries and restoring the progress mirror
    pub fn new(mut cache: LocalCache) -> Self {
        cache.purge_legacy();
        let progress = cache.load(PROGRESS_KEY).unwrap_or_default();
        Self {
            cache,
            remote: RemoteSync::new(),
            progress,
        }
    }

    pub fn player(&self) -> &str {
        self.cache.player()
    }

    pub fn progress(&self) -> &PlayerProgress {
        &self.progress
    }

    /// Cached state for a stage, or None if absent or corrupt
    pub fn load_or_init<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.cache.load(key)
    }

    /// Write-through save. Failures are logged, never fatal.
    pub fn save<T: Serialize>(&mut self, key: &str, state: &T) {
        if let Err(e) = self.cache.save(key, state) {
            log::error!("Failed to save `{}`: {}", key, e);
        }
    }

    /// Update the local mirror and queue the matching remote call.
    ///
    /// Returns false when the event changed nothing locally (a level at or
    /// below the current one, a repeated pickup, or no play time to flush).
    /// Nothing is sent in that case.
    pub fn sync_remote(&mut self, event: SyncEvent) -> bool {
        match event {
            SyncEvent::LevelAdvanced(level) => {
                if !self.progress.advance_to(level) {
                    log::debug!(
                        "Level {} not above {}, nothing to send",
                        level,
                        self.progress.current_level
                    );
                    return false;
                }
                self.save_progress();
                self.remote.flush_time(FlushReason::LevelUp);
                self.remote
                    .enqueue(ProgressRequest::AdvanceLevel { new_level: level });
                true
            }
            SyncEvent::GearPickup(key) => {
                if !self.progress.record_pickup(key) {
                    return false;
                }
                self.save_progress();
                self.remote.enqueue(ProgressRequest::GearPickup(key));
                true
            }
            SyncEvent::PlayTime(reason) => self.remote.flush_time(reason).is_some(),
        }
    }

    pub fn request_load(&mut self) -> RequestId {
        self.remote.enqueue(ProgressRequest::Load)
    }

    /// Replace the mirror with an authoritative snapshot
    pub fn adopt_remote(&mut self, snapshot: PlayerProgress) {
        self.progress = snapshot;
        self.save_progress();
    }

    /// Fold a snapshot into the mirror without losing local gains
    pub fn merge_remote(&mut self, snapshot: &PlayerProgress) {
        let before = self.progress.clone();
        self.progress.merge(snapshot);
        if self.progress != before {
            self.save_progress();
        }
    }

    pub fn tick_playtime(&mut self, seconds: u32) {
        self.remote.accumulate_time(seconds);
    }

    pub fn unsent_seconds(&self) -> u32 {
        self.remote.unsent_seconds()
    }

    /// Wipe all progress for this player, locally and remotely
    pub fn reset(&mut self) {
        self.remote.discard_pending();
        self.remote.enqueue(ProgressRequest::Reset);
        let removed = self.cache.clear_player();
        log::info!(
            "Reset progress for `{}` ({} cache entries removed)",
            self.cache.player(),
            removed
        );
        self.progress = PlayerProgress::default();
    }

    pub fn take_outgoing(&mut self) -> Vec<OutgoingRequest> {
        self.remote.drain()
    }

    pub fn has_outgoing(&self) -> bool {
        self.remote.has_outgoing()
    }

    pub fn complete(
        &mut self,
        id: RequestId,
        result: Result<ProgressResponse, RemoteError>,
    ) -> Option<Completion> {
        self.remote.complete(id, result)
    }

    fn save_progress(&mut self) {
        let progress = self.progress.clone();
        self.save(PROGRESS_KEY, &progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::store::InMemoryProgressStore;
    use crate::persistence::sync::ProgressService;
    use crate::platform::MemoryStorage;

    fn bridge() -> PersistenceBridge {
        PersistenceBridge::new(LocalCache::new(Box::new(MemoryStorage::new()), "ada"))
    }

    fn pump(bridge: &mut PersistenceBridge, store: &mut InMemoryProgressStore) -> Vec<Completion> {
        bridge
            .take_outgoing()
            .into_iter()
            .filter_map(|out| {
                let result = store.call(&out.request);
                bridge.complete(out.id, result)
            })
            .collect()
    }

    #[test]
    fn test_level_advance_flushes_time_first() {
        let mut b = bridge();
        b.tick_playtime(7);
        b.sync_remote(SyncEvent::LevelAdvanced(2));
        let kinds: Vec<_> = b
            .take_outgoing()
            .into_iter()
            .map(|o| o.request)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ProgressRequest::AddTime {
                    seconds: 7,
                    reason: FlushReason::LevelUp
                },
                ProgressRequest::AdvanceLevel { new_level: 2 },
            ]
        );
        assert_eq!(b.progress().current_level, 2);
    }

    #[test]
    fn test_lower_level_is_not_sent() {
        let mut b = bridge();
        b.sync_remote(SyncEvent::LevelAdvanced(4));
        b.take_outgoing();
        b.tick_playtime(3);

        assert!(!b.sync_remote(SyncEvent::LevelAdvanced(1)));
        assert!(!b.sync_remote(SyncEvent::LevelAdvanced(4)));
        assert!(b.take_outgoing().is_empty());
        assert_eq!(b.progress().current_level, 4);
        assert_eq!(b.unsent_seconds(), 3);
    }

    #[test]
    fn test_reset_drops_stale_load() {
        let mut b = bridge();
        let mut store = InMemoryProgressStore::new();
        b.sync_remote(SyncEvent::LevelAdvanced(3));
        pump(&mut b, &mut store);

        b.request_load();
        let load = b.take_outgoing().remove(0);
        let stale = store.call(&load.request);
        b.reset();
        assert!(b.complete(load.id, stale).is_none());
        assert_eq!(b.progress().current_level, 0);
    }

    #[test]
    fn test_pickup_is_sent_once() {
        let mut b = bridge();
        let key = ItemKey::new(1, 0);
        assert!(b.sync_remote(SyncEvent::GearPickup(key)));
        assert!(!b.sync_remote(SyncEvent::GearPickup(key)));
        assert_eq!(b.take_outgoing().len(), 1);
    }

    #[test]
    fn test_pickup_survives_remote_failure() {
        let mut b = bridge();
        let mut store = InMemoryProgressStore::new();
        store.set_offline(true);
        b.sync_remote(SyncEvent::GearPickup(ItemKey::new(1, 2)));
        pump(&mut b, &mut store);
        assert!(b.progress().is_collected(ItemKey::new(1, 2)));
    }

    #[test]
    fn test_progress_mirror_is_cached() {
        let mut b = bridge();
        b.sync_remote(SyncEvent::LevelAdvanced(3));
        let cached: PlayerProgress = b.load_or_init(PROGRESS_KEY).unwrap();
        assert_eq!(cached.current_level, 3);
    }

    #[test]
    fn test_load_roundtrip_through_store() {
        let mut b = bridge();
        let mut store = InMemoryProgressStore::new();
        b.sync_remote(SyncEvent::LevelAdvanced(1));
        b.sync_remote(SyncEvent::GearPickup(ItemKey::new(1, 1)));
        pump(&mut b, &mut store);

        b.request_load();
        let completions = pump(&mut b, &mut store);
        let Some(Completion::Loaded(snapshot)) = completions.into_iter().next() else {
            panic!("expected a load completion");
        };
        assert_eq!(snapshot.current_level, 1);
        assert_eq!(snapshot.total_gear, 1);
    }

    #[test]
    fn test_merge_and_adopt() {
        let mut b = bridge();
        b.sync_remote(SyncEvent::LevelAdvanced(2));
        let remote = PlayerProgress {
            current_level: 1,
            total_gear: 5,
            ..Default::default()
        };
        b.merge_remote(&remote);
        assert_eq!(b.progress().current_level, 2);
        assert_eq!(b.progress().total_gear, 5);

        b.adopt_remote(remote.clone());
        assert_eq!(b.progress(), &remote);
    }

    #[test]
    fn test_reset_clears_player_entries() {
        let mut b = bridge();
        b.tick_playtime(4);
        b.save("lock", &vec![1u64, 2, 3]);
        b.sync_remote(SyncEvent::LevelAdvanced(2));
        b.reset();
        assert!(b.load_or_init::<Vec<u64>>("lock").is_none());
        assert_eq!(b.progress(), &PlayerProgress::default());
        assert_eq!(b.unsent_seconds(), 0);
        let out = b.take_outgoing();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].request, ProgressRequest::Reset);
    }
}
