//! Per-player local cache
//!
//! Every entry is namespaced as `{player}_{name}` so several players can
//! share one browser, and wrapped in a versioned JSON envelope. Anything that
//! fails to parse (or carries another version) is treated as absent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::platform::KvStore;

/// Current envelope version
pub const CACHE_VERSION: u32 = 1;

/// Un-namespaced keys written by older builds
pub const LEGACY_KEYS: &[&str] = &["livello2Completato", "salaCaldaie_valvole"];

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    version: u32,
    data: T,
}

pub struct LocalCache {
    store: Box<dyn KvStore>,
    player: String,
}

impl LocalCache {
    pub fn new(store: Box<dyn KvStore>, player: impl Into<String>) -> Self {
        Self {
            store,
            player: player.into(),
        }
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    /// Full storage key for a cache entry
    pub fn key(&self, name: &str) -> String {
        format!("{}_{}", self.player, name)
    }

    /// Read an entry; corrupt or foreign-version entries count as absent
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let key = self.key(name);
        let raw = self.store.get(&key)?;
        match serde_json::from_str::<Envelope<T>>(&raw) {
            Ok(envelope) if envelope.version == CACHE_VERSION => Some(envelope.data),
            Ok(envelope) => {
                log::warn!(
                    "Ignoring cache entry `{}` with version {} (expected {})",
                    key,
                    envelope.version,
                    CACHE_VERSION
                );
                None
            }
            Err(e) => {
                log::warn!("Discarding corrupt cache entry `{}`: {}", key, e);
                None
            }
        }
    }

    pub fn save<T: Serialize>(&mut self, name: &str, value: &T) -> Result<(), StorageError> {
        let key = self.key(name);
        let json = serde_json::to_string(&EnvelopeRef {
            version: CACHE_VERSION,
            data: value,
        })?;
        self.store.set(&key, &json)
    }

    /// Remove every entry belonging to the current player
    pub fn clear_player(&mut self) -> usize {
        let prefix = format!("{}_", self.player);
        let doomed: Vec<String> = self
            .store
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(&prefix))
            .collect();
        for key in &doomed {
            self.store.remove(key);
        }
        doomed.len()
    }

    /// Drop un-namespaced entries left by older builds
    pub fn purge_legacy(&mut self) -> usize {
        let mut removed = 0;
        for key in LEGACY_KEYS {
            if self.store.get(key).is_some() {
                self.store.remove(key);
                removed += 1;
            }
        }
        if removed > 0 {
            log::info!("Purged {} legacy cache entries", removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStorage;

    fn cache_with(entries: &[(&str, &str)]) -> LocalCache {
        let mut store = MemoryStorage::new();
        for (k, v) in entries {
            store.set(k, v).unwrap();
        }
        LocalCache::new(Box::new(store), "ada")
    }

    #[test]
    fn test_save_then_load() {
        let mut cache = cache_with(&[]);
        cache.save("angles", &vec![45u64, 60, 90]).unwrap();
        let loaded: Option<Vec<u64>> = cache.load("angles");
        assert_eq!(loaded, Some(vec![45, 60, 90]));
        assert_eq!(cache.key("angles"), "ada_angles");
    }

    #[test]
    fn test_corrupt_entry_is_absent() {
        let cache = cache_with(&[("ada_angles", "{{{")]);
        let loaded: Option<Vec<u64>> = cache.load("angles");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_wrong_shape_is_absent() {
        let cache = cache_with(&[("ada_angles", r#"{"version":1,"data":"nope"}"#)]);
        let loaded: Option<Vec<u64>> = cache.load("angles");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_foreign_version_is_absent() {
        let cache = cache_with(&[("ada_angles", r#"{"version":99,"data":[1,2]}"#)]);
        let loaded: Option<Vec<u64>> = cache.load("angles");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_players_are_isolated() {
        let mut cache = cache_with(&[("bob_angles", r#"{"version":1,"data":[0]}"#)]);
        assert!(cache.load::<Vec<u64>>("angles").is_none());
        cache.save("angles", &vec![90u64]).unwrap();
        assert_eq!(cache.clear_player(), 1);
        assert!(cache.load::<Vec<u64>>("angles").is_none());
    }

    #[test]
    fn test_purge_legacy() {
        let mut cache = cache_with(&[("livello2Completato", "true"), ("ada_x", "1")]);
        assert_eq!(cache.purge_legacy(), 1);
        assert_eq!(cache.purge_legacy(), 0);
    }
}
