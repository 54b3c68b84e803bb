//! Engine configuration
//!
//! Timings and puzzle tuning. Persisted separately from player progress in
//! LocalStorage; every field has a default so partial documents are accepted.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Engine timings and puzzle tuning (all durations in milliseconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Collectibles ===
    /// Shortest delay between spawn attempts
    pub spawn_interval_min_ms: u64,
    /// Longest delay between spawn attempts
    pub spawn_interval_max_ms: u64,
    /// How long an unclicked item stays on screen
    pub item_lifetime_ms: u64,
    /// "+1 gear" acknowledgment duration
    pub pickup_feedback_ms: u64,

    // === Rotation lock ===
    /// Red "locked" feedback after a wrong check
    pub lock_feedback_ms: u64,
    /// "Access granted" display before fading out
    pub lock_success_delay_ms: u64,
    /// Fade to black before the next stage
    pub lock_fade_ms: u64,

    // === Valves ===
    /// Scaled target pressure
    pub valve_target: u32,
    /// Scaled value at which the gauge needle hits +90 degrees
    pub valve_gauge_scale: u32,
    /// "Pressure error" feedback duration
    pub valve_feedback_ms: u64,
    /// Delay before a solved boiler returns to exploration
    pub valve_return_ms: u64,

    // === Gear network ===
    pub gear_rows: usize,
    pub gear_cols: usize,
    /// Inventory cap shown as "n / cap"
    pub gear_inventory_max: u32,
    /// Failure message lockout before rotations reset
    pub gear_failure_ms: u64,
    /// Delay between a synchronized core and the epilogue
    pub gear_victory_ms: u64,

    // === Session ===
    /// Stage title card duration
    pub stage_intro_ms: u64,
    /// Local play-time accumulation tick
    pub playtime_tick_ms: u64,
    /// Periodic play-time flush to the remote store
    pub playtime_flush_ms: u64,
    /// Identity used when no username is known
    pub default_player: String,
    /// Progress endpoint (web only)
    pub progress_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            spawn_interval_min_ms: 1000,
            spawn_interval_max_ms: 2500,
            item_lifetime_ms: 2000,
            pickup_feedback_ms: 1500,

            lock_feedback_ms: 1000,
            lock_success_delay_ms: 1000,
            lock_fade_ms: 1000,

            valve_target: crate::consts::VALVE_TARGET,
            valve_gauge_scale: 1500,
            valve_feedback_ms: 1000,
            valve_return_ms: 1500,

            gear_rows: 5,
            gear_cols: 6,
            gear_inventory_max: 8,
            gear_failure_ms: 1500,
            gear_victory_ms: 1500,

            stage_intro_ms: 6000,
            playtime_tick_ms: 1000,
            playtime_flush_ms: 30_000,
            default_player: "Ingegnere".to_string(),
            progress_url: "../php/update_user.php".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON document on top of the defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spawn_interval_min_ms > self.spawn_interval_max_ms {
            return Err(ConfigError::Invalid(format!(
                "spawn interval min {} exceeds max {}",
                self.spawn_interval_min_ms, self.spawn_interval_max_ms
            )));
        }
        if self.gear_rows < 2 || self.gear_cols < 2 {
            return Err(ConfigError::Invalid(format!(
                "gear grid {}x{} is too small",
                self.gear_rows, self.gear_cols
            )));
        }
        if self.valve_gauge_scale == 0 {
            return Err(ConfigError::Invalid("valve gauge scale must be positive".into()));
        }
        // Three minimal addends must leave a positive remainder
        let (addend_min, _) = crate::consts::VALVE_ADDEND_RANGE;
        if self.valve_target <= 3 * addend_min
            || self.valve_target % crate::consts::VALVE_GRANULARITY != 0
        {
            return Err(ConfigError::Invalid(format!(
                "valve target {} must be a multiple of {} above {}",
                self.valve_target,
                crate::consts::VALVE_GRANULARITY,
                3 * addend_min
            )));
        }
        if self.playtime_tick_ms == 0 || self.playtime_flush_ms == 0 {
            return Err(ConfigError::Invalid("play-time timers must be positive".into()));
        }
        Ok(())
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "zenith_config";

    /// Load config from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(config) => {
                        log::info!("Loaded engine config from LocalStorage");
                        return config;
                    }
                    Err(e) => log::warn!("Ignoring stored engine config: {}", e),
                }
            }
        }

        log::info!("Using default engine config");
        Self::default()
    }

    /// Native stub
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}
