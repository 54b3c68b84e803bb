//! In-memory progress store
//!
//! Answers progress calls with the same semantics as the remote service.
//! Used by the native demo and by tests.

use super::progress::PlayerProgress;
use super::sync::ProgressService;
use super::wire::{CollectedRecord, ProgressRequest, ProgressResponse};
use crate::consts::MAX_LEVEL;
use crate::error::RemoteError;

#[derive(Debug, Clone, Default)]
pub struct InMemoryProgressStore {
    progress: PlayerProgress,
    play_seconds: u64,
    offline: bool,
    calls: usize,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(progress: PlayerProgress) -> Self {
        Self {
            progress,
            ..Default::default()
        }
    }

    /// While offline every call fails with a transport error
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn progress(&self) -> &PlayerProgress {
        &self.progress
    }

    pub fn play_seconds(&self) -> u64 {
        self.play_seconds
    }

    /// Calls received, including failed ones
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn snapshot(&self) -> ProgressResponse {
        ProgressResponse {
            success: true,
            message: None,
            current_level: Some(self.progress.current_level as u32),
            total_gear: Some(self.progress.total_gear),
            collected: self
                .progress
                .collected
                .iter()
                .map(|k| CollectedRecord {
                    level_id: k.level_id as u32,
                    item_id: k.item_id,
                })
                .collect(),
        }
    }
}

impl ProgressService for InMemoryProgressStore {
    fn call(&mut self, request: &ProgressRequest) -> Result<ProgressResponse, RemoteError> {
        self.calls += 1;
        if self.offline {
            return Err(RemoteError::Transport("store is offline".into()));
        }

        match request {
            ProgressRequest::Load => return Ok(self.snapshot()),
            ProgressRequest::AdvanceLevel { new_level } => {
                if *new_level > MAX_LEVEL {
                    return Ok(ProgressResponse {
                        success: false,
                        message: Some(format!("Invalid level {}", new_level)),
                        ..Default::default()
                    });
                }
                // The service stores the level as sent
                self.progress.current_level = *new_level;
            }
            ProgressRequest::GearPickup(key) => {
                self.progress.total_gear += 1;
                self.progress.collected.insert(*key);
            }
            ProgressRequest::AddTime { seconds, .. } => {
                self.play_seconds += u64::from(*seconds);
            }
            ProgressRequest::Reset => {
                self.progress = PlayerProgress::default();
                self.play_seconds = 0;
            }
        }
        Ok(ProgressResponse::ok())
    }
}
