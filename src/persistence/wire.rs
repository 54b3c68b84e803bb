//! JSON wire format of the remote progress store
//!
//! `GET progress` returns the player snapshot; every mutation is a `POST`
//! whose body carries exactly the fields of one operation.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use super::progress::{ItemKey, PlayerProgress};
use crate::consts::MAX_LEVEL;
use crate::error::RemoteError;

/// Why accumulated play time is being flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlushReason {
    Interval,
    LevelUp,
    Logout,
}

impl FlushReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushReason::Interval => "interval",
            FlushReason::LevelUp => "level-up",
            FlushReason::Logout => "logout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressRequest {
    Load,
    AdvanceLevel { new_level: u8 },
    GearPickup(ItemKey),
    AddTime { seconds: u32, reason: FlushReason },
    Reset,
}

impl ProgressRequest {
    pub fn method(&self) -> Method {
        match self {
            ProgressRequest::Load => Method::Get,
            _ => Method::Post,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressRequest::Load => "load",
            ProgressRequest::AdvanceLevel { .. } => "advance-level",
            ProgressRequest::GearPickup(_) => "gear-pickup",
            ProgressRequest::AddTime { .. } => "add-time",
            ProgressRequest::Reset => "reset",
        }
    }

    /// JSON body for POST requests
    pub fn body(&self) -> Option<serde_json::Value> {
        match self {
            ProgressRequest::Load => None,
            ProgressRequest::AdvanceLevel { new_level } => Some(json!({ "newLevel": new_level })),
            ProgressRequest::GearPickup(key) => Some(json!({
                "addGear": true,
                "sparkleCollected": true,
                "levelId": key.level_id,
                "sparkleId": key.item_id,
            })),
            ProgressRequest::AddTime { seconds, reason } => Some(json!({
                "addTime": seconds,
                "reason": reason.as_str(),
            })),
            ProgressRequest::Reset => Some(json!({ "resetGame": true })),
        }
    }
}

/// A collected-item row as returned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedRecord {
    #[serde(rename = "levelId", alias = "Level_ID", deserialize_with = "lenient_u32")]
    pub level_id: u32,
    #[serde(rename = "sparkleId", alias = "Sparkle_ID", deserialize_with = "lenient_u32")]
    pub item_id: u32,
}

/// Response to any progress call; snapshot fields are only set for loads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_level: Option<u32>,
    #[serde(default, alias = "totGear", skip_serializing_if = "Option::is_none")]
    pub total_gear: Option<u32>,
    #[serde(default, rename = "collectedSparkles", skip_serializing_if = "Vec::is_empty")]
    pub collected: Vec<CollectedRecord>,
}

impl ProgressResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn from_json(body: &str) -> Result<Self, RemoteError> {
        serde_json::from_str(body).map_err(|e| RemoteError::Malformed(e.to_string()))
    }

    /// Turn `success: false` into an error
    pub fn into_result(self) -> Result<Self, RemoteError> {
        if self.success {
            Ok(self)
        } else {
            Err(RemoteError::Rejected(self.message))
        }
    }

    /// Snapshot carried by a load response
    pub fn snapshot(&self) -> PlayerProgress {
        let mut progress = PlayerProgress {
            current_level: self.current_level.unwrap_or(0).min(MAX_LEVEL as u32) as u8,
            total_gear: self.total_gear.unwrap_or(0),
            ..Default::default()
        };
        progress.collected = self
            .collected
            .iter()
            .filter_map(|r| {
                let level = u8::try_from(r.level_id).ok()?;
                Some(ItemKey::new(level, r.item_id))
            })
            .collect();
        progress
    }
}

/// Accept `3` as well as `"3"` (database rows arrive as strings)
fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(u32),
        Str(String),
    }

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
