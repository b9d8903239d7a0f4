//! Core types for arena progression.
//!
//! Tracks and level identifiers are shared by the tenure calculator, the
//! unlock resolver and the program configuration.
//!
//! With the `typescript` feature enabled, these types can be exported to TypeScript
//! using ts-rs for consistency with the web frontend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Program track a member trains on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Track {
    /// Staff program (S1-S3)
    Staff,
    /// Leader program (L1-L4)
    Leader,
}

impl Track {
    /// Ordered levels of this track. Unlocking walks this list front to back.
    pub fn levels(&self) -> &'static [LevelId] {
        match self {
            Track::Staff => &STAFF_LEVEL_ORDER,
            Track::Leader => &LEADER_LEVEL_ORDER,
        }
    }

    /// First (always reachable) level of the track.
    pub fn entry_level(&self) -> LevelId {
        self.levels()[0]
    }

    /// Wire identifier, `"staff"` or `"leader"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Staff => "staff",
            Track::Leader => "leader",
        }
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::Staff
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staff track order.
pub const STAFF_LEVEL_ORDER: [LevelId; 3] = [LevelId::S1, LevelId::S2, LevelId::S3];

/// Leader track order. L4 (Partner) is admin-granted only.
pub const LEADER_LEVEL_ORDER: [LevelId; 4] = [LevelId::L1, LevelId::L2, LevelId::L3, LevelId::L4];

/// Content level identifier.
///
/// The derived ordering is the global progression order
/// `S1 < S2 < S3 < L1 < L2 < L3 < L4`, used when clamping to job-function caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum LevelId {
    S1,
    S2,
    S3,
    L1,
    L2,
    L3,
    L4,
}

impl LevelId {
    /// Every level in global progression order.
    pub const ALL: [LevelId; 7] = [
        LevelId::S1,
        LevelId::S2,
        LevelId::S3,
        LevelId::L1,
        LevelId::L2,
        LevelId::L3,
        LevelId::L4,
    ];

    /// Track the level belongs to.
    pub fn track(&self) -> Track {
        match self {
            LevelId::S1 | LevelId::S2 | LevelId::S3 => Track::Staff,
            _ => Track::Leader,
        }
    }

    /// Position within its own track (0-based).
    pub fn track_index(&self) -> usize {
        self.track()
            .levels()
            .iter()
            .position(|l| l == self)
            .unwrap_or(0)
    }

    /// Next level in the same track, if any.
    pub fn next_in_track(&self) -> Option<LevelId> {
        self.track().levels().get(self.track_index() + 1).copied()
    }

    /// Whether the level can only be opened by an administrator grant.
    pub fn is_admin_gated(&self) -> bool {
        matches!(self, LevelId::L4)
    }

    /// Wire identifier, e.g. `"S2"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelId::S1 => "S1",
            LevelId::S2 => "S2",
            LevelId::S3 => "S3",
            LevelId::L1 => "L1",
            LevelId::L2 => "L2",
            LevelId::L3 => "L3",
            LevelId::L4 => "L4",
        }
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LevelId {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        LevelId::ALL
            .iter()
            .find(|l| l.as_str() == upper)
            .copied()
            .ok_or_else(|| ArenaError::UnknownLevel(s.to_string()))
    }
}

/// Which date a level's tenure is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum TenureBasis {
    #[serde(rename = "joinedAt")]
    JoinedAt,
    #[serde(rename = "leaderStartedAt")]
    LeaderStartedAt,
}

impl Default for TenureBasis {
    fn default() -> Self {
        Self::JoinedAt
    }
}

/// Error types for arena progression.
///
/// Only configuration loading and strict parsing can fail; the engine
/// computations themselves are total.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// Unknown level identifier
    #[error("Unknown level: {0}")]
    UnknownLevel(String),

    /// Unparseable date
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// JSON configuration error
    #[error("JSON configuration error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration error
    #[error("YAML configuration error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Structurally valid but unusable configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, ArenaError>;
