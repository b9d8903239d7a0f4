//! Tier, code and stage derivation from core XP.
//!
//! `tier = core_xp / 10`, `code = tier / 100` (capped at 6),
//! `sub_tier_group = (tier % 100) / 25`. Tier is internal; the code name
//! and sub name form the member's public identity.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Core XP per tier.
pub const CORE_XP_PER_TIER: u32 = 10;

/// Tiers per code.
pub const TIERS_PER_CODE: u32 = 100;

/// Core XP per display stage.
pub const STAGE_XP_STEP: u32 = 100;

/// Highest display stage.
pub const STAGE_CAP: u32 = 7;

/// Core XP at which the code name is hidden for good.
pub const CODE_HIDDEN_THRESHOLD: u32 = 700;

/// Tiers at which a celebration is shown, ascending.
pub const TIER_MILESTONES: [u32; 3] = [25, 50, 75];

/// Display names per code index.
pub const CODE_NAMES: [&str; 7] = [
    "FORGE",
    "PULSE",
    "FRAME",
    "ASCEND",
    "NOVA",
    "ARCHITECT",
    "CODELESS ZONE",
];

/// Default sub names per code and sub-tier group. The last code has none.
pub const SUB_NAMES: [Option<[&str; 4]>; 7] = [
    Some(["Spark", "Ember", "Flame", "Inferno"]),
    Some(["Echo", "Rhythm", "Resonance", "Surge"]),
    Some(["Outline", "Structure", "Framework", "Foundation"]),
    Some(["Lift", "Rise", "Elevation", "Summit"]),
    Some(["Glimmer", "Radiance", "Brilliance", "Supernova"]),
    Some(["Draft", "Design", "Blueprint", "Grand Architect"]),
    None,
];

/// Placeholder sub name when none can be resolved.
pub const NO_SUB_NAME: &str = "—";

pub fn tier_from_core_xp(core_xp: u32) -> u32 {
    core_xp / CORE_XP_PER_TIER
}

pub fn code_index_from_tier(tier: u32) -> usize {
    (tier / TIERS_PER_CODE).min(6) as usize
}

pub fn sub_tier_group_from_tier(tier: u32) -> usize {
    ((tier % TIERS_PER_CODE) / 25).min(3) as usize
}

pub fn code_name(code_index: usize) -> &'static str {
    CODE_NAMES[code_index.min(CODE_NAMES.len() - 1)]
}

/// Default sub name; `None` for codes without defaults.
pub fn default_sub_name(code_index: usize, sub_tier_group: usize) -> Option<&'static str> {
    SUB_NAMES
        .get(code_index)
        .copied()
        .flatten()
        .and_then(|names| names.get(sub_tier_group).copied())
}

/// Display sub name: a non-blank custom name wins, else the default.
pub fn resolve_sub_name(code_index: usize, sub_tier_group: usize, custom: Option<&str>) -> String {
    match custom.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => name.to_string(),
        None => default_sub_name(code_index, sub_tier_group)
            .unwrap_or(NO_SUB_NAME)
            .to_string(),
    }
}

/// Display stage `min(core_xp / 100 + 1, 7)`.
pub fn stage_from_core_xp(core_xp: u32) -> u32 {
    (core_xp / STAGE_XP_STEP + 1).min(STAGE_CAP)
}

/// Latch for the hidden code name. Once hidden, it stays hidden.
pub fn latch_code_hidden(previously_hidden: bool, core_xp: u32) -> bool {
    previously_hidden || core_xp >= CODE_HIDDEN_THRESHOLD
}

/// Stage view of cumulative core XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct StageProgress {
    pub stage: u32,
    /// 0-99 within the current stage
    pub stage_progress_percent: u32,
    /// Persisted latch; pass the stored value back in on the next call
    pub code_hidden: bool,
}

impl StageProgress {
    /// Derive stage progress. `previously_hidden` is the stored latch.
    pub fn derive(core_xp: u32, previously_hidden: bool) -> Self {
        Self {
            stage: stage_from_core_xp(core_xp),
            stage_progress_percent: core_xp % STAGE_XP_STEP,
            code_hidden: latch_code_hidden(previously_hidden, core_xp),
        }
    }
}

/// Full identity derived from core XP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct StageState {
    pub tier: u32,
    pub code_index: u32,
    pub sub_tier_group: u32,
    pub stage_number: u32,
    pub code_name: String,
    pub sub_name: String,
}

impl StageState {
    pub fn from_core_xp(core_xp: u32, custom_sub_name: Option<&str>) -> Self {
        let tier = tier_from_core_xp(core_xp);
        let code_index = code_index_from_tier(tier);
        let sub_tier_group = sub_tier_group_from_tier(tier);
        Self {
            tier,
            code_index: code_index as u32,
            sub_tier_group: sub_tier_group as u32,
            stage_number: stage_from_core_xp(core_xp),
            code_name: code_name(code_index).to_string(),
            sub_name: resolve_sub_name(code_index, sub_tier_group, custom_sub_name),
        }
    }
}

/// Progress toward the next tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TierProgress {
    pub xp_to_next: u32,
    /// 0-1 within the current tier
    pub progress_pct: f64,
    /// Set when the next tier opens a new code
    pub next_code_name: Option<String>,
}

/// Progress within the current tier. Defined for every `core_xp`, including
/// the last partial tier below `u32::MAX`.
pub fn progress_to_next_tier(core_xp: u32) -> TierProgress {
    let tier = tier_from_core_xp(core_xp);
    // u64 so the final tier boundary does not overflow
    let segment_start = u64::from(tier) * u64::from(CORE_XP_PER_TIER);
    let next_tier_at = segment_start + u64::from(CORE_XP_PER_TIER);
    let into_tier = u64::from(core_xp) - segment_start;
    let next_code_name = if (tier + 1) % TIERS_PER_CODE == 0 {
        CODE_NAMES
            .get(((tier + 1) / TIERS_PER_CODE) as usize)
            .map(|s| s.to_string())
    } else {
        None
    };
    TierProgress {
        xp_to_next: (next_tier_at - u64::from(core_xp)) as u32,
        progress_pct: into_tier as f64 / f64::from(CORE_XP_PER_TIER),
        next_code_name,
    }
}

/// A milestone celebration to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct MilestoneToShow {
    pub milestone: u32,
    /// Sub name the member is leaving behind
    pub previous_sub_name: Option<String>,
}

/// Highest milestone crossed that has not been celebrated yet.
///
/// The caller stores `milestone` as the new `last_celebrated` so each
/// milestone is shown once.
pub fn milestone_to_show(core_xp: u32, last_celebrated: u32) -> Option<MilestoneToShow> {
    let tier = tier_from_core_xp(core_xp);
    let milestone = TIER_MILESTONES
        .iter()
        .rev()
        .copied()
        .find(|m| tier >= *m && last_celebrated < *m)?;

    let previous_sub_name = match milestone {
        25 => None,
        m => {
            let code_index = code_index_from_tier(tier);
            let group = sub_tier_group_from_tier(m - 1);
            Some(default_sub_name(code_index, group).unwrap_or(NO_SUB_NAME).to_string())
        }
    };
    Some(MilestoneToShow {
        milestone,
        previous_sub_name,
    })
}
