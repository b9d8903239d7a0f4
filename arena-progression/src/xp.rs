//! XP accounting rules.
//!
//! Core XP is permanent and accumulative. Weekly XP drives the competition
//! ranking and resets at the season boundary. Functions here compute the new
//! values; the caller applies them with an atomic upsert.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Core XP below this converts at the beginner rate.
pub const BEGINNER_CORE_XP_THRESHOLD: u32 = 200;

/// Seasonal XP per core XP for beginners.
pub const SEASONAL_TO_CORE_RATE_BEGINNER: u32 = 45;

/// Seasonal XP per core XP once past the beginner threshold.
pub const SEASONAL_TO_CORE_RATE_STANDARD: u32 = 60;

/// Weekly XP per competition level.
pub const WEEKLY_LEVEL_STEP: u32 = 100;

/// Maximum XP a member can earn per UTC day across arena and activities.
pub const DAILY_XP_CAP: u32 = 1200;

/// Fraction of weekly XP carried into the next league window.
pub const LEAGUE_CARRYOVER_FRACTION: f64 = 0.1;

/// Result of converting seasonal XP into core XP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SeasonalToCoreResult {
    pub rate: u32,
    pub core_gain: u32,
    /// Fractional remainder the caller keeps for the next award
    pub fractional_buffer: f64,
}

/// Convert earned seasonal XP to core XP at the rate for `current_core_xp`.
pub fn seasonal_to_core(seasonal_earned: f64, current_core_xp: u32) -> SeasonalToCoreResult {
    let rate = conversion_rate(current_core_xp);
    let exact = if seasonal_earned.is_finite() {
        seasonal_earned.max(0.0) / f64::from(rate)
    } else {
        0.0
    };
    let core_gain = exact.floor();
    SeasonalToCoreResult {
        rate,
        core_gain: core_gain as u32,
        fractional_buffer: exact - core_gain,
    }
}

fn conversion_rate(core_xp: u32) -> u32 {
    if core_xp < BEGINNER_CORE_XP_THRESHOLD {
        SEASONAL_TO_CORE_RATE_BEGINNER
    } else {
        SEASONAL_TO_CORE_RATE_STANDARD
    }
}

/// XP totals before and after an award.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct XpTotals {
    pub core_xp: u32,
    pub weekly_xp: u32,
}

/// Apply earned seasonal XP: weekly gets all of it, core gets the conversion.
pub fn award_xp(current: XpTotals, earned_seasonal_xp: u32) -> XpTotals {
    let core_gain = earned_seasonal_xp / conversion_rate(current.core_xp);
    XpTotals {
        core_xp: current.core_xp.saturating_add(core_gain),
        weekly_xp: current.weekly_xp.saturating_add(earned_seasonal_xp),
    }
}

/// XP still awardable today given what was already earned.
pub fn cap_daily_xp(requested: u32, earned_today: u32) -> u32 {
    requested.min(DAILY_XP_CAP.saturating_sub(earned_today))
}

/// Weekly competition tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum WeeklyTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

/// Competition level: `floor(weekly_xp / 100) + 1`.
pub fn weekly_level(weekly_xp: u32) -> u32 {
    weekly_xp / WEEKLY_LEVEL_STEP + 1
}

/// Competition tier from weekly XP.
pub fn weekly_tier(weekly_xp: u32) -> WeeklyTier {
    match weekly_xp {
        0..=99 => WeeklyTier::Bronze,
        100..=199 => WeeklyTier::Silver,
        200..=299 => WeeklyTier::Gold,
        _ => WeeklyTier::Platinum,
    }
}

/// Level, tier and progress bar values for weekly XP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct WeeklyProgress {
    pub level: u32,
    pub tier: WeeklyTier,
    /// 0-99 within the current level
    pub progress_in_level: u32,
    /// 0-1 for a progress bar
    pub progress_pct: f64,
}

impl WeeklyProgress {
    pub fn from_weekly_xp(weekly_xp: u32) -> Self {
        let progress_in_level = weekly_xp % WEEKLY_LEVEL_STEP;
        Self {
            level: weekly_level(weekly_xp),
            tier: weekly_tier(weekly_xp),
            progress_in_level,
            progress_pct: f64::from(progress_in_level) / f64::from(WEEKLY_LEVEL_STEP),
        }
    }
}

/// Weekly XP kept across a league boundary.
pub fn carryover_weekly_xp(weekly_xp: u32) -> u32 {
    (f64::from(weekly_xp) * LEAGUE_CARRYOVER_FRACTION).floor() as u32
}

/// Season reset: weekly XP drops to the carryover, core XP is untouched.
pub fn season_reset(current: XpTotals, with_carryover: bool) -> XpTotals {
    XpTotals {
        core_xp: current.core_xp,
        weekly_xp: if with_carryover {
            carryover_weekly_xp(current.weekly_xp)
        } else {
            0
        },
    }
}
