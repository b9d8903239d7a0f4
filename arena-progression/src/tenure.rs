//! Tenure calculation.
//!
//! Tenure is counted in whole calendar months between a basis date and
//! `now`. Level unlocks are tenure-only; tier and XP never unlock levels.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TenurePolicyConfig;
use crate::types::{ArenaError, Result, TenureBasis};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Membership dates used for tenure gating.
///
/// Supplied by the membership collaborator. Absent dates make every tenure
/// check fail toward the lowest level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TenureProfile {
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub leader_started_at: Option<DateTime<Utc>>,
    /// Fraction of a full-time schedule (0..1)
    #[serde(default)]
    pub work_ratio: Option<f64>,
}

impl TenureProfile {
    /// Profile with only a join date.
    pub fn joined(joined_at: DateTime<Utc>) -> Self {
        Self {
            joined_at: Some(joined_at),
            ..Default::default()
        }
    }

    /// Set the leader start date.
    pub fn with_leader_started_at(mut self, leader_started_at: DateTime<Utc>) -> Self {
        self.leader_started_at = Some(leader_started_at);
        self
    }

    /// Set the work ratio.
    pub fn with_work_ratio(mut self, ratio: f64) -> Self {
        self.work_ratio = Some(ratio);
        self
    }

    /// Lenient parse from raw strings. Unparseable dates are dropped.
    pub fn parse(
        joined_at: Option<&str>,
        leader_started_at: Option<&str>,
        work_ratio: Option<f64>,
    ) -> Self {
        Self {
            joined_at: joined_at.and_then(|s| parse_date(s).ok()),
            leader_started_at: leader_started_at.and_then(|s| parse_date(s).ok()),
            work_ratio,
        }
    }

    /// Strict parse; any present but unparseable date is an error.
    pub fn parse_strict(
        joined_at: &str,
        leader_started_at: Option<&str>,
        work_ratio: Option<f64>,
    ) -> Result<Self> {
        Ok(Self {
            joined_at: Some(parse_date(joined_at)?),
            leader_started_at: leader_started_at.map(parse_date).transpose()?,
            work_ratio,
        })
    }
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ArenaError::InvalidDate(raw.to_string()))
}

/// Whole calendar months from `start` to `end`, never negative.
///
/// A month counts once the same day-of-month and time is reached; shorter
/// months clamp to their last day (Jan 31 to Feb 28 is one month).
pub fn whole_months_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    if end <= start {
        return 0;
    }
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    while months > 0 {
        match start.checked_add_months(Months::new(months as u32)) {
            Some(candidate) if candidate <= end => break,
            _ => months -= 1,
        }
    }
    months.max(0) as u32
}

/// Whole days elapsed since `joined_at` (negative if `now` precedes it).
pub fn days_since(joined_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - joined_at).num_days()
}

/// True while fewer than `threshold_days` full days have passed since joining.
pub fn is_new_joiner(joined_at: DateTime<Utc>, now: DateTime<Utc>, threshold_days: u32) -> bool {
    days_since(joined_at, now) < i64::from(threshold_days)
}

/// Resolve the date tenure is measured from.
///
/// `leaderStartedAt` falls back to the configured fallback basis, which in
/// turn can only resolve to `joinedAt`.
pub fn basis_date(
    profile: &TenureProfile,
    basis: TenureBasis,
    fallback: TenureBasis,
) -> Option<DateTime<Utc>> {
    match basis {
        TenureBasis::JoinedAt => profile.joined_at,
        TenureBasis::LeaderStartedAt => profile.leader_started_at.or(match fallback {
            TenureBasis::JoinedAt | TenureBasis::LeaderStartedAt => profile.joined_at,
        }),
    }
}

/// Tenure in whole months on the given basis, optionally work-ratio weighted.
pub fn tenure_months(
    profile: &TenureProfile,
    basis: TenureBasis,
    config: &TenurePolicyConfig,
    now: DateTime<Utc>,
) -> u32 {
    let Some(start) = basis_date(profile, basis, config.leader_fallback_basis) else {
        return 0;
    };
    let months = whole_months_between(start, now);

    match (config.apply_work_ratio_weighting, profile.work_ratio) {
        (true, Some(ratio)) if !ratio.is_finite() => 0,
        (true, Some(ratio)) => (f64::from(months) * ratio.clamp(0.0, 1.0)).floor() as u32,
        _ => months,
    }
}

/// Days of tenure since joining, clamped at zero.
pub fn tenure_days(profile: &TenureProfile, now: DateTime<Utc>) -> u32 {
    profile
        .joined_at
        .map(|joined| days_since(joined, now).max(0) as u32)
        .unwrap_or(0)
}
