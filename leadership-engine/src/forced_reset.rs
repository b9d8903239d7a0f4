//! Forced Stage 4 (Integrity Reset) evaluation.
//!
//! Stage 4 is forced when enough of four independent warning conditions hold
//! at once. The member may delay the reset up to the configured deadline but
//! cannot dismiss it. Only a member in Stage 3 can be forced.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::config::ForcedResetConfig;
use crate::stages::Stage;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Aggregates the caller derives from activity logs and weekly snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ResetEvalInputs {
    /// Stage 3 selections within the lookback window
    pub stage3_selected_count: u32,
    /// AIR_7d below threshold in each of the last consecutive weeks
    pub air_7d_low_consecutive_weeks: bool,
    /// Days since the last QR-verified activation
    pub no_qr_verification_days: u32,
    /// Team Stability Pulse fell week over week for the last consecutive weeks
    pub tsp_declining_consecutive_weeks: bool,
}

/// A warning condition that contributed to a forced reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum ForcedResetReason {
    #[serde(rename = "stage3_selected_twice_in_14d")]
    Stage3Repeated,
    #[serde(rename = "air_7d_below_70_two_consecutive_weeks")]
    AirLowConsecutiveWeeks,
    #[serde(rename = "no_qr_verification_7_days")]
    NoQrVerification,
    #[serde(rename = "tsp_declining_two_consecutive_weeks")]
    TspDeclining,
}

impl ForcedResetReason {
    /// Reason code as reported to callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ForcedResetReason::Stage3Repeated => "stage3_selected_twice_in_14d",
            ForcedResetReason::AirLowConsecutiveWeeks => "air_7d_below_70_two_consecutive_weeks",
            ForcedResetReason::NoQrVerification => "no_qr_verification_7_days",
            ForcedResetReason::TspDeclining => "tsp_declining_two_consecutive_weeks",
        }
    }
}

impl fmt::Display for ForcedResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a forced-reset evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ForcedResetEvaluation {
    pub should_trigger: bool,
    /// Conditions that held, in evaluation order
    pub reasons: Vec<ForcedResetReason>,
}

/// Evaluates forced-reset conditions against configured thresholds.
#[derive(Debug, Clone, Default)]
pub struct ForcedResetEvaluator {
    config: ForcedResetConfig,
}

impl ForcedResetEvaluator {
    pub fn new(config: ForcedResetConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForcedResetConfig {
        &self.config
    }

    /// Collect the conditions that hold and decide whether to trigger.
    pub fn evaluate(&self, inputs: &ResetEvalInputs) -> ForcedResetEvaluation {
        let cfg = &self.config;
        let mut reasons = Vec::with_capacity(4);

        if inputs.stage3_selected_count >= cfg.stage3_count_threshold {
            reasons.push(ForcedResetReason::Stage3Repeated);
        }
        if inputs.air_7d_low_consecutive_weeks {
            reasons.push(ForcedResetReason::AirLowConsecutiveWeeks);
        }
        if inputs.no_qr_verification_days >= cfg.no_qr_days_threshold {
            reasons.push(ForcedResetReason::NoQrVerification);
        }
        if inputs.tsp_declining_consecutive_weeks {
            reasons.push(ForcedResetReason::TspDeclining);
        }

        let should_trigger = reasons.len() >= cfg.conditions_required;
        if should_trigger {
            info!(reasons = ?reasons, "Forced reset conditions met");
        } else {
            debug!(conditions = reasons.len(), required = cfg.conditions_required, "Forced reset not triggered");
        }
        ForcedResetEvaluation {
            should_trigger,
            reasons,
        }
    }

    /// Whether a member at `stage` may be forced into Stage 4.
    pub fn can_force_from(&self, stage: Stage) -> bool {
        stage == Stage::LeadershipWithdrawal
    }

    /// Deadline for a reset triggered at `triggered_at`; `None` when it falls
    /// outside the representable range.
    pub fn reset_due_at(&self, triggered_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        Duration::try_hours(self.config.delay_hours).and_then(|d| triggered_at.checked_add_signed(d))
    }

    /// Stage 3 selections within the lookback window ending at `now`.
    pub fn count_stage3_selections(&self, selected_at: &[DateTime<Utc>], now: DateTime<Utc>) -> u32 {
        let start = now
            .checked_sub_signed(Duration::days(i64::from(self.config.stage3_lookback_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        selected_at.iter().filter(|t| **t >= start && **t <= now).count() as u32
    }

    /// AIR_7d below threshold in each of the most recent consecutive weeks.
    ///
    /// `weekly_air` is oldest first.
    pub fn air_low_for_consecutive_weeks(&self, weekly_air: &[f64]) -> bool {
        let weeks = self.config.consecutive_weeks;
        weeks > 0
            && weekly_air.len() >= weeks
            && weekly_air[weekly_air.len() - weeks..]
                .iter()
                .all(|air| *air < self.config.air_7d_threshold)
    }

    /// TSP fell week over week for each of the most recent consecutive weeks.
    ///
    /// Needs one more week than the streak length; `weekly_tsp` is oldest first.
    pub fn tsp_declining_for_consecutive_weeks(&self, weekly_tsp: &[f64]) -> bool {
        let weeks = self.config.consecutive_weeks;
        weeks > 0
            && weekly_tsp.len() > weeks
            && weekly_tsp[weekly_tsp.len() - weeks - 1..]
                .windows(2)
                .all(|w| w[1] < w[0])
    }
}

/// Whole days since the last QR verification; never verified counts as `u32::MAX`.
pub fn days_since_qr_verification(last_qr_verified_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    match last_qr_verified_at {
        Some(at) => (now - at).num_days().clamp(0, i64::from(u32::MAX)) as u32,
        None => u32::MAX,
    }
}
