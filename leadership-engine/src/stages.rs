//! Leadership stage state machine.
//!
//! Four stages, advanced only by one of four named transition contexts that
//! the caller asserts. Nothing here infers a transition from raw activity.
//!
//! ```text
//! Stage 1 --repeat_1_without_delegation-----------> Stage 2
//! Stage 2 --repeat_2_without_corrective_activation-> Stage 3
//! Stage 3 --air_below_threshold--------------------> Stage 4
//! Stage 4 --stage_4_completion---------------------> Stage 1
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use arena_progression::Track;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Leadership stage. Serialized as its number (1-4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Stage {
    /// Stage 1
    #[default]
    OverIntervention,
    /// Stage 2
    ExpectationCollapse,
    /// Stage 3
    LeadershipWithdrawal,
    /// Stage 4, the forced realignment
    IntegrityReset,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::OverIntervention,
        Stage::ExpectationCollapse,
        Stage::LeadershipWithdrawal,
        Stage::IntegrityReset,
    ];

    /// Stage number, 1-4.
    pub fn number(&self) -> u8 {
        match self {
            Stage::OverIntervention => 1,
            Stage::ExpectationCollapse => 2,
            Stage::LeadershipWithdrawal => 3,
            Stage::IntegrityReset => 4,
        }
    }

    /// Stage for a stored number; anything outside 1-4 reads as Stage 1.
    pub fn from_number_or_default(n: i64) -> Stage {
        u8::try_from(n)
            .ok()
            .and_then(|n| Stage::try_from(n).ok())
            .unwrap_or_default()
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::OverIntervention => "Over-Intervention (Speed Bias)",
            Stage::ExpectationCollapse => "Expectation Collapse (Cynicism Drift)",
            Stage::LeadershipWithdrawal => "Leadership Withdrawal (Responsibility Avoidance)",
            Stage::IntegrityReset => "Integrity Reset (Forced Realignment)",
        }
    }
}

impl TryFrom<u8> for Stage {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Stage::OverIntervention),
            2 => Ok(Stage::ExpectationCollapse),
            3 => Ok(Stage::LeadershipWithdrawal),
            4 => Ok(Stage::IntegrityReset),
            other => Err(format!("unknown leadership stage: {other}")),
        }
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> u8 {
        stage.number()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Externally asserted reason to move between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum StageTransitionContext {
    #[serde(rename = "repeat_1_without_delegation")]
    Repeat1WithoutDelegation,
    #[serde(rename = "repeat_2_without_corrective_activation")]
    Repeat2WithoutCorrectiveActivation,
    AirBelowThreshold,
    #[serde(rename = "stage_4_completion")]
    Stage4Completion,
}

impl StageTransitionContext {
    /// Wire name of the context.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageTransitionContext::Repeat1WithoutDelegation => "repeat_1_without_delegation",
            StageTransitionContext::Repeat2WithoutCorrectiveActivation => {
                "repeat_2_without_corrective_activation"
            }
            StageTransitionContext::AirBelowThreshold => "air_below_threshold",
            StageTransitionContext::Stage4Completion => "stage_4_completion",
        }
    }
}

impl fmt::Display for StageTransitionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Next stage for a context, or `None` when the pair has no mapping.
pub fn next_stage(current: Stage, context: StageTransitionContext) -> Option<Stage> {
    use Stage::*;
    use StageTransitionContext::*;

    match (current, context) {
        (OverIntervention, Repeat1WithoutDelegation) => Some(ExpectationCollapse),
        (ExpectationCollapse, Repeat2WithoutCorrectiveActivation) => Some(LeadershipWithdrawal),
        (LeadershipWithdrawal, AirBelowThreshold) => Some(IntegrityReset),
        (IntegrityReset, Stage4Completion) => Some(OverIntervention),
        _ => None,
    }
}

/// Result of applying a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TransitionOutcome {
    /// False when the context does not apply to the current stage
    pub applied: bool,
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub new_stage: Stage,
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub previous_stage: Stage,
}

/// Apply a transition. Never fails; a rejected context leaves the stage as is.
pub fn apply_transition(current: Stage, context: StageTransitionContext) -> TransitionOutcome {
    match next_stage(current, context) {
        Some(next) => {
            info!(from = %current, to = %next, context = %context, "Stage transition applied");
            TransitionOutcome {
                applied: true,
                new_stage: next,
                previous_stage: current,
            }
        }
        None => {
            debug!(stage = %current, context = %context, "Transition context not valid for stage");
            TransitionOutcome {
                applied: false,
                new_stage: current,
                previous_stage: current,
            }
        }
    }
}

/// Persisted leadership state for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct LeadershipState {
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub current_stage: Stage,
    pub stage_entered_at: DateTime<Utc>,
    /// Set when Stage 4 was forced; cleared on return to Stage 1
    #[serde(default)]
    pub forced_reset_triggered_at: Option<DateTime<Utc>>,
    /// Program track; moves to leader on approval
    #[serde(default)]
    pub track: Track,
    #[serde(default)]
    pub leader_approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub leader_approver_id: Option<String>,
}

impl LeadershipState {
    /// Fresh state at Stage 1.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            current_stage: Stage::OverIntervention,
            stage_entered_at: now,
            forced_reset_triggered_at: None,
            track: Track::Staff,
            leader_approved_at: None,
            leader_approver_id: None,
        }
    }

    /// Move to `stage` at `now`. Entering Stage 1 clears the forced-reset marker.
    pub fn enter(&mut self, stage: Stage, now: DateTime<Utc>) {
        self.current_stage = stage;
        self.stage_entered_at = now;
        if stage == Stage::OverIntervention {
            self.forced_reset_triggered_at = None;
        }
    }

    /// Deadline for completing a forced reset. `None` without a pending reset
    /// or when the deadline is not representable.
    pub fn reset_due_at(&self, delay_hours: i64) -> Option<DateTime<Utc>> {
        let delay = Duration::try_hours(delay_hours)?;
        self.forced_reset_triggered_at
            .and_then(|t| t.checked_add_signed(delay))
    }

    /// A forced reset is pending past its deadline.
    pub fn is_reset_overdue(&self, delay_hours: i64, now: DateTime<Utc>) -> bool {
        self.current_stage == Stage::IntegrityReset
            && self.reset_due_at(delay_hours).is_some_and(|due| now > due)
    }
}
