//! Stage-state service.
//!
//! Applies the stage machine and forced-reset rules to persisted per-member
//! state. Storage sits behind [`StageStore`] so the host can back it with its
//! own database; [`InMemoryStageStore`] serves tests and single-process use.
//!
//! Operations on the same member are serialized so a load-modify-save cycle
//! never interleaves with another for that member.

use arena_progression::Track;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::config::LeadershipConfig;
use crate::forced_reset::{ForcedResetEvaluator, ForcedResetReason, ResetEvalInputs};
use crate::indices::{decide_leader_approval, ApprovalRefusal, CertifiedStatus, LriResult};
use crate::stages::{apply_transition, LeadershipState, Stage, StageTransitionContext};
use crate::types::Result;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Persistence for leadership state, keyed by user id.
#[async_trait]
pub trait StageStore: Send + Sync {
    /// Stored state, or `None` for a member with no row yet.
    async fn load(&self, user_id: &str) -> Result<Option<LeadershipState>>;

    /// Insert or replace a member's state.
    async fn save(&self, user_id: &str, state: &LeadershipState) -> Result<()>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct InMemoryStageStore {
    states: DashMap<String, LeadershipState>,
}

impl InMemoryStageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[async_trait]
impl StageStore for InMemoryStageStore {
    async fn load(&self, user_id: &str) -> Result<Option<LeadershipState>> {
        Ok(self.states.get(user_id).map(|s| s.clone()))
    }

    async fn save(&self, user_id: &str, state: &LeadershipState) -> Result<()> {
        self.states.insert(user_id.to_string(), state.clone());
        Ok(())
    }
}

/// Current stage as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct StageView {
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub current_stage: Stage,
    pub stage_name: String,
    pub forced_reset_triggered_at: Option<DateTime<Utc>>,
    pub reset_due_at: Option<DateTime<Utc>>,
    pub reset_overdue: bool,
}

/// Result of a transition request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TransitionRecord {
    pub applied: bool,
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub current_stage: Stage,
    /// Set only when the transition was applied
    #[cfg_attr(feature = "typescript", ts(type = "number | null"))]
    pub previous_stage: Option<Stage>,
    pub stage_name: String,
}

/// Result of a forced-reset evaluation against stored state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ResetTriggerRecord {
    pub triggered: bool,
    pub reasons: Vec<ForcedResetReason>,
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub current_stage: Stage,
    pub stage_name: String,
    pub reset_due_at: Option<DateTime<Utc>>,
}

/// Result of a leader-track approval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ApprovalRecord {
    pub approved: bool,
    pub reason: Option<ApprovalRefusal>,
}

/// Held for the duration of one member's load-modify-save cycle.
struct MemberGuard<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    user_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for MemberGuard<'_> {
    fn drop(&mut self) {
        // Release first so the map holds the last reference
        self.guard.take();
        self.locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Orchestrates stage state over a [`StageStore`].
pub struct LeadershipEngineService<S: StageStore> {
    store: Arc<S>,
    config: LeadershipConfig,
    reset_evaluator: ForcedResetEvaluator,
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<S: StageStore> LeadershipEngineService<S> {
    pub fn new(store: Arc<S>, config: LeadershipConfig) -> Self {
        let reset_evaluator = ForcedResetEvaluator::new(config.forced_reset.clone());
        Self {
            store,
            config,
            reset_evaluator,
            user_locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &LeadershipConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Serialize work on one member. The map entry is dropped again once no
    /// other caller holds or waits on it.
    async fn lock_member(&self, user_id: &str) -> MemberGuard<'_> {
        let lock = self
            .user_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        MemberGuard {
            locks: &self.user_locks,
            user_id: user_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Members with an in-flight operation.
    pub fn locked_members(&self) -> usize {
        self.user_locks.len()
    }

    async fn load_or_initial(&self, user_id: &str, now: DateTime<Utc>) -> Result<LeadershipState> {
        Ok(self
            .store
            .load(user_id)
            .await?
            .unwrap_or_else(|| LeadershipState::initial(now)))
    }

    fn view(&self, state: &LeadershipState, now: DateTime<Utc>) -> StageView {
        let delay = self.config.forced_reset.delay_hours;
        StageView {
            current_stage: state.current_stage,
            stage_name: state.current_stage.name().to_string(),
            forced_reset_triggered_at: state.forced_reset_triggered_at,
            reset_due_at: state.reset_due_at(delay),
            reset_overdue: state.is_reset_overdue(delay, now),
        }
    }

    /// Current stage; a member with no stored state is at Stage 1.
    pub async fn state(&self, user_id: &str, now: DateTime<Utc>) -> Result<StageView> {
        let state = self.load_or_initial(user_id, now).await?;
        let view = self.view(&state, now);
        if view.reset_overdue {
            warn!(user_id, due = ?view.reset_due_at, "Forced reset is overdue");
        }
        Ok(view)
    }

    /// Create Stage 1 state if none exists. Idempotent.
    pub async fn ensure_state(&self, user_id: &str, now: DateTime<Utc>) -> Result<LeadershipState> {
        let _guard = self.lock_member(user_id).await;

        if let Some(existing) = self.store.load(user_id).await? {
            return Ok(existing);
        }
        let state = LeadershipState::initial(now);
        self.store.save(user_id, &state).await?;
        debug!(user_id, "Created initial leadership state");
        Ok(state)
    }

    /// Apply a transition and persist it. Rejected contexts persist nothing.
    pub async fn transition(
        &self,
        user_id: &str,
        context: StageTransitionContext,
        now: DateTime<Utc>,
    ) -> Result<TransitionRecord> {
        let _guard = self.lock_member(user_id).await;

        let mut state = self.load_or_initial(user_id, now).await?;
        let current = state.current_stage;

        let outcome = apply_transition(current, context);
        if !outcome.applied {
            return Ok(TransitionRecord {
                applied: false,
                current_stage: current,
                previous_stage: None,
                stage_name: current.name().to_string(),
            });
        }

        let next = outcome.new_stage;
        state.enter(next, now);
        self.store.save(user_id, &state).await?;
        debug!(user_id, stage = %next, "Stage persisted");

        Ok(TransitionRecord {
            applied: true,
            current_stage: next,
            previous_stage: Some(current),
            stage_name: next.name().to_string(),
        })
    }

    /// Evaluate forced-reset conditions and move a Stage 3 member to Stage 4.
    ///
    /// Members outside Stage 3 are left untouched, which makes repeated
    /// calls after a trigger a no-op.
    pub async fn evaluate_and_trigger_reset(
        &self,
        user_id: &str,
        inputs: &ResetEvalInputs,
        now: DateTime<Utc>,
    ) -> Result<ResetTriggerRecord> {
        let _guard = self.lock_member(user_id).await;

        let mut state = self.load_or_initial(user_id, now).await?;
        let evaluation = self.reset_evaluator.evaluate(inputs);
        let delay = self.config.forced_reset.delay_hours;

        if evaluation.should_trigger && self.reset_evaluator.can_force_from(state.current_stage) {
            state.enter(Stage::IntegrityReset, now);
            state.forced_reset_triggered_at = Some(now);
            self.store.save(user_id, &state).await?;
            info!(user_id, reasons = ?evaluation.reasons, "Forced Integrity Reset");

            return Ok(ResetTriggerRecord {
                triggered: true,
                reasons: evaluation.reasons,
                current_stage: Stage::IntegrityReset,
                stage_name: Stage::IntegrityReset.name().to_string(),
                reset_due_at: state.reset_due_at(delay),
            });
        }

        Ok(ResetTriggerRecord {
            triggered: false,
            reasons: evaluation.reasons,
            current_stage: state.current_stage,
            stage_name: state.current_stage.name().to_string(),
            reset_due_at: state.reset_due_at(delay),
        })
    }

    /// Put a member on the leader track when the candidate is ready and the
    /// approver is certified.
    pub async fn approve_leader_track(
        &self,
        user_id: &str,
        approver_id: &str,
        candidate: &LriResult,
        approver: &CertifiedStatus,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRecord> {
        if let Err(refusal) = decide_leader_approval(candidate, approver) {
            debug!(user_id, approver_id, reason = ?refusal, "Leader track approval refused");
            return Ok(ApprovalRecord {
                approved: false,
                reason: Some(refusal),
            });
        }

        let _guard = self.lock_member(user_id).await;

        let mut state = self.load_or_initial(user_id, now).await?;
        state.track = Track::Leader;
        state.leader_approved_at = Some(now);
        state.leader_approver_id = Some(approver_id.to_string());
        self.store.save(user_id, &state).await?;
        info!(user_id, approver_id, "Leader track approved");

        Ok(ApprovalRecord {
            approved: true,
            reason: None,
        })
    }
}
