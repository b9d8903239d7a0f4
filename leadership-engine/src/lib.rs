//! Leadership Engine for the BTY Arena
//!
//! Tracks a member's leadership pattern through four stages and measures
//! whether they follow through on the activations they choose:
//!
//! - **Stages**: Over-Intervention, Expectation Collapse, Leadership
//!   Withdrawal and Integrity Reset, moved only by named transition contexts
//! - **Forced reset**: Stage 4 is forced from Stage 3 when enough warning
//!   conditions hold, with a fixed completion deadline
//! - **AIR**: rolling 7/14/90-day rate of on-time, verified activations
//! - **Indices**: team integrity (TII), readiness (LRI) and Certified status
//!
//! # Key Components
//!
//! - [`apply_transition`]: The stage machine
//! - [`compute_air`]: AIR for one window over an activation log
//! - [`ForcedResetEvaluator`]: Any-two-of-four reset trigger
//! - [`LeadershipEngineService`]: Applies the rules to stored state via a [`StageStore`]
//!
//! # Example
//!
//! ```ignore
//! use leadership_engine::{InMemoryStageStore, LeadershipConfig, LeadershipEngineService};
//!
//! let service = LeadershipEngineService::new(Arc::new(InMemoryStageStore::new()), LeadershipConfig::default());
//! let record = service
//!     .transition("user-1", StageTransitionContext::Repeat1WithoutDelegation, Utc::now())
//!     .await?;
//! ```

pub mod air;
pub mod config;
pub mod forced_reset;
pub mod indices;
pub mod service;
pub mod stages;
pub mod types;

// Re-export main types
pub use air::{
    compute_air, micro_win_density, ActivationRecord, ActivationType, AirResult, AirSnapshot,
    AirWindow, VerificationLog, VerificationRecord,
};
pub use config::LeadershipConfig;
pub use forced_reset::{ForcedResetEvaluation, ForcedResetEvaluator, ForcedResetReason, ResetEvalInputs};
pub use indices::{
    can_approve_leader_track, certified_status, compute_lri, compute_tii, CertifiedInputs,
    CertifiedStatus, LriInputs, LriResult, TiiInputs, TiiResult,
};
pub use service::{InMemoryStageStore, LeadershipEngineService, StageStore, StageView};
pub use stages::{apply_transition, next_stage, LeadershipState, Stage, StageTransitionContext, TransitionOutcome};
pub use types::*;
