//! Arena Progression for the BTY Arena
//!
//! Decides what content a member can open and how their effort turns into
//! progress:
//!
//! - **Tenure**: whole months of service on a configurable basis date
//! - **Unlocks**: sequential, tenure-gated levels on the staff (S1-S3) and
//!   leader (L1-L4) tracks, with a new-joiner override, an administrator
//!   grant for L4 and job-function ceilings
//! - **XP**: choice evaluation, seasonal to core conversion, weekly levels
//! - **Tiers**: code names, sub names and display stages derived from core XP
//!
//! Everything here is a pure function of its inputs and a clock value passed
//! in by the caller. Persistence belongs to the host application.
//!
//! # Key Components
//!
//! - [`UnlockResolver`]: Resolves the unlocked window and preview level
//! - [`TenurePolicyConfig`]: Per-level tenure requirements and basis dates
//! - [`evaluate_choice`]: XP, tags and system message for a scenario choice
//! - [`StageState`]: Public identity derived from core XP
//!
//! # Example
//!
//! ```ignore
//! use arena_progression::{TenureProfile, Track, UnlockRequest, UnlockResolver};
//!
//! let resolver = UnlockResolver::default();
//! let request = UnlockRequest {
//!     track: Track::Staff,
//!     profile: TenureProfile::joined(joined_at),
//!     ..Default::default()
//! };
//! let resolution = resolver.resolve(&request, Utc::now());
//! ```

pub mod config;
pub mod engine;
pub mod leaderboard;
pub mod program;
pub mod tenure;
pub mod tier;
pub mod types;
pub mod unlock;
pub mod xp;

// Re-export main types
pub use config::{NewJoinerRule, TenurePolicyConfig, ADMIN_GATED_TENURE_MONTHS};
pub use engine::{
    compute_xp, evaluate_choice, evaluate_follow_up, pick_system_message_id, EngineChoiceInput,
    EngineFollowUpInput, EngineOutput, HiddenDelta, SystemMessageId,
};
pub use leaderboard::{elite_cutoff_rank, is_elite, rank_by_weekly_xp, LeaderboardEntry, Ranked};
pub use program::{build_tenure_policy_config, JobFunctionPolicy, MembershipRole, ProgramConfig};
pub use tenure::{tenure_months, TenureProfile};
pub use tier::{milestone_to_show, progress_to_next_tier, StageProgress, StageState, TierProgress};
pub use types::*;
pub use unlock::{resolve_unlock, UnlockRequest, UnlockResolution, UnlockResolver};
pub use xp::{award_xp, seasonal_to_core, WeeklyProgress, WeeklyTier, XpTotals};
