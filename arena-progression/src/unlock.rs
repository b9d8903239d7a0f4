//! Unlock resolution.
//!
//! Determines the highest content level a member may open on a track and the
//! next locked level shown as a preview. Unlocking is strictly sequential: the
//! walk stops at the first level whose tenure requirement is not met.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{TenurePolicyConfig, ADMIN_GATED_TENURE_MONTHS};
use crate::program::{min_level, JobFunctionPolicy};
use crate::tenure::{is_new_joiner, tenure_months, TenureProfile};
use crate::types::{LevelId, Track};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Inputs for a single unlock evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct UnlockRequest {
    /// Track the member is assigned to
    pub track: Track,
    pub profile: TenureProfile,
    /// Administrator grant for the Partner level
    #[serde(default)]
    pub l4_granted: bool,
    /// Raw job function; looked up against the cap table
    #[serde(default)]
    pub job_function: Option<String>,
}

/// Result of an unlock evaluation. Plain data, ready for a response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct UnlockResolution {
    pub requested_track: Track,
    /// Track after the new-joiner override
    pub effective_track: Track,
    pub max_unlocked_level: LevelId,
    /// Next level after the maximum, shown locked
    pub preview_level: Option<LevelId>,
    /// Months of tenure still missing for the preview level
    pub months_until_preview: Option<u32>,
    pub new_joiner_forced: bool,
    pub admin_granted: bool,
    /// Job-function ceiling that lowered the result
    pub capped_by: Option<LevelId>,
    /// Fingerprint of the policy used
    pub policy_fingerprint: String,
}

impl UnlockResolution {
    /// Whether `level` is open under this resolution.
    pub fn is_unlocked(&self, level: LevelId) -> bool {
        self.accessible_levels().contains(&level)
    }

    /// Levels the member may open, in display order.
    ///
    /// Leaders also see every staff level below them.
    pub fn accessible_levels(&self) -> Vec<LevelId> {
        let max = self.max_unlocked_level;
        let own: Vec<LevelId> = max
            .track()
            .levels()
            .iter()
            .copied()
            .take_while(|l| *l <= max)
            .collect();

        match max.track() {
            Track::Leader => Track::Staff.levels().iter().copied().chain(own).collect(),
            Track::Staff => own,
        }
    }
}

/// Resolves unlocks against a tenure policy and job-function caps.
#[derive(Debug, Clone, Default)]
pub struct UnlockResolver {
    policy: TenurePolicyConfig,
    job_functions: JobFunctionPolicy,
}

impl UnlockResolver {
    /// Create a resolver.
    pub fn new(policy: TenurePolicyConfig, job_functions: JobFunctionPolicy) -> Self {
        Self {
            policy,
            job_functions,
        }
    }

    /// Tenure policy in use.
    pub fn policy(&self) -> &TenurePolicyConfig {
        &self.policy
    }

    /// Track after applying the new-joiner rule.
    pub fn effective_track(&self, track: Track, profile: &TenureProfile, now: DateTime<Utc>) -> Track {
        let rule = &self.policy.new_joiner_rule;
        match profile.joined_at {
            Some(joined) if rule.enabled && is_new_joiner(joined, now, rule.days) => {
                rule.forced_track
            }
            _ => track,
        }
    }

    /// Highest level reached by tenure alone on `track`, with no skipping.
    pub fn max_level_by_tenure(
        &self,
        track: Track,
        profile: &TenureProfile,
        now: DateTime<Utc>,
    ) -> LevelId {
        let levels = track.levels();
        let mut max = levels[0];

        for &level in levels {
            let required = self.policy.min_tenure_months(level);
            let months = tenure_months(profile, self.policy.tenure_basis(level), &self.policy, now);
            if months >= required {
                max = level;
            } else {
                debug!(
                    level = %level,
                    tenure_months = months,
                    required_months = required,
                    "Tenure requirement not met; stopping unlock walk"
                );
                break;
            }
        }
        max
    }

    /// Resolve the unlocked content window for a member.
    pub fn resolve(&self, request: &UnlockRequest, now: DateTime<Utc>) -> UnlockResolution {
        let effective_track = self.effective_track(request.track, &request.profile, now);
        let new_joiner_forced = effective_track != request.track;
        if new_joiner_forced {
            debug!(
                requested = %request.track,
                forced = %effective_track,
                "New-joiner rule overrides requested track"
            );
        }

        let mut max = self.max_level_by_tenure(effective_track, &request.profile, now);

        let admin_granted = effective_track == Track::Leader && request.l4_granted;
        if admin_granted {
            info!(from = %max, "Partner level granted by administrator");
            max = LevelId::L4;
        }

        let cap = request
            .job_function
            .as_deref()
            .and_then(|jf| self.job_functions.cap_for(jf));
        let capped_by = match cap {
            Some(cap) if cap < max => {
                info!(from = %max, cap = %cap, "Clamping unlock to job-function cap");
                max = min_level(max, cap);
                Some(cap)
            }
            _ => None,
        };

        let preview_level = max.next_in_track();
        let months_until_preview = match (preview_level, capped_by) {
            (Some(preview), None) => self.months_until(preview, &request.profile, now),
            _ => None,
        };

        UnlockResolution {
            requested_track: request.track,
            effective_track,
            max_unlocked_level: max,
            preview_level,
            months_until_preview,
            new_joiner_forced,
            admin_granted,
            capped_by,
            policy_fingerprint: self.policy.fingerprint(),
        }
    }

    /// Remaining months before `level`'s own requirement is met.
    fn months_until(&self, level: LevelId, profile: &TenureProfile, now: DateTime<Utc>) -> Option<u32> {
        let required = self.policy.min_tenure_months(level);
        if required == ADMIN_GATED_TENURE_MONTHS {
            return None;
        }
        let months = tenure_months(profile, self.policy.tenure_basis(level), &self.policy, now);
        Some(required.saturating_sub(months))
    }
}

/// Resolve with the default job-function table.
pub fn resolve_unlock(
    request: &UnlockRequest,
    policy: &TenurePolicyConfig,
    now: DateTime<Utc>,
) -> UnlockResolution {
    UnlockResolver::new(policy.clone(), JobFunctionPolicy::default()).resolve(request, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Months, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn months_ago(n: u32) -> DateTime<Utc> {
        now().checked_sub_months(Months::new(n)).unwrap()
    }

    fn request(track: Track, profile: TenureProfile) -> UnlockRequest {
        UnlockRequest {
            track,
            profile,
            ..Default::default()
        }
    }

    #[test]
    fn test_staff_four_months_unlocks_s2() {
        let resolver = UnlockResolver::default();
        let res = resolver.resolve(&request(Track::Staff, TenureProfile::joined(months_ago(4))), now());
        assert_eq!(res.max_unlocked_level, LevelId::S2);
        assert_eq!(res.preview_level, Some(LevelId::S3));
        assert_eq!(res.months_until_preview, Some(8));
        assert!(!res.new_joiner_forced);
    }

    #[test]
    fn test_new_joiner_forced_to_staff() {
        let resolver = UnlockResolver::default();
        let joined = now() - chrono::Duration::days(10);
        let profile = TenureProfile::joined(joined).with_leader_started_at(months_ago(200));
        let res = resolver.resolve(&request(Track::Leader, profile), now());
        assert_eq!(res.effective_track, Track::Staff);
        assert!(res.new_joiner_forced);
        assert_eq!(res.max_unlocked_level, LevelId::S1);
    }

    #[test]
    fn test_no_skip_even_when_later_level_satisfied() {
        let mut policy = TenurePolicyConfig::default();
        // S3 requirement is lower than S2's; S2 still gates it
        policy.min_tenure_months_by_level.insert(LevelId::S2, 6);
        policy.min_tenure_months_by_level.insert(LevelId::S3, 2);
        let resolver = UnlockResolver::new(policy, JobFunctionPolicy::default());
        let res = resolver.resolve(&request(Track::Staff, TenureProfile::joined(months_ago(4))), now());
        assert_eq!(res.max_unlocked_level, LevelId::S1);
        assert_eq!(res.preview_level, Some(LevelId::S2));
    }

    #[test]
    fn test_leader_never_reaches_l4_by_tenure() {
        let resolver = UnlockResolver::default();
        let profile = TenureProfile::joined(months_ago(400)).with_leader_started_at(months_ago(300));
        let res = resolver.resolve(&request(Track::Leader, profile), now());
        assert_eq!(res.max_unlocked_level, LevelId::L3);
        assert_eq!(res.preview_level, Some(LevelId::L4));
        assert_eq!(res.months_until_preview, None);
    }

    #[test]
    fn test_l4_grant() {
        let resolver = UnlockResolver::default();
        let mut req = request(Track::Leader, TenureProfile::joined(months_ago(30)));
        req.l4_granted = true;
        let res = resolver.resolve(&req, now());
        assert_eq!(res.max_unlocked_level, LevelId::L4);
        assert!(res.admin_granted);
        assert_eq!(res.preview_level, None);

        // Grant has no effect on the staff track
        req.track = Track::Staff;
        let res = resolver.resolve(&req, now());
        assert_eq!(res.max_unlocked_level, LevelId::S3);
        assert!(!res.admin_granted);
    }

    #[test]
    fn test_job_function_cap_is_a_ceiling() {
        let resolver = UnlockResolver::default();
        let mut req = request(Track::Leader, TenureProfile::joined(months_ago(200)));
        req.job_function = Some(" Senior Doctor ".to_string());
        req.l4_granted = true;
        let res = resolver.resolve(&req, now());
        assert_eq!(res.max_unlocked_level, LevelId::L1);
        assert_eq!(res.capped_by, Some(LevelId::L1));
        assert_eq!(res.months_until_preview, None);

        // A cap above the tenure level changes nothing
        let mut req = request(Track::Staff, TenureProfile::joined(months_ago(4)));
        req.job_function = Some("doctor".to_string());
        let res = resolver.resolve(&req, now());
        assert_eq!(res.max_unlocked_level, LevelId::S2);
        assert_eq!(res.capped_by, None);
    }

    #[test]
    fn test_missing_profile_fails_safe() {
        let resolver = UnlockResolver::default();
        let res = resolver.resolve(&request(Track::Leader, TenureProfile::default()), now());
        assert_eq!(res.max_unlocked_level, LevelId::L1);
        let res = resolver.resolve(&request(Track::Staff, TenureProfile::default()), now());
        assert_eq!(res.max_unlocked_level, LevelId::S1);
    }

    #[test]
    fn test_accessible_levels() {
        let resolver = UnlockResolver::default();
        let profile = TenureProfile::joined(months_ago(100)).with_leader_started_at(months_ago(70));
        let res = resolver.resolve(&request(Track::Leader, profile), now());
        assert_eq!(res.max_unlocked_level, LevelId::L2);
        assert_eq!(
            res.accessible_levels(),
            vec![LevelId::S1, LevelId::S2, LevelId::S3, LevelId::L1, LevelId::L2]
        );
        assert!(!res.is_unlocked(LevelId::L3));
    }

    #[test]
    fn test_idempotent() {
        let resolver = UnlockResolver::default();
        let req = request(Track::Staff, TenureProfile::joined(months_ago(13)));
        assert_eq!(resolver.resolve(&req, now()), resolver.resolve(&req, now()));
    }
}
