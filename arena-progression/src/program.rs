//! Arena program configuration and track assignment.
//!
//! The program document (tracks, levels, tenure requirements) is the single
//! source for the tenure policy. Job functions decide the default track and
//! an optional ceiling level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::config::{NewJoinerRule, TenurePolicyConfig, NEW_JOINER_DAYS};
use crate::tenure::is_new_joiner;
use crate::types::{LevelId, Result, TenureBasis, Track};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Arena program document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProgramConfig {
    pub program: String,
    pub version: String,
    #[serde(default)]
    pub new_joiner_rule: Option<ProgramNewJoinerRule>,
    #[serde(default)]
    pub tracks: Vec<ProgramTrack>,
}

/// New-joiner section of the program document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProgramNewJoinerRule {
    #[serde(default)]
    pub description: String,
    pub staff_training_days: u32,
}

/// One track of the program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProgramTrack {
    pub track: Track,
    pub title: String,
    #[serde(default)]
    pub job_functions: Vec<String>,
    #[serde(default)]
    pub levels: Vec<ProgramLevel>,
}

/// A level entry with optional tenure overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProgramLevel {
    /// Raw level id; unknown ids are ignored by the policy builder
    pub level: String,
    pub title: String,
    #[serde(default)]
    pub min_tenure_months: Option<u32>,
    #[serde(default)]
    pub tenure_basis: Option<TenureBasis>,
}

impl ProgramConfig {
    /// Load program from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load program from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Track section by id.
    pub fn track(&self, track: Track) -> Option<&ProgramTrack> {
        self.tracks.iter().find(|t| t.track == track)
    }
}

/// Build the tenure policy from a program document.
///
/// Starts from the default policy and applies per-level overrides. The
/// admin-gated level keeps its sentinel regardless of the document.
pub fn build_tenure_policy_config(program: &ProgramConfig) -> TenurePolicyConfig {
    let mut cfg = TenurePolicyConfig::default();

    for level in program.tracks.iter().flat_map(|t| t.levels.iter()) {
        let Ok(id) = level.level.parse::<LevelId>() else {
            debug!(level = %level.level, "Ignoring unknown program level");
            continue;
        };
        if id.is_admin_gated() {
            continue;
        }
        if let Some(months) = level.min_tenure_months {
            cfg.min_tenure_months_by_level.insert(id, months);
        }
        if let Some(basis) = level.tenure_basis {
            cfg.tenure_basis_by_level.insert(id, basis);
        }
    }

    cfg.new_joiner_rule = NewJoinerRule {
        enabled: true,
        days: program
            .new_joiner_rule
            .as_ref()
            .map(|r| r.staff_training_days)
            .unwrap_or(NEW_JOINER_DAYS),
        forced_track: Track::Staff,
    };
    cfg
}

/// Membership role from the organisation directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    Staff,
    Doctor,
    OfficeManager,
    RegionalManager,
}

/// Job-function rules: track membership, aliases and level caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFunctionPolicy {
    /// Job functions on the staff program
    pub staff: Vec<String>,
    /// Job functions on the leader program
    pub leader: Vec<String>,
    /// Free-text spellings mapped to canonical job functions
    pub aliases: HashMap<String, String>,
    /// Highest level a job function may reach
    pub level_caps: BTreeMap<String, LevelId>,
}

impl Default for JobFunctionPolicy {
    fn default() -> Self {
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let aliases = [
            ("om", "office_manager"),
            ("office manager", "office_manager"),
            ("regional om", "regional_om"),
            ("regional manager", "regional_om"),
            ("junior doctor", "junior_doctor"),
            ("senior doctor", "senior_doctor"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            staff: owned(&["assistant", "admin", "junior_doctor", "hygienist", "doctor"]),
            leader: owned(&[
                "senior_doctor",
                "partner",
                "office_manager",
                "regional_om",
                "director",
                "dso",
            ]),
            aliases,
            level_caps: BTreeMap::from([
                ("doctor".to_string(), LevelId::S3),
                ("senior_doctor".to_string(), LevelId::L1),
                ("partner".to_string(), LevelId::L4),
            ]),
        }
    }
}

impl JobFunctionPolicy {
    /// Load policy from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Canonical job function: trimmed, lowercased, alias-resolved.
    pub fn normalize(&self, job_function: &str) -> String {
        let s = job_function.trim().to_lowercase();
        self.aliases.get(&s).cloned().unwrap_or(s)
    }

    /// Ceiling level for a job function, if one applies.
    pub fn cap_for(&self, job_function: &str) -> Option<LevelId> {
        let jf = self.normalize(job_function);
        if jf.is_empty() {
            return None;
        }
        self.level_caps.get(&jf).copied()
    }

    /// Track implied by a job function alone.
    pub fn track_for(&self, job_function: &str) -> Option<Track> {
        let jf = self.normalize(job_function);
        if self.leader.contains(&jf) {
            Some(Track::Leader)
        } else if self.staff.contains(&jf) {
            Some(Track::Staff)
        } else {
            None
        }
    }

    /// Effective program track for a member.
    ///
    /// New joiners always train on staff; otherwise the job function decides,
    /// then the membership role, then staff.
    pub fn effective_track(
        &self,
        job_function: Option<&str>,
        membership_role: Option<MembershipRole>,
        joined_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Track {
        if joined_at.is_some_and(|joined| is_new_joiner(joined, now, NEW_JOINER_DAYS)) {
            return Track::Staff;
        }
        if let Some(track) = job_function.and_then(|jf| self.track_for(jf)) {
            return track;
        }
        match membership_role {
            Some(MembershipRole::OfficeManager | MembershipRole::RegionalManager) => Track::Leader,
            _ => Track::Staff,
        }
    }
}

/// Normalize a job function against the default alias table.
pub fn normalize_job_function(job_function: &str) -> String {
    JobFunctionPolicy::default().normalize(job_function)
}

/// Ceiling level for a job function under the default cap table.
pub fn job_function_cap(job_function: &str) -> Option<LevelId> {
    JobFunctionPolicy::default().cap_for(job_function)
}

/// Lower of two levels by global progression order.
pub fn min_level(a: LevelId, b: LevelId) -> LevelId {
    a.min(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PROGRAM_JSON: &str = r#"{
        "program": "bty_arena",
        "version": "2",
        "new_joiner_rule": { "description": "first month is staff training", "staff_training_days": 21 },
        "tracks": [
            { "track": "staff", "title": "Staff", "job_functions": ["assistant"],
              "levels": [
                { "level": "S1", "title": "Foundations", "min_tenure_months": 0, "tenure_basis": "joinedAt" },
                { "level": "S2", "title": "Ownership", "min_tenure_months": 4 },
                { "level": "S9", "title": "Unknown" }
              ] },
            { "track": "leader", "title": "Leader",
              "levels": [
                { "level": "L1", "title": "Lead", "min_tenure_months": 18 },
                { "level": "L4", "title": "Partner", "min_tenure_months": 0 }
              ] }
        ]
    }"#;

    #[test]
    fn test_build_policy_from_program() {
        let program = ProgramConfig::from_json(PROGRAM_JSON).unwrap();
        let cfg = build_tenure_policy_config(&program);
        assert_eq!(cfg.min_tenure_months(LevelId::S2), 4);
        assert_eq!(cfg.min_tenure_months(LevelId::S3), 12);
        assert_eq!(cfg.min_tenure_months(LevelId::L1), 18);
        // L4 cannot be opened by tenure, whatever the document says
        assert_eq!(cfg.min_tenure_months(LevelId::L4), u32::MAX);
        assert_eq!(cfg.new_joiner_rule.days, 21);
        assert!(program.track(Track::Leader).is_some());
    }

    #[test]
    fn test_normalize_and_caps() {
        let policy = JobFunctionPolicy::default();
        assert_eq!(policy.normalize("  Office Manager "), "office_manager");
        assert_eq!(policy.cap_for("DOCTOR"), Some(LevelId::S3));
        assert_eq!(policy.cap_for(" senior doctor"), Some(LevelId::L1));
        assert_eq!(policy.cap_for("assistant"), None);
        assert_eq!(policy.cap_for("   "), None);
        assert_eq!(normalize_job_function("Regional Manager"), "regional_om");
        assert_eq!(job_function_cap("Partner"), Some(LevelId::L4));
    }

    #[test]
    fn test_effective_track() {
        let policy = JobFunctionPolicy::default();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let veteran = Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let recent = Some(Utc.with_ymd_and_hms(2026, 2, 20, 0, 0, 0).unwrap());

        assert_eq!(policy.effective_track(Some("partner"), None, veteran, now), Track::Leader);
        assert_eq!(policy.effective_track(Some("partner"), None, recent, now), Track::Staff);
        assert_eq!(policy.effective_track(Some("hygienist"), None, veteran, now), Track::Staff);
        assert_eq!(
            policy.effective_track(None, Some(MembershipRole::RegionalManager), veteran, now),
            Track::Leader
        );
        assert_eq!(policy.effective_track(Some("unknown"), None, None, now), Track::Staff);
    }
}
