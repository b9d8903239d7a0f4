//! Tenure policy configuration.
//!
//! Loaded once from static configuration and passed by reference into the
//! resolver; nothing here is mutated during evaluation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::types::{ArenaError, LevelId, Result, TenureBasis, Track};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Tenure requirement for levels that can never be reached by tenure alone.
pub const ADMIN_GATED_TENURE_MONTHS: u32 = u32::MAX;

/// Default new-joiner window in days.
pub const NEW_JOINER_DAYS: u32 = 30;

/// New-joiner override: recent joiners train on a fixed track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct NewJoinerRule {
    pub enabled: bool,
    /// Window length in days since `joinedAt`
    pub days: u32,
    /// Track forced while inside the window
    pub forced_track: Track,
}

impl Default for NewJoinerRule {
    fn default() -> Self {
        Self {
            enabled: true,
            days: NEW_JOINER_DAYS,
            forced_track: Track::Staff,
        }
    }
}

/// Tenure policy used by the unlock resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TenurePolicyConfig {
    #[serde(default)]
    pub new_joiner_rule: NewJoinerRule,
    /// Minimum whole months of tenure per level
    pub min_tenure_months_by_level: BTreeMap<LevelId, u32>,
    /// Date each level's tenure is measured from
    pub tenure_basis_by_level: BTreeMap<LevelId, TenureBasis>,
    /// Basis used when a leader-start date is requested but absent
    #[serde(default)]
    pub leader_fallback_basis: TenureBasis,
    /// Scale tenure by the member's work ratio
    #[serde(default)]
    pub apply_work_ratio_weighting: bool,
}

impl Default for TenurePolicyConfig {
    fn default() -> Self {
        let min_tenure_months_by_level = BTreeMap::from([
            (LevelId::S1, 0),
            (LevelId::S2, 3),
            (LevelId::S3, 12),
            (LevelId::L1, 24),
            (LevelId::L2, 60),
            (LevelId::L3, 120),
            (LevelId::L4, ADMIN_GATED_TENURE_MONTHS),
        ]);
        let tenure_basis_by_level = LevelId::ALL
            .iter()
            .map(|level| {
                let basis = match level.track() {
                    Track::Staff => TenureBasis::JoinedAt,
                    Track::Leader => TenureBasis::LeaderStartedAt,
                };
                (*level, basis)
            })
            .collect();

        Self {
            new_joiner_rule: NewJoinerRule::default(),
            min_tenure_months_by_level,
            tenure_basis_by_level,
            leader_fallback_basis: TenureBasis::JoinedAt,
            apply_work_ratio_weighting: false,
        }
    }
}

impl TenurePolicyConfig {
    /// Load config from YAML and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load config from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the resolver would otherwise silently ignore.
    pub fn validate(&self) -> Result<()> {
        if self.new_joiner_rule.enabled && self.new_joiner_rule.days == 0 {
            return Err(ArenaError::ConfigError(
                "new_joiner_rule.days must be positive when the rule is enabled".to_string(),
            ));
        }
        match self.min_tenure_months_by_level.get(&LevelId::L4) {
            Some(months) if *months != ADMIN_GATED_TENURE_MONTHS => {
                Err(ArenaError::ConfigError(format!(
                    "L4 is admin-granted only; tenure requirement {months} is not allowed"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Required months for a level. Unconfigured levels are never unlockable.
    pub fn min_tenure_months(&self, level: LevelId) -> u32 {
        if level.is_admin_gated() {
            return ADMIN_GATED_TENURE_MONTHS;
        }
        self.min_tenure_months_by_level
            .get(&level)
            .copied()
            .unwrap_or(ADMIN_GATED_TENURE_MONTHS)
    }

    /// Tenure basis for a level (defaults to `joinedAt`).
    pub fn tenure_basis(&self, level: LevelId) -> TenureBasis {
        self.tenure_basis_by_level
            .get(&level)
            .copied()
            .unwrap_or_default()
    }

    /// Stable SHA-256 fingerprint of the policy, stamped on resolutions for audit.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let cfg = TenurePolicyConfig::default();
        assert_eq!(cfg.min_tenure_months(LevelId::S2), 3);
        assert_eq!(cfg.min_tenure_months(LevelId::L3), 120);
        assert_eq!(cfg.min_tenure_months(LevelId::L4), ADMIN_GATED_TENURE_MONTHS);
        assert_eq!(cfg.tenure_basis(LevelId::L1), TenureBasis::LeaderStartedAt);
        assert!(cfg.new_joiner_rule.enabled);
    }

    #[test]
    fn test_l4_is_never_configurable_below_sentinel() {
        let mut cfg = TenurePolicyConfig::default();
        cfg.min_tenure_months_by_level.insert(LevelId::L4, 0);
        assert_eq!(cfg.min_tenure_months(LevelId::L4), ADMIN_GATED_TENURE_MONTHS);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let cfg = TenurePolicyConfig::default();
        let yaml = cfg.to_yaml().unwrap();
        let parsed = TenurePolicyConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
min_tenure_months_by_level:
  S1: 0
  S2: 6
tenure_basis_by_level:
  S1: joinedAt
  S2: joinedAt
"#;
        let cfg = TenurePolicyConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.min_tenure_months(LevelId::S2), 6);
        // Missing levels are locked
        assert_eq!(cfg.min_tenure_months(LevelId::S3), ADMIN_GATED_TENURE_MONTHS);
        assert_eq!(cfg.new_joiner_rule.days, NEW_JOINER_DAYS);
    }

    #[test]
    fn test_validation() {
        let err = TenurePolicyConfig::from_yaml(
            "min_tenure_months_by_level:\n  L4: 0\ntenure_basis_by_level: {}\n",
        )
        .unwrap_err();
        assert!(matches!(err, ArenaError::ConfigError(_)));

        let mut cfg = TenurePolicyConfig::default();
        cfg.new_joiner_rule.days = 0;
        assert!(cfg.validate().is_err());
        cfg.new_joiner_rule.enabled = false;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_fingerprint_tracks_changes() {
        let a = TenurePolicyConfig::default();
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.apply_work_ratio_weighting = true;
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}
