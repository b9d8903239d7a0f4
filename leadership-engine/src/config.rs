//! Leadership engine configuration.

use serde::{Deserialize, Serialize};

use crate::types::{LeadershipError, Result};

/// Longest reset completion delay accepted, one year.
pub const MAX_RESET_DELAY_HOURS: i64 = 24 * 365;

/// Longest Stage 3 lookback accepted.
pub const MAX_STAGE3_LOOKBACK_DAYS: u32 = 365;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadershipConfig {
    #[serde(default)]
    pub forced_reset: ForcedResetConfig,
    #[serde(default)]
    pub tii: TiiConfig,
    #[serde(default)]
    pub lri: LriConfig,
    #[serde(default)]
    pub certified: CertifiedConfig,
}

impl LeadershipConfig {
    /// Load config from YAML and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load config from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject weights and thresholds outside their meaningful range.
    pub fn validate(&self) -> Result<()> {
        let fr = &self.forced_reset;
        if fr.conditions_required == 0 || fr.conditions_required > 4 {
            return Err(LeadershipError::ConfigError(format!(
                "forced_reset.conditions_required must be 1-4, got {}",
                fr.conditions_required
            )));
        }
        check_unit("forced_reset.air_7d_threshold", fr.air_7d_threshold)?;
        if !(1..=MAX_RESET_DELAY_HOURS).contains(&fr.delay_hours) {
            return Err(LeadershipError::ConfigError(format!(
                "forced_reset.delay_hours must be 1-{MAX_RESET_DELAY_HOURS}, got {}",
                fr.delay_hours
            )));
        }
        if !(1..=MAX_STAGE3_LOOKBACK_DAYS).contains(&fr.stage3_lookback_days) {
            return Err(LeadershipError::ConfigError(format!(
                "forced_reset.stage3_lookback_days must be 1-{MAX_STAGE3_LOOKBACK_DAYS}, got {}",
                fr.stage3_lookback_days
            )));
        }

        check_weights(
            "tii",
            &[self.tii.weight_air, self.tii.weight_mwd, self.tii.weight_tsp],
        )?;
        check_weights(
            "lri",
            &[self.lri.weight_air, self.lri.weight_mwd, self.lri.weight_pulse],
        )?;
        check_unit("lri.readiness_threshold", self.lri.readiness_threshold)?;
        check_unit("certified.air_14d_min", self.certified.air_14d_min)?;

        for (name, v) in [
            ("tii.target_mwd", self.tii.target_mwd),
            ("lri.target_mwd", self.lri.target_mwd),
            ("certified.mwd_threshold", self.certified.mwd_threshold),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(LeadershipError::ConfigError(format!(
                    "{name} must be a non-negative number, got {v}"
                )));
            }
        }
        Ok(())
    }
}

fn check_unit(name: &str, v: f64) -> Result<()> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(LeadershipError::ConfigError(format!(
            "{name} must be within 0-1, got {v}"
        )))
    }
}

fn check_weights(name: &str, weights: &[f64]) -> Result<()> {
    for w in weights {
        check_unit(name, *w)?;
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > 1e-6 {
        return Err(LeadershipError::ConfigError(format!(
            "{name} weights must sum to 1, got {sum}"
        )));
    }
    Ok(())
}

/// Forced Stage 4 (Integrity Reset) triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcedResetConfig {
    /// Stage 3 selections within the lookback that count as a condition
    pub stage3_count_threshold: u32,
    pub stage3_lookback_days: u32,
    /// Weekly AIR_7d below this counts as a low week
    pub air_7d_threshold: f64,
    /// Consecutive weeks for the AIR and TSP conditions
    pub consecutive_weeks: usize,
    /// Days without a QR verification that count as a condition
    pub no_qr_days_threshold: u32,
    /// Maximum delay a member may take before completing the reset
    pub delay_hours: i64,
    /// Conditions that must hold together to trigger
    pub conditions_required: usize,
}

impl Default for ForcedResetConfig {
    fn default() -> Self {
        Self {
            stage3_count_threshold: 2,
            stage3_lookback_days: 14,
            air_7d_threshold: 0.70,
            consecutive_weeks: 2,
            no_qr_days_threshold: 7,
            delay_hours: 48,
            conditions_required: 2,
        }
    }
}

/// Team Integrity Index weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiiConfig {
    pub weight_air: f64,
    pub weight_mwd: f64,
    pub weight_tsp: f64,
    /// MWD at which the MWD component saturates
    pub target_mwd: f64,
}

impl Default for TiiConfig {
    fn default() -> Self {
        Self {
            weight_air: 0.60,
            weight_mwd: 0.25,
            weight_tsp: 0.15,
            target_mwd: DEFAULT_TARGET_MWD,
        }
    }
}

/// Target micro-win density, about two verified micro wins a week.
pub const DEFAULT_TARGET_MWD: f64 = 0.30;

/// Leadership Readiness Index weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LriConfig {
    pub weight_air: f64,
    pub weight_mwd: f64,
    pub weight_pulse: f64,
    pub readiness_threshold: f64,
    pub target_mwd: f64,
}

impl Default for LriConfig {
    fn default() -> Self {
        Self {
            weight_air: 0.50,
            weight_mwd: 0.30,
            weight_pulse: 0.20,
            readiness_threshold: 0.80,
            target_mwd: DEFAULT_TARGET_MWD,
        }
    }
}

/// Certified leader thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertifiedConfig {
    pub air_14d_min: f64,
    pub mwd_threshold: f64,
}

impl Default for CertifiedConfig {
    fn default() -> Self {
        Self {
            air_14d_min: 0.80,
            mwd_threshold: DEFAULT_TARGET_MWD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LeadershipConfig::default();
        assert_eq!(config.forced_reset.delay_hours, 48);
        assert_eq!(config.tii.weight_air, 0.60);
        assert_eq!(config.lri.readiness_threshold, 0.80);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = LeadershipConfig::default();
        let yaml = config.to_yaml().unwrap();
        let parsed = LeadershipConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "certified:\n  air_14d_min: 0.9\n  mwd_threshold: 0.4\n";
        let config = LeadershipConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.certified.air_14d_min, 0.9);
        assert_eq!(config.forced_reset, ForcedResetConfig::default());
    }

    #[test]
    fn test_rejects_bad_weights() {
        let mut config = LeadershipConfig::default();
        config.tii.weight_air = 0.9;
        assert!(matches!(config.validate(), Err(LeadershipError::ConfigError(_))));

        let mut config = LeadershipConfig::default();
        config.forced_reset.conditions_required = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_reset_windows() {
        let yaml = |delay: &str, lookback: &str| {
            format!(
                "forced_reset:\n  stage3_count_threshold: 2\n  stage3_lookback_days: {lookback}\n  \
                 air_7d_threshold: 0.7\n  consecutive_weeks: 2\n  no_qr_days_threshold: 7\n  \
                 delay_hours: {delay}\n  conditions_required: 2\n"
            )
        };
        assert!(LeadershipConfig::from_yaml(&yaml("72", "14")).is_ok());
        for (delay, lookback) in [
            ("9223372036854775807", "14"),
            ("-1", "14"),
            ("0", "14"),
            ("48", "0"),
            ("48", "4294967295"),
        ] {
            let err = LeadershipConfig::from_yaml(&yaml(delay, lookback)).unwrap_err();
            assert!(matches!(err, LeadershipError::ConfigError(_)), "{delay}/{lookback}");
        }
    }
}
