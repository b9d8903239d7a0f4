//! Team and individual leadership indices.
//!
//! - TII: team score from average AIR, micro-win density and Team Stability
//!   Pulse. Only the team score is public.
//! - LRI: readiness of a non-leader for the leader track.
//! - Certified: dynamic status of a leader.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CertifiedConfig, LriConfig, TiiConfig};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Low end of 1-5 pulse scales.
pub const PULSE_MIN: f64 = 1.0;
/// High end of 1-5 pulse scales.
pub const PULSE_MAX: f64 = 5.0;

/// Clamp a rate to 0-1; non-finite reads as 0.
pub fn normalize_air(air: f64) -> f64 {
    if air.is_finite() {
        air.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `min(mwd / target, 1)`; a non-positive target yields 0.
pub fn normalize_mwd(mwd: f64, target: f64) -> f64 {
    if target <= 0.0 || !mwd.is_finite() {
        return 0.0;
    }
    (mwd / target).clamp(0.0, 1.0)
}

/// 1-5 pulse to 0-1 via `(p - 1) / 4`, clamped to the scale.
pub fn normalize_pulse(pulse: f64) -> f64 {
    let p = if pulse.is_finite() { pulse } else { PULSE_MIN };
    (p.clamp(PULSE_MIN, PULSE_MAX) - PULSE_MIN) / (PULSE_MAX - PULSE_MIN)
}

/// Team-level aggregates for TII.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TiiInputs {
    pub avg_air: f64,
    pub avg_mwd: f64,
    /// Team Stability Pulse, 1-5
    pub tsp: f64,
}

/// Normalized TII components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TiiComponents {
    pub air_normalized: f64,
    pub mwd_normalized: f64,
    pub tsp_normalized: f64,
}

/// Public TII result. Never carries an individual's AIR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TiiResult {
    pub tii: f64,
    pub avg_air: f64,
    pub avg_mwd: f64,
    pub tsp: f64,
    pub components: TiiComponents,
}

/// Team Integrity Index.
pub fn compute_tii(inputs: &TiiInputs, config: &TiiConfig) -> TiiResult {
    let components = TiiComponents {
        air_normalized: normalize_air(inputs.avg_air),
        mwd_normalized: normalize_mwd(inputs.avg_mwd, config.target_mwd),
        tsp_normalized: normalize_pulse(inputs.tsp),
    };
    let tii = components.air_normalized * config.weight_air
        + components.mwd_normalized * config.weight_mwd
        + components.tsp_normalized * config.weight_tsp;

    TiiResult {
        tii,
        avg_air: inputs.avg_air,
        avg_mwd: inputs.avg_mwd,
        tsp: inputs.tsp,
        components,
    }
}

/// Average per-member AIR and MWD into team inputs. Empty teams average to 0.
pub fn team_tii_inputs(member_air: &[f64], member_mwd: &[f64], tsp: f64) -> TiiInputs {
    let mean = |xs: &[f64]| {
        if xs.is_empty() {
            0.0
        } else {
            xs.iter().sum::<f64>() / xs.len() as f64
        }
    };
    TiiInputs {
        avg_air: mean(member_air),
        avg_mwd: mean(member_mwd),
        tsp,
    }
}

/// Inputs for the readiness index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct LriInputs {
    pub air_14d: f64,
    pub mwd_14d: f64,
    /// Personal responsibility pulse, 1-5
    pub personal_responsibility_pulse: f64,
    pub no_integrity_slip_in_14d: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct LriResult {
    pub lri: f64,
    pub readiness_flag: bool,
    pub reasons: Vec<String>,
}

/// Leadership Readiness Index. Not public; the flag gates promotion.
pub fn compute_lri(inputs: &LriInputs, config: &LriConfig) -> LriResult {
    let air_n = normalize_air(inputs.air_14d);
    let mwd_n = normalize_mwd(inputs.mwd_14d, config.target_mwd);
    let pulse_n = normalize_pulse(inputs.personal_responsibility_pulse);
    let lri = air_n * config.weight_air + mwd_n * config.weight_mwd + pulse_n * config.weight_pulse;

    let mut reasons = vec![
        format!("air_14d={:.2}", inputs.air_14d),
        format!("mwd_normalized={mwd_n:.2}"),
        format!("pulse_normalized={pulse_n:.2}"),
        format!("lri={lri:.2}"),
    ];

    let above = lri >= config.readiness_threshold;
    let readiness_flag = above && inputs.no_integrity_slip_in_14d;
    reasons.push(
        if readiness_flag {
            "readiness_flag=true"
        } else if !above {
            "readiness_flag=false:lri_below_threshold"
        } else {
            "readiness_flag=false:integrity_slip"
        }
        .to_string(),
    );
    debug!(lri, readiness_flag, "Computed readiness index");

    LriResult {
        lri,
        readiness_flag,
        reasons,
    }
}

/// A Certified condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum CertifiedCondition {
    #[serde(rename = "air_14d_ge_80")]
    Air14d,
    #[serde(rename = "mwd_14d_ge_threshold")]
    Mwd14d,
    #[serde(rename = "reset_compliance_met")]
    ResetCompliance,
    #[serde(rename = "no_integrity_slip_in_14d")]
    NoIntegritySlip,
}

/// Inputs for Certified evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct CertifiedInputs {
    pub air_14d: f64,
    pub mwd_14d: f64,
    /// Forced resets completed within their deadline over the last 90 days
    pub reset_compliance_met: bool,
    pub no_integrity_slip_in_14d: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct CertifiedStatus {
    pub current: bool,
    pub reasons_met: Vec<CertifiedCondition>,
    pub reasons_missing: Vec<CertifiedCondition>,
}

/// Certified status for a leader. Re-evaluated on every call.
pub fn certified_status(inputs: &CertifiedInputs, config: &CertifiedConfig) -> CertifiedStatus {
    let checks = [
        (CertifiedCondition::Air14d, inputs.air_14d >= config.air_14d_min),
        (CertifiedCondition::Mwd14d, inputs.mwd_14d >= config.mwd_threshold),
        (CertifiedCondition::ResetCompliance, inputs.reset_compliance_met),
        (CertifiedCondition::NoIntegritySlip, inputs.no_integrity_slip_in_14d),
    ];

    let (met, missing): (Vec<_>, Vec<_>) = checks.into_iter().partition(|(_, ok)| *ok);
    let reasons_met: Vec<_> = met.into_iter().map(|(c, _)| c).collect();
    let reasons_missing: Vec<_> = missing.into_iter().map(|(c, _)| c).collect();

    CertifiedStatus {
        current: reasons_missing.is_empty(),
        reasons_met,
        reasons_missing,
    }
}

/// Promotion needs a ready candidate and a certified approver.
pub fn can_approve_leader_track(candidate_ready: bool, approver_certified: bool) -> bool {
    candidate_ready && approver_certified
}

/// Why a leader-track approval was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ApprovalRefusal {
    CandidateReadinessNotMet,
    ApproverNotCertified,
}

/// Decide a leader-track approval. Candidate readiness is checked first.
pub fn decide_leader_approval(
    candidate: &LriResult,
    approver: &CertifiedStatus,
) -> std::result::Result<(), ApprovalRefusal> {
    if can_approve_leader_track(candidate.readiness_flag, approver.current) {
        Ok(())
    } else if !candidate.readiness_flag {
        Err(ApprovalRefusal::CandidateReadinessNotMet)
    } else {
        Err(ApprovalRefusal::ApproverNotCertified)
    }
}
