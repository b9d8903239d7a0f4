//! Arena choice engine.
//!
//! Pure decision functions behind scenario submissions: XP awarded for a
//! choice, the tags recorded with it and the system message shown. Nothing
//! here touches storage; the caller persists the returned delta.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Bonus XP for a choice that shows positive integrity.
pub const INTEGRITY_BONUS_XP: u32 = 5;

/// XP at or above which a result is tagged `xp:high`.
pub const XP_HIGH_THRESHOLD: u32 = 90;

/// XP at or above which a result is tagged `xp:mid`.
pub const XP_MID_THRESHOLD: u32 = 60;

/// Hidden trait movements attached to a choice. Absent traits are zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct HiddenDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resilience: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gratitude: Option<f64>,
}

impl HiddenDelta {
    pub fn integrity(&self) -> f64 {
        finite_or_zero(self.integrity)
    }

    pub fn gratitude(&self) -> f64 {
        finite_or_zero(self.gratitude)
    }
}

/// System message category shown after a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SystemMessageId {
    ArchInit,
    Telemetry,
    Gratitude,
    Consistency,
    Integrity,
    Unknown,
}

/// A scenario choice to evaluate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct EngineChoiceInput {
    pub scenario_id: String,
    pub choice_id: String,
    #[serde(default)]
    pub intent: Option<String>,
    pub xp_base: f64,
    /// Multiplier; absent means 1
    #[serde(default)]
    pub difficulty: Option<f64>,
    #[serde(default)]
    pub hidden_delta: Option<HiddenDelta>,
}

/// A follow-up selection after a choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct EngineFollowUpInput {
    pub scenario_id: String,
    pub choice_id: String,
    pub follow_up_index: u32,
}

/// Outcome of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct EngineOutput {
    pub xp: u32,
    pub deltas: HiddenDelta,
    /// Aggregation tags for league and dashboard queries
    pub tags: Vec<String>,
    pub system_message_id: SystemMessageId,
}

fn finite_or_zero(v: Option<f64>) -> f64 {
    v.filter(|x| x.is_finite()).unwrap_or(0.0)
}

/// XP for a base value and difficulty: `max(0, round(base * difficulty))`.
///
/// Missing difficulty counts as 1; non-finite inputs count as 0.
pub fn compute_xp(xp_base: f64, difficulty: Option<f64>) -> u32 {
    let base = finite_or_zero(Some(xp_base));
    let diff = match difficulty {
        None => 1.0,
        some => finite_or_zero(some),
    };
    let rounded = (base * diff).round();
    if rounded <= 0.0 {
        0
    } else {
        rounded.min(f64::from(u32::MAX)) as u32
    }
}

/// Pick the system message. First matching rule wins:
/// gratitude >= 2, then integrity >= 3, then xp >= 90, else the default.
pub fn pick_system_message_id(xp: u32, deltas: &HiddenDelta) -> SystemMessageId {
    if deltas.gratitude() >= 2.0 {
        return SystemMessageId::Gratitude;
    }
    if deltas.integrity() >= 3.0 {
        return SystemMessageId::Integrity;
    }
    if xp >= XP_HIGH_THRESHOLD {
        return SystemMessageId::Telemetry;
    }
    SystemMessageId::ArchInit
}

/// XP band tag.
pub fn xp_band_tag(xp: u32) -> &'static str {
    if xp >= XP_HIGH_THRESHOLD {
        "xp:high"
    } else if xp >= XP_MID_THRESHOLD {
        "xp:mid"
    } else {
        "xp:low"
    }
}

/// Evaluate a scenario choice.
pub fn evaluate_choice(input: &EngineChoiceInput) -> EngineOutput {
    let deltas = input.hidden_delta.clone().unwrap_or_default();
    let mut xp = compute_xp(input.xp_base, input.difficulty);
    if deltas.integrity() > 0.0 {
        xp = xp.saturating_add(INTEGRITY_BONUS_XP);
    }

    let intent = input
        .intent
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown");
    let tags = vec![
        format!("scenario:{}", input.scenario_id),
        format!("choice:{}", input.choice_id),
        format!("intent:{}", intent),
        xp_band_tag(xp).to_string(),
    ];

    let system_message_id = pick_system_message_id(xp, &deltas);
    EngineOutput {
        xp,
        deltas,
        tags,
        system_message_id,
    }
}

/// Evaluate a follow-up. Follow-ups never award XP.
pub fn evaluate_follow_up(_input: &EngineFollowUpInput) -> EngineOutput {
    EngineOutput {
        xp: 0,
        deltas: HiddenDelta::default(),
        tags: vec!["followup:selected".to_string()],
        system_message_id: SystemMessageId::ArchInit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(xp_base: f64, difficulty: Option<f64>, delta: HiddenDelta) -> EngineChoiceInput {
        EngineChoiceInput {
            scenario_id: "sc-1".to_string(),
            choice_id: "c-2".to_string(),
            intent: None,
            xp_base,
            difficulty,
            hidden_delta: Some(delta),
        }
    }

    #[test]
    fn test_compute_xp() {
        assert_eq!(compute_xp(60.0, Some(1.2)), 72);
        assert_eq!(compute_xp(50.0, None), 50);
        assert_eq!(compute_xp(10.0, Some(0.25)), 3); // 2.5 rounds up
        assert_eq!(compute_xp(-40.0, Some(1.0)), 0);
        assert_eq!(compute_xp(40.0, Some(-2.0)), 0);
        assert_eq!(compute_xp(f64::NAN, Some(2.0)), 0);
        assert_eq!(compute_xp(40.0, Some(f64::INFINITY)), 0);
    }

    #[test]
    fn test_integrity_bonus_and_default_message() {
        let out = evaluate_choice(&choice(
            60.0,
            Some(1.2),
            HiddenDelta {
                integrity: Some(2.0),
                ..Default::default()
            },
        ));
        assert_eq!(out.xp, 77);
        assert!(out.tags.contains(&"xp:mid".to_string()));
        assert!(out.tags.contains(&"intent:unknown".to_string()));
        assert_eq!(out.system_message_id, SystemMessageId::ArchInit);
    }

    #[test]
    fn test_no_bonus_without_positive_integrity() {
        let out = evaluate_choice(&choice(
            100.0,
            None,
            HiddenDelta {
                integrity: Some(-1.0),
                ..Default::default()
            },
        ));
        assert_eq!(out.xp, 100);
        assert_eq!(out.tags[3], "xp:high");
        assert_eq!(out.system_message_id, SystemMessageId::Telemetry);
    }

    #[test]
    fn test_message_priority_cascade() {
        let both = HiddenDelta {
            gratitude: Some(2.0),
            integrity: Some(5.0),
            ..Default::default()
        };
        assert_eq!(pick_system_message_id(120, &both), SystemMessageId::Gratitude);

        let integrity = HiddenDelta {
            integrity: Some(3.0),
            ..Default::default()
        };
        assert_eq!(pick_system_message_id(120, &integrity), SystemMessageId::Integrity);
        assert_eq!(pick_system_message_id(90, &HiddenDelta::default()), SystemMessageId::Telemetry);
        assert_eq!(pick_system_message_id(89, &HiddenDelta::default()), SystemMessageId::ArchInit);
    }

    #[test]
    fn test_tags() {
        let mut input = choice(10.0, None, HiddenDelta::default());
        input.intent = Some("delegate".to_string());
        let out = evaluate_choice(&input);
        assert_eq!(
            out.tags,
            vec!["scenario:sc-1", "choice:c-2", "intent:delegate", "xp:low"]
        );
    }

    #[test]
    fn test_follow_up_awards_nothing() {
        let out = evaluate_follow_up(&EngineFollowUpInput {
            scenario_id: "sc-1".to_string(),
            choice_id: "c-2".to_string(),
            follow_up_index: 3,
        });
        assert_eq!(out.xp, 0);
        assert_eq!(out.tags, vec!["followup:selected"]);
        assert_eq!(out.deltas, HiddenDelta::default());
    }

    #[test]
    fn test_output_wire_shape() {
        let out = evaluate_follow_up(&EngineFollowUpInput::default());
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["system_message_id"], "arch_init");
        assert_eq!(json["deltas"], serde_json::json!({}));
    }
}
