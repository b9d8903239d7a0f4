//! Activation Integrity Rate (AIR).
//!
//! Rolling-window aggregation over a member's activation log. An activation
//! is a hit when it was completed on or before its due date and the latest
//! verification says it was verified. AIR is hits over activations chosen in
//! the window, and 0 for an empty window.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Kind of activation a member commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ActivationType {
    MicroWin,
    Reset,
}

/// One row of the activation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ActivationRecord {
    pub activation_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub activation_type: ActivationType,
    pub chosen_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Verification flag as stored; the verification log overrides it
    #[serde(default)]
    pub verified: bool,
}

impl ActivationRecord {
    fn is_completed_on_time(&self) -> bool {
        self.completed_at.is_some_and(|c| c <= self.due_at)
    }
}

/// One row of the verification log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct VerificationRecord {
    pub activation_id: String,
    pub verified: bool,
    pub verified_at: DateTime<Utc>,
}

/// Latest verification per activation.
#[derive(Debug, Clone, Default)]
pub struct VerificationLog {
    latest: HashMap<String, VerificationRecord>,
}

impl VerificationLog {
    /// Fold raw records, keeping the newest `verified_at` per activation.
    /// On equal timestamps the later record wins.
    pub fn from_records(records: &[VerificationRecord]) -> Self {
        let mut latest: HashMap<String, VerificationRecord> = HashMap::new();
        for record in records {
            match latest.get(&record.activation_id) {
                Some(existing) if existing.verified_at > record.verified_at => {}
                _ => {
                    latest.insert(record.activation_id.clone(), record.clone());
                }
            }
        }
        Self { latest }
    }

    pub fn latest(&self, activation_id: &str) -> Option<&VerificationRecord> {
        self.latest.get(activation_id)
    }

    /// Effective verification flag: the latest record, else the stored flag.
    pub fn is_verified(&self, activation: &ActivationRecord) -> bool {
        self.latest(&activation.activation_id)
            .map(|v| v.verified)
            .unwrap_or(activation.verified)
    }

    /// Completed, but the latest verification rejected it.
    pub fn is_integrity_slip(&self, activation: &ActivationRecord) -> bool {
        activation.completed_at.is_some()
            && self
                .latest(&activation.activation_id)
                .is_some_and(|v| !v.verified)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

/// Rolling AIR window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum AirWindow {
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "14d")]
    FourteenDays,
    #[serde(rename = "90d")]
    NinetyDays,
}

impl AirWindow {
    pub const ALL: [AirWindow; 3] = [AirWindow::SevenDays, AirWindow::FourteenDays, AirWindow::NinetyDays];

    /// Window length in days.
    pub fn days(&self) -> i64 {
        match self {
            AirWindow::SevenDays => 7,
            AirWindow::FourteenDays => 14,
            AirWindow::NinetyDays => 90,
        }
    }

    /// Inclusive start of the window ending at `as_of`.
    pub fn start(&self, as_of: DateTime<Utc>) -> DateTime<Utc> {
        as_of
            .checked_sub_signed(Duration::days(self.days()))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether `t` falls within the window ending at `as_of`, both ends inclusive.
    pub fn contains(&self, t: DateTime<Utc>, as_of: DateTime<Utc>) -> bool {
        t >= self.start(as_of) && t <= as_of
    }
}

impl fmt::Display for AirWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}

/// AIR for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AirResult {
    pub window: AirWindow,
    /// 0-1
    pub air: f64,
    /// Activations chosen in the window
    pub total: u32,
    pub hits: u32,
    /// Due by `as_of` without a verified on-time completion
    pub missed_windows: u32,
    pub integrity_slip: bool,
}

/// Compute AIR for one window ending at `as_of`.
pub fn compute_air(
    activations: &[ActivationRecord],
    verifications: &VerificationLog,
    window: AirWindow,
    as_of: DateTime<Utc>,
) -> AirResult {
    let mut total = 0u32;
    let mut hits = 0u32;
    let mut missed_windows = 0u32;
    let mut integrity_slip = false;

    for a in activations.iter().filter(|a| window.contains(a.chosen_at, as_of)) {
        total += 1;
        let hit = a.is_completed_on_time() && verifications.is_verified(a);
        if hit {
            hits += 1;
        } else if a.due_at <= as_of {
            missed_windows += 1;
        }
        integrity_slip |= verifications.is_integrity_slip(a);
    }

    let air = if total == 0 {
        0.0
    } else {
        f64::from(hits) / f64::from(total)
    };
    AirResult {
        window,
        air,
        total,
        hits,
        missed_windows,
        integrity_slip,
    }
}

/// AIR for all three windows at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AirSnapshot {
    pub as_of: DateTime<Utc>,
    pub air_7d: AirResult,
    pub air_14d: AirResult,
    pub air_90d: AirResult,
}

impl AirSnapshot {
    /// AIR for the 7, 14 and 90-day windows ending at `as_of`.
    pub fn compute(
        activations: &[ActivationRecord],
        verifications: &VerificationLog,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            as_of,
            air_7d: compute_air(activations, verifications, AirWindow::SevenDays, as_of),
            air_14d: compute_air(activations, verifications, AirWindow::FourteenDays, as_of),
            air_90d: compute_air(activations, verifications, AirWindow::NinetyDays, as_of),
        }
    }

    /// Result for one window.
    pub fn get(&self, window: AirWindow) -> &AirResult {
        match window {
            AirWindow::SevenDays => &self.air_7d,
            AirWindow::FourteenDays => &self.air_14d,
            AirWindow::NinetyDays => &self.air_90d,
        }
    }
}

/// Micro-win density: verified completed micro wins chosen in the window,
/// per day of the window.
pub fn micro_win_density(
    activations: &[ActivationRecord],
    verifications: &VerificationLog,
    window: AirWindow,
    as_of: DateTime<Utc>,
) -> f64 {
    let wins = activations
        .iter()
        .filter(|a| a.activation_type == ActivationType::MicroWin)
        .filter(|a| window.contains(a.chosen_at, as_of))
        .filter(|a| a.completed_at.is_some() && verifications.is_verified(a))
        .count();
    wins as f64 / window.days() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 31, 12, 0, 0).unwrap()
    }

    fn activation(id: &str, chosen_days_ago: i64, due_days_ago: i64) -> ActivationRecord {
        ActivationRecord {
            activation_id: id.to_string(),
            user_id: "u-1".to_string(),
            activation_type: ActivationType::MicroWin,
            chosen_at: as_of() - Duration::days(chosen_days_ago),
            due_at: as_of() - Duration::days(due_days_ago),
            completed_at: None,
            verified: false,
        }
    }

    fn completed(mut a: ActivationRecord, days_after_due: i64, verified: bool) -> ActivationRecord {
        a.completed_at = Some(a.due_at + Duration::days(days_after_due));
        a.verified = verified;
        a
    }

    fn verification(id: &str, verified: bool, hours_ago: i64) -> VerificationRecord {
        VerificationRecord {
            activation_id: id.to_string(),
            verified,
            verified_at: as_of() - Duration::hours(hours_ago),
        }
    }

    #[test]
    fn test_empty_window_is_zero() {
        let result = compute_air(&[], &VerificationLog::default(), AirWindow::SevenDays, as_of());
        assert_eq!(result.air, 0.0);
        assert_eq!(result.total, 0);
        assert!(!result.integrity_slip);
    }

    #[test]
    fn test_hits_require_on_time_and_verified() {
        let log = vec![
            completed(activation("a", 6, 4), 0, true),  // hit
            completed(activation("b", 6, 4), 1, true),  // late
            completed(activation("c", 5, 3), -1, false), // unverified
            activation("d", 3, -2),                      // not yet due
        ];
        let result = compute_air(&log, &VerificationLog::default(), AirWindow::SevenDays, as_of());
        assert_eq!(result.total, 4);
        assert_eq!(result.hits, 1);
        assert_eq!(result.air, 0.25);
        assert_eq!(result.missed_windows, 2);
    }

    #[test]
    fn test_windows_filter_on_chosen_at() {
        let log = vec![
            completed(activation("a", 3, 2), 0, true),
            completed(activation("b", 10, 9), 0, true),
            activation("c", 40, 38),
        ];
        let snapshot = AirSnapshot::compute(&log, &VerificationLog::default(), as_of());
        assert_eq!(snapshot.air_7d.total, 1);
        assert_eq!(snapshot.air_14d.total, 2);
        assert_eq!(snapshot.air_14d.air, 1.0);
        assert_eq!(snapshot.air_90d.total, 3);
        assert_eq!(snapshot.get(AirWindow::NinetyDays).missed_windows, 1);
    }

    #[test]
    fn test_window_start_is_inclusive() {
        let on_edge = completed(activation("edge", 7, 6), 0, true);
        let past_edge = ActivationRecord {
            chosen_at: on_edge.chosen_at - Duration::seconds(1),
            activation_id: "past".to_string(),
            ..on_edge.clone()
        };
        assert!(AirWindow::SevenDays.contains(on_edge.chosen_at, as_of()));

        let result = compute_air(
            &[on_edge, past_edge],
            &VerificationLog::default(),
            AirWindow::SevenDays,
            as_of(),
        );
        assert_eq!(result.total, 1);
        assert_eq!(result.hits, 1);
        assert_eq!(result.air, 1.0);
    }

    #[test]
    fn test_rejection_outside_window_is_not_a_slip() {
        let log = vec![
            completed(activation("old", 10, 9), 0, true),
            completed(activation("new", 3, 2), 0, true),
        ];
        let verifications = VerificationLog::from_records(&[verification("old", false, 1)]);

        let result = compute_air(&log, &verifications, AirWindow::SevenDays, as_of());
        assert_eq!(result.total, 1);
        assert_eq!(result.hits, 1);
        assert!(!result.integrity_slip);

        let wider = compute_air(&log, &verifications, AirWindow::FourteenDays, as_of());
        assert!(wider.integrity_slip);
    }

    #[test]
    fn test_latest_verification_wins() {
        let log = vec![completed(activation("a", 6, 4), 0, false)];
        let verifications = VerificationLog::from_records(&[
            verification("a", false, 30),
            verification("a", true, 2),
        ]);
        let result = compute_air(&log, &verifications, AirWindow::SevenDays, as_of());
        assert_eq!(result.hits, 1);
        assert!(!result.integrity_slip);
    }

    #[test]
    fn test_integrity_slip_from_latest_rejection() {
        let log = vec![completed(activation("a", 6, 4), 0, true)];
        let verifications = VerificationLog::from_records(&[
            verification("a", true, 30),
            verification("a", false, 2),
        ]);
        let result = compute_air(&log, &verifications, AirWindow::SevenDays, as_of());
        assert_eq!(result.hits, 0);
        assert!(result.integrity_slip);

        // No verification record is not a slip
        let result = compute_air(
            &[completed(activation("b", 6, 4), 0, false)],
            &VerificationLog::default(),
            AirWindow::SevenDays,
            as_of(),
        );
        assert!(!result.integrity_slip);
    }

    #[test]
    fn test_equal_timestamps_later_record_wins() {
        let log = VerificationLog::from_records(&[verification("a", true, 5), verification("a", false, 5)]);
        assert_eq!(log.latest("a").map(|v| v.verified), Some(false));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_micro_win_density() {
        let mut reset = completed(activation("r", 2, 1), 0, true);
        reset.activation_type = ActivationType::Reset;
        let log = vec![
            completed(activation("a", 3, 2), 0, true),
            completed(activation("b", 4, 3), 2, true),
            reset,
        ];
        let mwd = micro_win_density(&log, &VerificationLog::default(), AirWindow::SevenDays, as_of());
        assert!((mwd - 2.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_record_wire_shape() {
        let json = serde_json::to_value(activation("a", 1, 0)).unwrap();
        assert_eq!(json["type"], "micro_win");
        assert_eq!(serde_json::to_string(&AirWindow::FourteenDays).unwrap(), "\"14d\"");
    }
}
