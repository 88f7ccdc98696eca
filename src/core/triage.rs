//! Triage priority classification
//!
//! A pure function from vital signs to queue priority. Rules are checked in
//! order and the first match wins; a missing measurement never triggers a
//! rule.

use crate::domain::VitalSigns;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Queue priority derived from vital signs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriagePriority {
    Routine,
    SemiUrgent,
    Urgent,
}

impl TriagePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriagePriority::Routine => "routine",
            TriagePriority::SemiUrgent => "semi_urgent",
            TriagePriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for TriagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Systolic pressure above which a reading is urgent (mmHg)
pub const URGENT_SYSTOLIC_HIGH: f64 = 180.0;
/// Systolic pressure below which a reading is urgent (mmHg)
pub const URGENT_SYSTOLIC_LOW: f64 = 90.0;
pub const URGENT_HEART_RATE_HIGH: f64 = 120.0;
pub const URGENT_HEART_RATE_LOW: f64 = 50.0;
/// Degrees Celsius
pub const URGENT_TEMPERATURE: f64 = 39.0;
/// Percent
pub const URGENT_SPO2: f64 = 92.0;
pub const SEMI_URGENT_SYSTOLIC: f64 = 160.0;

/// Classifies one reading
pub fn classify(vitals: &VitalSigns) -> TriagePriority {
    classify_with_reasons(vitals).0
}

/// Classifies one reading and names every rule that fired
///
/// Reasons are informational and stored with the queue entry.
pub fn classify_with_reasons(vitals: &VitalSigns) -> (TriagePriority, Vec<String>) {
    let mut urgent = Vec::new();

    if let Some(systolic) = vitals.systolic_bp {
        if systolic > URGENT_SYSTOLIC_HIGH {
            urgent.push(format!("systolic_bp {systolic} > {URGENT_SYSTOLIC_HIGH}"));
        } else if systolic < URGENT_SYSTOLIC_LOW {
            urgent.push(format!("systolic_bp {systolic} < {URGENT_SYSTOLIC_LOW}"));
        }
    }

    if let Some(heart_rate) = vitals.heart_rate {
        if heart_rate > URGENT_HEART_RATE_HIGH {
            urgent.push(format!("heart_rate {heart_rate} > {URGENT_HEART_RATE_HIGH}"));
        } else if heart_rate < URGENT_HEART_RATE_LOW {
            urgent.push(format!("heart_rate {heart_rate} < {URGENT_HEART_RATE_LOW}"));
        }
    }

    if let Some(temperature) = vitals.temperature {
        if temperature > URGENT_TEMPERATURE {
            urgent.push(format!("temperature {temperature} > {URGENT_TEMPERATURE}"));
        }
    }

    if let Some(spo2) = vitals.oxygen_saturation {
        if spo2 < URGENT_SPO2 {
            urgent.push(format!("oxygen_saturation {spo2} < {URGENT_SPO2}"));
        }
    }

    if !urgent.is_empty() {
        return (TriagePriority::Urgent, urgent);
    }

    match vitals.systolic_bp {
        Some(systolic) if systolic > SEMI_URGENT_SYSTOLIC => (
            TriagePriority::SemiUrgent,
            vec![format!("systolic_bp {systolic} > {SEMI_URGENT_SYSTOLIC}")],
        ),
        _ => (TriagePriority::Routine, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PatientId;
    use chrono::Utc;
    use test_case::test_case;

    fn normal() -> VitalSigns {
        let mut vitals = VitalSigns::new(PatientId::new("P-1").unwrap(), Utc::now());
        vitals.systolic_bp = Some(120.0);
        vitals.diastolic_bp = Some(80.0);
        vitals.heart_rate = Some(70.0);
        vitals.temperature = Some(37.0);
        vitals.oxygen_saturation = Some(98.0);
        vitals
    }

    #[test]
    fn test_normal_vitals_are_routine() {
        assert_eq!(classify(&normal()), TriagePriority::Routine);
    }

    #[test_case(|v: &mut VitalSigns| v.systolic_bp = Some(200.0), TriagePriority::Urgent; "systolic 200")]
    #[test_case(|v: &mut VitalSigns| v.systolic_bp = Some(170.0), TriagePriority::SemiUrgent; "systolic 170")]
    #[test_case(|v: &mut VitalSigns| v.systolic_bp = Some(180.0), TriagePriority::SemiUrgent; "systolic 180 boundary")]
    #[test_case(|v: &mut VitalSigns| v.systolic_bp = Some(160.0), TriagePriority::Routine; "systolic 160 boundary")]
    #[test_case(|v: &mut VitalSigns| v.systolic_bp = Some(85.0), TriagePriority::Urgent; "hypotension")]
    #[test_case(|v: &mut VitalSigns| v.heart_rate = Some(130.0), TriagePriority::Urgent; "tachycardia")]
    #[test_case(|v: &mut VitalSigns| v.heart_rate = Some(45.0), TriagePriority::Urgent; "bradycardia")]
    #[test_case(|v: &mut VitalSigns| v.temperature = Some(39.5), TriagePriority::Urgent; "fever")]
    #[test_case(|v: &mut VitalSigns| v.temperature = Some(39.0), TriagePriority::Routine; "temperature 39 boundary")]
    #[test_case(|v: &mut VitalSigns| v.oxygen_saturation = Some(90.0), TriagePriority::Urgent; "hypoxia")]
    #[test_case(|v: &mut VitalSigns| v.oxygen_saturation = Some(92.0), TriagePriority::Routine; "spo2 92 boundary")]
    fn test_single_abnormal_value(adjust: fn(&mut VitalSigns), expected: TriagePriority) {
        let mut vitals = normal();
        adjust(&mut vitals);
        assert_eq!(classify(&vitals), expected);
    }

    #[test]
    fn test_missing_fields_never_raise_priority() {
        let vitals = VitalSigns::new(PatientId::new("P-1").unwrap(), Utc::now());
        assert_eq!(classify(&vitals), TriagePriority::Routine);
    }

    #[test]
    fn test_urgent_rule_wins_over_semi_urgent() {
        let mut vitals = normal();
        vitals.systolic_bp = Some(170.0);
        vitals.oxygen_saturation = Some(88.0);

        let (priority, reasons) = classify_with_reasons(&vitals);
        assert_eq!(priority, TriagePriority::Urgent);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].starts_with("oxygen_saturation"));
    }

    #[test]
    fn test_priority_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(TriagePriority::SemiUrgent).unwrap(),
            serde_json::json!("semi_urgent")
        );
    }
}
