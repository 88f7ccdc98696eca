//! Canonical clinical records
//!
//! These are the normalized, source-independent representations every HMS
//! client produces and the persistence mapper consumes. They are constructed
//! per sync call and dropped once stored.
//!
//! The serde representation is snake_case and doubles as the file-ingestion
//! format, so timestamps accept every format [`parse_timestamp`] understands.
//!
//! [`parse_timestamp`]: super::time::parse_timestamp

use super::ids::PatientId;
use super::time::{deserialize_utc, deserialize_utc_opt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four record types the engine synchronizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Vitals,
    LabResults,
    Prescriptions,
    Diagnoses,
}

impl DataType {
    pub const ALL: [DataType; 4] = [
        DataType::Vitals,
        DataType::LabResults,
        DataType::Prescriptions,
        DataType::Diagnoses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Vitals => "vitals",
            DataType::LabResults => "lab_results",
            DataType::Prescriptions => "prescriptions",
            DataType::Diagnoses => "diagnoses",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "vitals" | "vital_signs" => Ok(DataType::Vitals),
            "labs" | "lab_results" => Ok(DataType::LabResults),
            "prescriptions" => Ok(DataType::Prescriptions),
            "diagnoses" => Ok(DataType::Diagnoses),
            other => Err(format!(
                "Unknown data type '{other}'. Must be one of: vitals, labs, prescriptions, diagnoses"
            )),
        }
    }
}

/// Vital signs captured during one encounter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub patient_id: PatientId,
    #[serde(default)]
    pub encounter_id: Option<String>,
    #[serde(deserialize_with = "deserialize_utc")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub systolic_bp: Option<f64>,
    #[serde(default)]
    pub diastolic_bp: Option<f64>,
    #[serde(default)]
    pub heart_rate: Option<f64>,
    /// Degrees Celsius
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub respiratory_rate: Option<f64>,
    /// Percent
    #[serde(default)]
    pub oxygen_saturation: Option<f64>,
    /// Kilograms
    #[serde(default)]
    pub weight: Option<f64>,
    /// Centimetres
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub bmi: Option<f64>,
    #[serde(default)]
    pub recorded_by: Option<String>,
}

impl VitalSigns {
    /// Creates an empty reading for a patient at a point in time
    pub fn new(patient_id: PatientId, timestamp: DateTime<Utc>) -> Self {
        Self {
            patient_id,
            encounter_id: None,
            timestamp,
            systolic_bp: None,
            diastolic_bp: None,
            heart_rate: None,
            temperature: None,
            respiratory_rate: None,
            oxygen_saturation: None,
            weight: None,
            height: None,
            bmi: None,
            recorded_by: None,
        }
    }

    /// True when at least one measurement is present
    pub fn has_measurements(&self) -> bool {
        [
            self.systolic_bp,
            self.diastolic_bp,
            self.heart_rate,
            self.temperature,
            self.respiratory_rate,
            self.oxygen_saturation,
            self.weight,
            self.height,
            self.bmi,
        ]
        .iter()
        .any(Option::is_some)
    }

    /// The reported BMI, or one derived from weight and height
    pub fn effective_bmi(&self) -> Option<f64> {
        if self.bmi.is_some() {
            return self.bmi;
        }
        match (self.weight, self.height) {
            (Some(weight), Some(height)) if weight > 0.0 && height > 0.0 => {
                let metres = height / 100.0;
                Some(((weight / (metres * metres)) * 10.0).round() / 10.0)
            }
            _ => None,
        }
    }
}

/// Lifecycle of a lab order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabStatus {
    Pending,
    #[default]
    Completed,
    Cancelled,
}

impl LabStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabStatus::Pending => "pending",
            LabStatus::Completed => "completed",
            LabStatus::Cancelled => "cancelled",
        }
    }
}

/// A laboratory result, keyed by (patient, test_name, ordered_date)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
    pub patient_id: PatientId,
    #[serde(default)]
    pub order_id: Option<String>,
    pub test_name: String,
    #[serde(default)]
    pub test_code: Option<String>,
    #[serde(default)]
    pub result_value: Option<String>,
    #[serde(default)]
    pub result_numeric: Option<f64>,
    #[serde(default)]
    pub reference_range: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub status: LabStatus,
    #[serde(deserialize_with = "deserialize_utc")]
    pub ordered_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_utc_opt")]
    pub result_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ordered_by: Option<String>,
    #[serde(default)]
    pub resulted_by: Option<String>,
}

impl LabResult {
    pub fn new(
        patient_id: PatientId,
        test_name: impl Into<String>,
        ordered_date: DateTime<Utc>,
    ) -> Self {
        Self {
            patient_id,
            order_id: None,
            test_name: test_name.into(),
            test_code: None,
            result_value: None,
            result_numeric: None,
            reference_range: None,
            units: None,
            status: LabStatus::default(),
            ordered_date,
            result_date: None,
            ordered_by: None,
            resulted_by: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl PrescriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Active => "active",
            PrescriptionStatus::Completed => "completed",
            PrescriptionStatus::Cancelled => "cancelled",
        }
    }
}

/// A medication order; append-only in the target store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub patient_id: PatientId,
    #[serde(default)]
    pub encounter_id: Option<String>,
    pub medication_name: String,
    #[serde(default)]
    pub medication_code: Option<String>,
    pub dosage: String,
    pub frequency: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(deserialize_with = "deserialize_utc")]
    pub prescribed_date: DateTime<Utc>,
    pub prescribed_by: String,
    #[serde(default)]
    pub status: PrescriptionStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisType {
    #[default]
    Primary,
    Secondary,
    Differential,
}

impl DiagnosisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosisType::Primary => "primary",
            DiagnosisType::Secondary => "secondary",
            DiagnosisType::Differential => "differential",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisStatus {
    #[default]
    Confirmed,
    Provisional,
    RuledOut,
}

impl DiagnosisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosisStatus::Confirmed => "confirmed",
            DiagnosisStatus::Provisional => "provisional",
            DiagnosisStatus::RuledOut => "ruled_out",
        }
    }
}

/// A coded diagnosis; append-only in the target store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub patient_id: PatientId,
    #[serde(default)]
    pub encounter_id: Option<String>,
    pub diagnosis_code: String,
    pub diagnosis_name: String,
    #[serde(default)]
    pub diagnosis_type: DiagnosisType,
    #[serde(default)]
    pub status: DiagnosisStatus,
    #[serde(deserialize_with = "deserialize_utc")]
    pub diagnosed_date: DateTime<Utc>,
    pub diagnosed_by: String,
}

/// Common accessors the mapper and orchestrator need from every record type
pub trait ClinicalRecord: Send + Sync {
    const DATA_TYPE: DataType;

    fn patient_id(&self) -> &PatientId;

    /// The timestamp used for date-range filtering
    fn effective_at(&self) -> DateTime<Utc>;
}

impl ClinicalRecord for VitalSigns {
    const DATA_TYPE: DataType = DataType::Vitals;

    fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    fn effective_at(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl ClinicalRecord for LabResult {
    const DATA_TYPE: DataType = DataType::LabResults;

    fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    fn effective_at(&self) -> DateTime<Utc> {
        self.ordered_date
    }
}

impl ClinicalRecord for Prescription {
    const DATA_TYPE: DataType = DataType::Prescriptions;

    fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    fn effective_at(&self) -> DateTime<Utc> {
        self.prescribed_date
    }
}

impl ClinicalRecord for Diagnosis {
    const DATA_TYPE: DataType = DataType::Diagnoses;

    fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    fn effective_at(&self) -> DateTime<Utc> {
        self.diagnosed_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient() -> PatientId {
        PatientId::new("P-1").unwrap()
    }

    #[test]
    fn test_vitals_has_measurements() {
        let mut vitals = VitalSigns::new(patient(), Utc::now());
        assert!(!vitals.has_measurements());
        vitals.heart_rate = Some(72.0);
        assert!(vitals.has_measurements());
    }

    #[test]
    fn test_effective_bmi_derived_from_weight_and_height() {
        let mut vitals = VitalSigns::new(patient(), Utc::now());
        vitals.weight = Some(70.0);
        vitals.height = Some(175.0);
        assert_eq!(vitals.effective_bmi(), Some(22.9));

        vitals.bmi = Some(30.1);
        assert_eq!(vitals.effective_bmi(), Some(30.1));
    }

    #[test]
    fn test_effective_bmi_missing_height() {
        let mut vitals = VitalSigns::new(patient(), Utc::now());
        vitals.weight = Some(70.0);
        assert_eq!(vitals.effective_bmi(), None);
    }

    #[test]
    fn test_lab_result_defaults_from_json() {
        let lab: LabResult = serde_json::from_value(json!({
            "patient_id": "P-1",
            "test_name": "Hemoglobin",
            "ordered_date": "2024-03-01T08:00:00+03:00"
        }))
        .unwrap();
        assert_eq!(lab.status, LabStatus::Completed);
        assert_eq!(lab.ordered_date.to_rfc3339(), "2024-03-01T05:00:00+00:00");
        assert!(lab.result_date.is_none());
    }

    #[test]
    fn test_diagnosis_status_snake_case() {
        let diagnosis: Diagnosis = serde_json::from_value(json!({
            "patient_id": "P-1",
            "diagnosis_code": "B54",
            "diagnosis_name": "Malaria",
            "diagnosis_type": "differential",
            "status": "ruled_out",
            "diagnosed_date": "2024-03-01",
            "diagnosed_by": "dr.achieng"
        }))
        .unwrap();
        assert_eq!(diagnosis.diagnosis_type, DiagnosisType::Differential);
        assert_eq!(diagnosis.status, DiagnosisStatus::RuledOut);
    }

    #[test]
    fn test_prescription_requires_medication() {
        let result = serde_json::from_value::<Prescription>(json!({
            "patient_id": "P-1",
            "dosage": "500mg",
            "frequency": "BD",
            "prescribed_date": "2024-03-01",
            "prescribed_by": "dr.otieno"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_data_type_from_str() {
        assert_eq!("labs".parse::<DataType>().unwrap(), DataType::LabResults);
        assert_eq!("Lab-Results".parse::<DataType>().unwrap(), DataType::LabResults);
        assert_eq!("VITALS".parse::<DataType>().unwrap(), DataType::Vitals);
        assert!("imaging".parse::<DataType>().is_err());
    }
}
