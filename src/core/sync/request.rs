//! Sync request parameters

use crate::config::HmsCredentials;
use crate::domain::{DataType, DateRange, PatientId};

/// What one sync call should fetch
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub credentials: HmsCredentials,

    /// Patients in scope; an empty list fetches nothing
    pub patient_ids: Vec<PatientId>,

    pub date_range: DateRange,

    pub include_vitals: bool,
    pub include_labs: bool,
    pub include_prescriptions: bool,
    pub include_diagnoses: bool,
}

impl SyncRequest {
    /// Request every data type with no date window
    pub fn new(credentials: HmsCredentials, patient_ids: Vec<PatientId>) -> Self {
        Self {
            credentials,
            patient_ids,
            date_range: DateRange::unbounded(),
            include_vitals: true,
            include_labs: true,
            include_prescriptions: true,
            include_diagnoses: true,
        }
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    /// Restrict the request to the given data types
    pub fn only(mut self, data_types: &[DataType]) -> Self {
        self.include_vitals = data_types.contains(&DataType::Vitals);
        self.include_labs = data_types.contains(&DataType::LabResults);
        self.include_prescriptions = data_types.contains(&DataType::Prescriptions);
        self.include_diagnoses = data_types.contains(&DataType::Diagnoses);
        self
    }

    /// Selected data types in processing order
    pub fn data_types(&self) -> Vec<DataType> {
        DataType::ALL
            .into_iter()
            .filter(|data_type| match data_type {
                DataType::Vitals => self.include_vitals,
                DataType::LabResults => self.include_labs,
                DataType::Prescriptions => self.include_prescriptions,
                DataType::Diagnoses => self.include_diagnoses,
            })
            .collect()
    }
}
