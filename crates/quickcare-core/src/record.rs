use crate::error::{CoreError, Result};
use crate::time::now_utc;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// One prescribed medication within a medical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl Prescription {
    /// Validates the required fields of a prescription item.
    ///
    /// `index` is the zero-based position in the list, used for error messages.
    pub fn validate(&self, index: usize) -> Result<()> {
        let required = [
            ("medication", &self.medication),
            ("dosage", &self.dosage),
            ("frequency", &self.frequency),
            ("duration", &self.duration),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CoreError::invalid_field(
                    format!("prescriptions[{index}].{field}"),
                    "must not be empty",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: u16,
    pub diastolic: u16,
}

/// Vital signs captured during a visit. All measurements optional.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<BloodPressure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    pub test_name: String,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Date>,
}

/// A clinical record authored by a doctor for a patient visit.
///
/// Soft-deleted via `active`; inactive records are excluded from list
/// queries but retained in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
    pub diagnosis: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prescriptions: Vec<Prescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vital_signs: Option<VitalSigns>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lab_results: Vec<LabResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<Date>,
    #[serde(rename = "isActive")]
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl MedicalRecord {
    /// Creates a new active record with generated ID.
    pub fn new(patient_id: Uuid, doctor_id: Uuid, diagnosis: impl Into<String>) -> Self {
        let now = now_utc();
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            appointment_id: None,
            diagnosis: diagnosis.into(),
            symptoms: Vec::new(),
            prescriptions: Vec::new(),
            vital_signs: None,
            lab_results: Vec::new(),
            notes: None,
            follow_up_date: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now_utc();
    }

    /// Returns `true` if `user_id` is the patient or the authoring doctor.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.patient_id == user_id || self.doctor_id == user_id
    }

    /// Validates diagnosis and prescription items.
    pub fn validate(&self) -> Result<()> {
        if self.diagnosis.trim().is_empty() {
            return Err(CoreError::invalid_field("diagnosis", "must not be empty"));
        }
        for (i, item) in self.prescriptions.iter().enumerate() {
            item.validate(i)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prescription() -> Prescription {
        Prescription {
            medication: "Amoxicillin".into(),
            dosage: "500mg".into(),
            frequency: "3x daily".into(),
            duration: "7 days".into(),
            instructions: Some("Take with food".into()),
        }
    }

    #[test]
    fn test_prescription_validation() {
        assert!(prescription().validate(0).is_ok());

        let mut missing = prescription();
        missing.dosage = "  ".into();
        let err = missing.validate(1).unwrap_err();
        assert!(err.to_string().contains("prescriptions[1].dosage"));
    }

    #[test]
    fn test_record_validation() {
        let mut record = MedicalRecord::new(Uuid::new_v4(), Uuid::new_v4(), "Sinusitis");
        record.prescriptions.push(prescription());
        assert!(record.validate().is_ok());

        record.diagnosis = "".into();
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_record_wire_format() {
        let record = MedicalRecord::new(Uuid::new_v4(), Uuid::new_v4(), "Sinusitis");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["isActive"], true);
        assert!(json.get("patientId").is_some());
        // Empty collections are omitted
        assert!(json.get("symptoms").is_none());
        assert!(json.get("prescriptions").is_none());
    }

    #[test]
    fn test_record_involves() {
        let record = MedicalRecord::new(Uuid::new_v4(), Uuid::new_v4(), "Flu");
        assert!(record.involves(record.patient_id));
        assert!(record.involves(record.doctor_id));
        assert!(!record.involves(Uuid::new_v4()));
    }
}
