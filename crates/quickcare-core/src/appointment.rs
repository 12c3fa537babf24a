use crate::error::{CoreError, Result};
use crate::time::{now_utc, SlotTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Lifecycle state of an appointment.
///
/// Only `Scheduled` appointments block a (doctor, date, time) slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no-show",
        }
    }

    /// Whether this appointment occupies its slot.
    pub fn blocks_slot(&self) -> bool {
        matches!(self, Self::Scheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "no-show" => Ok(Self::NoShow),
            other => Err(CoreError::invalid_status(other)),
        }
    }
}

pub const DEFAULT_DURATION_MINUTES: u32 = 30;

/// A booked visit between a patient and a doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: Date,
    pub time: SlotTime,
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Appointment {
    /// Creates a new scheduled appointment with generated ID.
    pub fn new(patient_id: Uuid, doctor_id: Uuid, date: Date, time: SlotTime) -> Self {
        let now = now_utc();
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            date,
            time,
            status: AppointmentStatus::Scheduled,
            reason: None,
            notes: None,
            duration: DEFAULT_DURATION_MINUTES,
            location: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now_utc();
    }

    /// Returns `true` if `user_id` is a party to this appointment.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.patient_id == user_id || self.doctor_id == user_id
    }

    /// Returns `true` if this appointment holds the given slot.
    pub fn occupies(&self, doctor_id: Uuid, date: Date, time: &SlotTime) -> bool {
        self.status.blocks_slot()
            && self.doctor_id == doctor_id
            && self.date == date
            && &self.time == time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn sample() -> Appointment {
        Appointment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            date!(2026 - 09 - 01),
            "09:30".parse().unwrap(),
        )
    }

    #[test]
    fn test_status_round_trip() {
        for s in ["scheduled", "completed", "cancelled", "no-show"] {
            let status: AppointmentStatus = s.parse().unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!("pending".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn test_status_serde_kebab_case() {
        let json = serde_json::to_string(&AppointmentStatus::NoShow).unwrap();
        assert_eq!(json, "\"no-show\"");
    }

    #[test]
    fn test_only_scheduled_blocks_slot() {
        assert!(AppointmentStatus::Scheduled.blocks_slot());
        assert!(!AppointmentStatus::Completed.blocks_slot());
        assert!(!AppointmentStatus::Cancelled.blocks_slot());
        assert!(!AppointmentStatus::NoShow.blocks_slot());
    }

    #[test]
    fn test_occupies() {
        let appt = sample();
        assert!(appt.occupies(appt.doctor_id, appt.date, &appt.time));
        // Different time frees the slot
        assert!(!appt.occupies(appt.doctor_id, appt.date, &"10:00".parse().unwrap()));
        // Cancelled appointments do not hold slots
        let mut cancelled = sample();
        cancelled.status = AppointmentStatus::Cancelled;
        assert!(!cancelled.occupies(cancelled.doctor_id, cancelled.date, &cancelled.time));
    }

    #[test]
    fn test_involves() {
        let appt = sample();
        assert!(appt.involves(appt.patient_id));
        assert!(appt.involves(appt.doctor_id));
        assert!(!appt.involves(Uuid::new_v4()));
    }

    #[test]
    fn test_wire_format() {
        let appt = sample();
        let json = serde_json::to_value(&appt).unwrap();
        assert_eq!(json["status"], "scheduled");
        assert_eq!(json["duration"], 30);
        assert!(json.get("patientId").is_some());
        assert!(json.get("doctorId").is_some());
        assert!(json.get("reason").is_none());
    }
}
