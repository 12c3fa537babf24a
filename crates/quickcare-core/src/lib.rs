pub mod appointment;
pub mod error;
pub mod record;
pub mod role;
pub mod time;
pub mod user;

pub use appointment::{Appointment, AppointmentStatus};
pub use error::{CoreError, Result};
pub use record::{LabResult, MedicalRecord, Prescription, VitalSigns};
pub use role::Role;
pub use time::{now_utc, SlotTime};
pub use user::{Gender, User};
