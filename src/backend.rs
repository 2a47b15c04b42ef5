use crate::types::{Appointment, NewAppointment};
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("an appointment already exists for this staff member and start time")]
    Conflict,
    #[error("storage failure: {0}")]
    Storage(String),
}

pub trait AppointmentBackend: Clone + Send + Sync + 'static {
    fn appointments_for_staff(&self, staff_id: &str) -> Result<Vec<Appointment>, BackendError>;
    fn appointment_at(
        &self,
        staff_id: &str,
        start_time: NaiveDateTime,
    ) -> Result<Option<Appointment>, BackendError>;
    /// Fails with [`BackendError::Conflict`] when `(staff_id, start_time)` is taken.
    fn insert_appointment(&self, appointment: NewAppointment)
        -> Result<Appointment, BackendError>;
}
