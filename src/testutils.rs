use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use chrono::NaiveDateTime;

use crate::{
    backend::{AppointmentBackend, BackendError},
    types::{Appointment, NewAppointment},
};

pub struct MockAppointmentBackendInner {
    pub success: AtomicBool,
    pub insert_conflicts: AtomicBool,
    pub calls_to_appointments_for_staff: AtomicU64,
    pub calls_to_appointment_at: AtomicU64,
    pub calls_to_insert_appointment: AtomicU64,
}

/// Backend that never holds data; it counts calls and fails on request.
#[derive(Clone)]
pub struct MockAppointmentBackend(pub Arc<MockAppointmentBackendInner>);

impl MockAppointmentBackendInner {
    fn new() -> Self {
        Self {
            success: AtomicBool::new(true),
            insert_conflicts: AtomicBool::new(false),
            calls_to_appointments_for_staff: AtomicU64::default(),
            calls_to_appointment_at: AtomicU64::default(),
            calls_to_insert_appointment: AtomicU64::default(),
        }
    }
}

impl MockAppointmentBackend {
    pub fn new() -> Self {
        Self(Arc::new(MockAppointmentBackendInner::new()))
    }

    fn result(&self) -> Result<(), BackendError> {
        match self.0.success.load(Ordering::SeqCst) {
            true => Ok(()),
            false => Err(BackendError::Storage("Supposed to fail".into())),
        }
    }
}

impl AppointmentBackend for MockAppointmentBackend {
    fn appointments_for_staff(&self, _staff_id: &str) -> Result<Vec<Appointment>, BackendError> {
        self.0
            .calls_to_appointments_for_staff
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(vec![])
    }

    fn appointment_at(
        &self,
        _staff_id: &str,
        _start_time: NaiveDateTime,
    ) -> Result<Option<Appointment>, BackendError> {
        self.0.calls_to_appointment_at.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(None)
    }

    fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, BackendError> {
        let calls = self
            .0
            .calls_to_insert_appointment
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        if self.0.insert_conflicts.load(Ordering::SeqCst) {
            return Err(BackendError::Conflict);
        }
        Ok(Appointment {
            id: i32::try_from(calls + 1).unwrap_or(i32::MAX),
            staff_id: appointment.staff_id,
            start_time: appointment.start_time,
            duration_min: appointment.duration_min,
            name: appointment.name,
            email: appointment.email,
            phone: appointment.phone,
            notes: appointment.notes,
            created_at: appointment.created_at,
        })
    }
}
