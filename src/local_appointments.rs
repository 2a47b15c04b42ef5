use crate::{
    backend::{AppointmentBackend, BackendError},
    types::{Appointment, NewAppointment},
};
use chrono::NaiveDateTime;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

#[derive(Debug, Default)]
struct Inner {
    next_id: i32,
    appointments: BTreeMap<(String, NaiveDateTime), Appointment>,
}

/// Non-persistent store used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct LocalAppointments {
    inner: Arc<Mutex<Inner>>,
}

impl LocalAppointments {
    fn lock(&self) -> Result<MutexGuard<'_, Inner>, BackendError> {
        self.inner
            .lock()
            .map_err(|err| BackendError::Storage(format!("appointment store poisoned: {err}")))
    }
}

impl AppointmentBackend for LocalAppointments {
    fn appointments_for_staff(&self, staff_id: &str) -> Result<Vec<Appointment>, BackendError> {
        Ok(self
            .lock()?
            .appointments
            .values()
            .filter(|appointment| appointment.staff_id == staff_id)
            .cloned()
            .collect())
    }

    fn appointment_at(
        &self,
        staff_id: &str,
        start_time: NaiveDateTime,
    ) -> Result<Option<Appointment>, BackendError> {
        Ok(self
            .lock()?
            .appointments
            .get(&(staff_id.to_string(), start_time))
            .cloned())
    }

    fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, BackendError> {
        let mut inner = self.lock()?;
        let key = (appointment.staff_id.clone(), appointment.start_time);
        if inner.appointments.contains_key(&key) {
            return Err(BackendError::Conflict);
        }

        inner.next_id += 1;
        let stored = Appointment {
            id: inner.next_id,
            staff_id: appointment.staff_id,
            start_time: appointment.start_time,
            duration_min: appointment.duration_min,
            name: appointment.name,
            email: appointment.email,
            phone: appointment.phone,
            notes: appointment.notes,
            created_at: appointment.created_at,
        };
        inner.appointments.insert(key, stored.clone());
        Ok(stored)
    }
}
