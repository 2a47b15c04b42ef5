use crate::{
    backend::AppointmentBackend,
    clock::Clock,
    error::BookingError,
    messages::appointment_notification,
    notifier::{Delivery, Notifier},
    slot_generator::generate_slots,
    staff_directory::StaffDirectory,
    types::{truncate_to_minute, Appointment, ClientInfo, NewAppointment, Staff},
};
use chrono::NaiveDateTime;
use std::{collections::HashSet, sync::Arc};
use tracing::{info, warn};

pub const DEFAULT_DURATION_MIN: i32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    Sent,
    Discarded,
    Failed(String),
}

/// A persisted booking and what became of the staff notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingOutcome {
    pub appointment: Appointment,
    pub notification: NotificationStatus,
}

#[derive(Clone)]
pub struct BookingService<B: AppointmentBackend> {
    backend: B,
    staff_directory: Arc<StaffDirectory>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    site_name: Arc<str>,
}

impl<B: AppointmentBackend> BookingService<B> {
    pub fn new(
        backend: B,
        staff_directory: Arc<StaffDirectory>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        site_name: &str,
    ) -> Self {
        Self {
            backend,
            staff_directory,
            notifier,
            clock,
            site_name: Arc::from(site_name),
        }
    }

    pub fn list_staff(&self) -> &[Staff] {
        self.staff_directory.list_staff()
    }

    fn resolve_staff(&self, staff_id: &str) -> Result<&Staff, BookingError> {
        self.staff_directory
            .find(staff_id)
            .ok_or(BookingError::NotFound)
    }

    /// Free slots for `staff_id` over the next `horizon_days` days.
    pub fn availability(
        &self,
        staff_id: &str,
        horizon_days: u32,
    ) -> Result<Vec<NaiveDateTime>, BookingError> {
        self.resolve_staff(staff_id)?;

        let booked: HashSet<NaiveDateTime> = self
            .backend
            .appointments_for_staff(staff_id)?
            .into_iter()
            .map(|appointment| truncate_to_minute(appointment.start_time))
            .collect();

        Ok(generate_slots(&booked, horizon_days, self.clock.now()))
    }

    pub fn create_appointment(
        &self,
        staff_id: &str,
        start_time: NaiveDateTime,
        duration_min: i32,
        client: ClientInfo,
    ) -> Result<BookingOutcome, BookingError> {
        let staff = self.resolve_staff(staff_id)?;

        let start_time = truncate_to_minute(start_time);
        let now = self.clock.now();
        if start_time <= now {
            return Err(BookingError::InvalidRequest);
        }

        if self.backend.appointment_at(staff_id, start_time)?.is_some() {
            return Err(BookingError::Conflict);
        }

        // The unique index still guards against a concurrent insert.
        let appointment = self.backend.insert_appointment(NewAppointment {
            staff_id: staff.id.clone(),
            start_time,
            duration_min,
            name: client.name,
            email: client.email,
            phone: client.phone.unwrap_or_default(),
            notes: client.notes.unwrap_or_default(),
            created_at: self.clock.now(),
        })?;
        info!(
            id = appointment.id,
            staff_id = %appointment.staff_id,
            start_time = %appointment.start_time,
            "Appointment booked"
        );

        let notification = self.notify_staff(staff, &appointment);
        Ok(BookingOutcome {
            appointment,
            notification,
        })
    }

    fn notify_staff(&self, staff: &Staff, appointment: &Appointment) -> NotificationStatus {
        let notification = appointment_notification(&self.site_name, staff, appointment);
        match self.notifier.deliver(&notification) {
            Ok(Delivery::Sent) => NotificationStatus::Sent,
            Ok(Delivery::Discarded) => NotificationStatus::Discarded,
            Err(err) => {
                warn!(
                    id = appointment.id,
                    staff_id = %staff.id,
                    %err,
                    "Appointment stored but staff notification failed"
                );
                NotificationStatus::Failed(err.to_string())
            }
        }
    }
}
