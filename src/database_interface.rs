use crate::schema::appointments::dsl::*;
use crate::types::{Appointment, NewAppointment};
use crate::{
    backend::{AppointmentBackend, BackendError},
    schema::appointments,
};
use chrono::NaiveDateTime;
use diesel::connection::SimpleConnection;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::result::OptionalExtension;
use diesel::{Connection, ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

const CREATE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS appointments (
        id           SERIAL PRIMARY KEY,
        staff_id     VARCHAR(64)  NOT NULL,
        start_time   TIMESTAMP    NOT NULL,
        duration_min INTEGER      NOT NULL DEFAULT 30,
        name         VARCHAR(120) NOT NULL,
        email        VARCHAR(200) NOT NULL,
        phone        VARCHAR(64)  NOT NULL DEFAULT '',
        notes        TEXT         NOT NULL DEFAULT '',
        created_at   TIMESTAMP    NOT NULL DEFAULT NOW()
    );

    CREATE INDEX IF NOT EXISTS idx_appointments_staff_id
        ON appointments (staff_id);

    CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_staff_start
        ON appointments (staff_id, start_time);
";

#[derive(Debug, Error)]
pub enum DatabaseSetupError {
    #[error(transparent)]
    Connection(#[from] diesel::ConnectionError),
    #[error("failed to create schema: {0}")]
    Schema(#[from] DieselError),
}

#[derive(Clone)]
pub struct DatabaseInterface {
    connection: Arc<Mutex<PgConnection>>,
}

impl DatabaseInterface {
    pub fn new(database_url: &str) -> Result<Self, DatabaseSetupError> {
        let mut connection = Self::establish_connection(database_url)?;
        connection.batch_execute(CREATE_SCHEMA)?;
        info!("Appointment schema ready");

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn establish_connection(database_url: &str) -> Result<PgConnection, diesel::ConnectionError> {
        PgConnection::establish(database_url)
    }

    fn lock(&self) -> Result<MutexGuard<'_, PgConnection>, BackendError> {
        self.connection
            .lock()
            .map_err(|err| BackendError::Storage(format!("database connection poisoned: {err}")))
    }
}

impl From<DieselError> for BackendError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                BackendError::Conflict
            }
            err => BackendError::Storage(err.to_string()),
        }
    }
}

impl AppointmentBackend for DatabaseInterface {
    fn appointments_for_staff(
        &self,
        requested_staff: &str,
    ) -> Result<Vec<Appointment>, BackendError> {
        let mut connection = self.lock()?;
        let result = appointments
            .filter(staff_id.eq(requested_staff))
            .order(start_time.asc())
            .load::<Appointment>(&mut *connection)?;
        Ok(result)
    }

    fn appointment_at(
        &self,
        requested_staff: &str,
        requested_start: NaiveDateTime,
    ) -> Result<Option<Appointment>, BackendError> {
        let mut connection = self.lock()?;
        let result = appointments
            .filter(staff_id.eq(requested_staff))
            .filter(start_time.eq(requested_start))
            .first::<Appointment>(&mut *connection)
            .optional()?;
        Ok(result)
    }

    fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, BackendError> {
        let mut connection = self.lock()?;
        let stored = diesel::insert_into(appointments::table)
            .values(&appointment)
            .get_result::<Appointment>(&mut *connection)?;
        debug!(id = stored.id, staff_id = %stored.staff_id, "Appointment inserted");
        Ok(stored)
    }
}
