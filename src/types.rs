use crate::schema::appointments;
use chrono::{NaiveDateTime, Timelike};
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable)]
pub struct Appointment {
    pub id: i32,
    pub staff_id: String,
    pub start_time: NaiveDateTime,
    pub duration_min: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = appointments)]
pub struct NewAppointment {
    pub staff_id: String,
    pub start_time: NaiveDateTime,
    pub duration_min: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
    pub created_at: NaiveDateTime,
}

/// Details the client supplies alongside a booking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

pub fn truncate_to_minute(datetime: NaiveDateTime) -> NaiveDateTime {
    datetime
        .with_second(0)
        .and_then(|datetime| datetime.with_nanosecond(0))
        .unwrap_or(datetime)
}
