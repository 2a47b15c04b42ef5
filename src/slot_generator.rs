//! Free appointment slots inside business hours.
//!
//! Slots are 30 minutes long and start on the hour or half hour, Monday to
//! Friday between 09:00 and 17:00 local time.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use std::collections::HashSet;

pub const SLOT_MINUTES: i64 = 30;
pub const MIN_HORIZON_DAYS: u32 = 1;
pub const MAX_HORIZON_DAYS: u32 = 60;

const OPENING: NaiveTime = match NaiveTime::from_hms_opt(9, 0, 0) {
    Some(time) => time,
    None => panic!("invalid opening time"),
};
const CLOSING: NaiveTime = match NaiveTime::from_hms_opt(17, 0, 0) {
    Some(time) => time,
    None => panic!("invalid closing time"),
};

fn opening_on(date: NaiveDate) -> NaiveDateTime {
    date.and_time(OPENING)
}

pub fn is_business_time(datetime: NaiveDateTime) -> bool {
    if matches!(datetime.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    let time = datetime.time();
    OPENING <= time && time < CLOSING
}

/// First half-hour boundary strictly after `now`, or today's opening if that is still ahead.
fn first_candidate(now: NaiveDateTime) -> NaiveDateTime {
    let opening = opening_on(now.date());
    if opening >= now {
        return opening;
    }
    let start_of_hour = now.date().and_time(NaiveTime::MIN) + Duration::hours(i64::from(now.hour()));
    let minutes = (i64::from(now.minute()) / SLOT_MINUTES + 1) * SLOT_MINUTES;
    start_of_hour + Duration::minutes(minutes)
}

/// Next opening at or after a cursor that lies outside business hours.
fn next_opening(cursor: NaiveDateTime) -> NaiveDateTime {
    if cursor.time() < OPENING {
        opening_on(cursor.date())
    } else {
        opening_on(cursor.date() + Duration::days(1))
    }
}

/// Free slots between `now` and the end of the horizon, earliest first.
///
/// `horizon_days` must already be validated by the caller; the walk stops once
/// the cursor reaches `now.date() + horizon_days`.
pub fn generate_slots(
    existing_bookings: &HashSet<NaiveDateTime>,
    horizon_days: u32,
    now: NaiveDateTime,
) -> Vec<NaiveDateTime> {
    let end_date = now.date() + Duration::days(i64::from(horizon_days));
    let mut slots = Vec::new();
    let mut cursor = first_candidate(now);

    while cursor.date() < end_date {
        if is_business_time(cursor) {
            if cursor > now && !existing_bookings.contains(&cursor) {
                slots.push(cursor);
            }
            cursor += Duration::minutes(SLOT_MINUTES);
        } else {
            cursor = next_opening(cursor);
        }
    }

    slots
}
