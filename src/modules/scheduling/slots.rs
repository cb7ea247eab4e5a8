// Working-day slot arithmetic.
//
// The clinic day runs 09:00 to 17:00 UTC. A slot is free when it does not
// overlap any busy interval: `slot_start < busy_end && slot_end > busy_start`.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

pub const WORKDAY_START_HOUR: u32 = 9;
pub const WORKDAY_END_HOUR: u32 = 17;
pub const DEFAULT_SLOT_MINUTES: i64 = 30;

const MIN_SLOT_MINUTES: i64 = 15;
const MAX_SLOT_MINUTES: i64 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub display: String,
}

pub fn clamp_duration(minutes: i64) -> i64 {
    minutes.clamp(MIN_SLOT_MINUTES, MAX_SLOT_MINUTES)
}

/// Free slots of `duration_minutes` on `date`, stepped by the slot length,
/// skipping anything that overlaps a busy interval.
pub fn free_slots(
    date: NaiveDate,
    busy: &[(DateTime<Utc>, DateTime<Utc>)],
    duration_minutes: i64,
) -> Vec<TimeSlot> {
    let duration = Duration::minutes(clamp_duration(duration_minutes));
    let day_start = day_boundary(date, WORKDAY_START_HOUR);
    let day_end = day_boundary(date, WORKDAY_END_HOUR);

    let mut slots = Vec::new();
    let mut cursor = day_start;
    while cursor + duration <= day_end {
        let slot_end = cursor + duration;
        let taken = busy
            .iter()
            .any(|(busy_start, busy_end)| cursor < *busy_end && slot_end > *busy_start);
        if !taken {
            slots.push(TimeSlot {
                start: cursor,
                end: slot_end,
                display: cursor.format("%I:%M %p").to_string(),
            });
        }
        cursor += duration;
    }
    slots
}

fn day_boundary(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time).and_utc()
}
