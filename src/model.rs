use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_DOSAGE_PRESETS: [&str; 8] = ["1/4", "1/2", "1", "2", "3", "4", "5", "Other"];

/// A scheduled medication reminder.
///
/// Field names are serialized in camelCase so the persisted list keeps the
/// `id`, `medicineName`, `dosage`, `time`, `isDaily` schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// Creation timestamp in epoch millis. Doubles as the alarm request code.
    pub id: i64,
    pub medicine_name: String,
    pub dosage: String,
    /// Next (or initial) fire instant, epoch millis.
    pub time: i64,
    pub is_daily: bool,
}

/// Everything about a reminder except its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderFields {
    pub medicine_name: String,
    pub dosage: String,
    pub time: i64,
    pub is_daily: bool,
}

impl Reminder {
    pub fn from_fields(id: i64, fields: ReminderFields) -> Self {
        Self {
            id,
            medicine_name: fields.medicine_name,
            dosage: fields.dosage,
            time: fields.time,
            is_daily: fields.is_daily,
        }
    }

    /// Replaces everything but the id.
    pub fn apply(&mut self, fields: ReminderFields) {
        self.medicine_name = fields.medicine_name;
        self.dosage = fields.dosage;
        self.time = fields.time;
        self.is_daily = fields.is_daily;
    }

    pub fn time_label(&self) -> String {
        format_time_label(self.time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    MedicineName,
    Dosage,
    Time,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::MedicineName => "medicine_name",
            Field::Dosage => "dosage",
            Field::Time => "time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

impl ValidationError {
    fn new(field: Field, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Raw form input as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderInput {
    pub medicine_name: String,
    pub dosage: String,
    /// `HH:MM` (24h) or `hh:mm AM/PM`.
    pub time: String,
    pub is_daily: bool,
}

impl ReminderInput {
    pub fn new(medicine_name: &str, dosage: &str, time: &str, is_daily: bool) -> Self {
        Self {
            medicine_name: medicine_name.to_string(),
            dosage: dosage.to_string(),
            time: time.to_string(),
            is_daily,
        }
    }

    /// Prefills the form from an existing reminder, rendering its time in the local zone.
    pub fn from_reminder(reminder: &Reminder) -> Self {
        Self {
            medicine_name: reminder.medicine_name.clone(),
            dosage: reminder.dosage.clone(),
            time: reminder.time_label(),
            is_daily: reminder.is_daily,
        }
    }

    /// Checks the required fields in form order and resolves the time
    /// against `now`. The first failing field wins.
    pub fn validate<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Result<ReminderFields, ValidationError> {
        let medicine_name = self.medicine_name.trim();
        if medicine_name.is_empty() {
            return Err(ValidationError::new(
                Field::MedicineName,
                "Medicine name is required",
            ));
        }
        let dosage = self.dosage.trim();
        if dosage.is_empty() {
            return Err(ValidationError::new(Field::Dosage, "Dosage is required"));
        }
        let time_text = self.time.trim();
        if time_text.is_empty() {
            return Err(ValidationError::new(Field::Time, "Time is required"));
        }
        let clock = parse_clock_time(time_text).ok_or_else(|| {
            ValidationError::new(Field::Time, "Time must look like 08:30 or 08:30 AM")
        })?;

        Ok(ReminderFields {
            medicine_name: medicine_name.to_string(),
            dosage: dosage.to_string(),
            time: next_at_clock_time(clock, now).timestamp_millis(),
            is_daily: self.is_daily,
        })
    }
}

/// Parses a wall-clock time, accepting `HH:MM` and `hh:mm AM/PM`.
pub fn parse_clock_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    let upper = text.to_uppercase();
    ["%I:%M %p", "%I:%M%p", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&upper, fmt).ok())
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
}

/// Today at `clock` in `now`'s zone, or tomorrow if that instant is already past.
pub fn next_at_clock_time<Tz: TimeZone>(clock: NaiveTime, now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    let candidate = localize(&tz, today.and_time(clock));
    if candidate < *now {
        localize(&tz, (today + Duration::days(1)).and_time(clock))
    } else {
        candidate
    }
}

/// Next fire instant of a daily reminder stored at `time_ms`: its clock-of-day
/// today, moved to the following day when that has already passed.
pub fn next_daily_fire<Tz: TimeZone>(time_ms: i64, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let stored = DateTime::from_timestamp_millis(time_ms)?.with_timezone(&now.timezone());
    let clock = stored.time().with_nanosecond(0)?;
    Some(next_at_clock_time(clock, now))
}

pub fn format_time_label(time_ms: i64) -> String {
    match DateTime::from_timestamp_millis(time_ms) {
        Some(utc) => utc
            .with_timezone(&chrono::Local)
            .format("%I:%M %p")
            .to_string(),
        None => "--:--".to_string(),
    }
}

fn localize<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    // Skipped wall times (DST gaps) resolve to the first valid half hour after.
    let mut candidate = naive;
    for _ in 0..4 {
        if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
            return dt;
        }
        candidate += Duration::minutes(30);
    }
    tz.from_utc_datetime(&naive)
}
