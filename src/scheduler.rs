use crate::model::{Reminder, next_daily_fire};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};

/// Broadcast target every reminder alarm is registered against.
pub const REMINDER_ACTION: &str = "com.hdw.medialert.REMINDER";
pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmPayload {
    pub reminder_id: i64,
    pub medicine_name: String,
    pub dosage: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRequest {
    /// Registration identity. Always the reminder id.
    pub request_code: i64,
    pub action: String,
    pub trigger_at_ms: i64,
    /// `Some(DAY_MILLIS)` for daily reminders.
    pub interval_ms: Option<i64>,
    pub payload: AlarmPayload,
}

/// How an alarm ended up armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmState {
    Exact,
    Approximate,
}

/// Host alarm service.
///
/// Registering a request code that is already armed replaces the earlier
/// registration. Cancelling an unknown request code is a no-op.
pub trait AlarmService {
    fn can_schedule_exact(&self) -> bool;
    /// Runs the host's consent flow. Returns whether exact alarms are now allowed.
    fn request_exact_permission(&self) -> bool;
    fn set_exact(&self, request: &AlarmRequest) -> Result<()>;
    fn set_inexact(&self, request: &AlarmRequest) -> Result<()>;
    fn cancel(&self, request_code: i64) -> Result<()>;
    fn notifications_enabled(&self) -> bool;
    /// Prompts for notification permission. Returns whether it was granted.
    fn request_notifications(&self) -> bool;
}

pub struct Scheduler<A> {
    alarms: A,
}

impl<A: AlarmService> Scheduler<A> {
    pub fn new(alarms: A) -> Self {
        Self { alarms }
    }

    pub fn alarms(&self) -> &A {
        &self.alarms
    }

    pub fn schedule(&self, reminder: &Reminder) -> Result<ArmState> {
        self.schedule_at(reminder, &Local::now())
    }

    pub fn schedule_at<Tz: TimeZone>(
        &self,
        reminder: &Reminder,
        now: &DateTime<Tz>,
    ) -> Result<ArmState> {
        let request = Self::build_request(reminder, now)?;

        let exact = self.alarms.can_schedule_exact() || {
            log::info!(
                "Exact alarms not permitted, asking consent for reminder {}",
                reminder.id
            );
            self.alarms.request_exact_permission()
        };

        if exact {
            self.alarms
                .set_exact(&request)
                .with_context(|| format!("Failed to schedule reminder {}", reminder.id))?;
            log::debug!(
                "Armed reminder {} exactly at {}",
                reminder.id,
                request.trigger_at_ms
            );
            Ok(ArmState::Exact)
        } else {
            self.alarms
                .set_inexact(&request)
                .with_context(|| format!("Failed to schedule reminder {}", reminder.id))?;
            log::warn!(
                "Armed reminder {} approximately at {}",
                reminder.id,
                request.trigger_at_ms
            );
            Ok(ArmState::Approximate)
        }
    }

    pub fn cancel(&self, reminder_id: i64) -> Result<()> {
        self.alarms
            .cancel(reminder_id)
            .with_context(|| format!("Failed to cancel reminder {}", reminder_id))
    }

    /// One-shot reminders fire at their stored instant, even a past one.
    /// Daily reminders fire at the next occurrence of their clock-of-day.
    pub fn build_request<Tz: TimeZone>(
        reminder: &Reminder,
        now: &DateTime<Tz>,
    ) -> Result<AlarmRequest> {
        let (trigger_at_ms, interval_ms) = if reminder.is_daily {
            let next = next_daily_fire(reminder.time, now).ok_or_else(|| {
                anyhow::anyhow!("Reminder {} has an invalid time", reminder.id)
            })?;
            (next.timestamp_millis(), Some(DAY_MILLIS))
        } else {
            (reminder.time, None)
        };

        Ok(AlarmRequest {
            request_code: reminder.id,
            action: REMINDER_ACTION.to_string(),
            trigger_at_ms,
            interval_ms,
            payload: AlarmPayload {
                reminder_id: reminder.id,
                medicine_name: reminder.medicine_name.clone(),
                dosage: reminder.dosage.clone(),
            },
        })
    }
}
