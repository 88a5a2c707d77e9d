use crate::model::{Field, Reminder, ReminderInput, ValidationError};
use crate::scheduler::{AlarmService, ArmState, Scheduler};
use crate::storage::KeyValueStore;
use crate::store::ReminderStore;
use chrono::{DateTime, Local, TimeZone};
use std::fmt;

#[derive(Debug)]
pub enum ControllerError {
    /// Inline field error. Nothing was committed.
    Invalid { field: Field, message: String },
    Storage(anyhow::Error),
    Scheduling(anyhow::Error),
}

impl From<ValidationError> for ControllerError {
    fn from(e: ValidationError) -> Self {
        Self::Invalid {
            field: e.field,
            message: e.message,
        }
    }
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Invalid { message, .. } => write!(f, "{}", message),
            ControllerError::Storage(e) => write!(f, "Failed to save reminders: {:#}", e),
            ControllerError::Scheduling(e) => write!(f, "Failed to schedule reminder: {:#}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

#[derive(Debug, Default)]
pub struct StartupReport {
    pub loaded: usize,
    pub rearmed: Vec<(i64, ArmState)>,
    /// Daily reminders the host refused to arm.
    pub failed: Vec<(i64, String)>,
    pub notifications_enabled: bool,
}

/// Ties validation, persistence and alarm registration together.
pub struct ReminderController<S, A> {
    store: ReminderStore<S>,
    scheduler: Scheduler<A>,
}

impl<S: KeyValueStore, A: AlarmService> ReminderController<S, A> {
    pub fn new(backend: S, alarms: A) -> Self {
        Self {
            store: ReminderStore::new(backend),
            scheduler: Scheduler::new(alarms),
        }
    }

    pub fn store(&self) -> &ReminderStore<S> {
        &self.store
    }

    pub fn scheduler(&self) -> &Scheduler<A> {
        &self.scheduler
    }

    pub fn reminders(&self) -> Vec<&Reminder> {
        self.store.list()
    }

    pub fn get(&self, id: i64) -> Option<&Reminder> {
        self.store.get(id)
    }

    pub fn start(&mut self) -> Result<StartupReport, ControllerError> {
        self.start_at(&Local::now())
    }

    /// Loads persisted reminders and re-arms the daily ones.
    ///
    /// One-shot reminders are not re-armed. An Android host alarm normally
    /// outlives the process, but with the desktop backend a one-shot still
    /// pending at shutdown is lost.
    pub fn start_at<Tz: TimeZone>(
        &mut self,
        now: &DateTime<Tz>,
    ) -> Result<StartupReport, ControllerError> {
        let notifications_enabled = self.ensure_notifications();
        let loaded = self.store.load().map_err(ControllerError::Storage)?;
        log::info!("Loaded {} reminders", loaded);

        let mut report = StartupReport {
            loaded,
            notifications_enabled,
            ..Default::default()
        };
        for reminder in self.store.list().into_iter().filter(|r| r.is_daily) {
            match self.scheduler.schedule_at(reminder, now) {
                Ok(state) => report.rearmed.push((reminder.id, state)),
                Err(e) => {
                    log::error!("Could not re-arm reminder {}: {:#}", reminder.id, e);
                    report.failed.push((reminder.id, format!("{:#}", e)));
                }
            }
        }
        Ok(report)
    }

    pub fn add(&mut self, input: &ReminderInput) -> Result<(Reminder, ArmState), ControllerError> {
        self.add_at(input, &Local::now())
    }

    pub fn add_at<Tz: TimeZone>(
        &mut self,
        input: &ReminderInput,
        now: &DateTime<Tz>,
    ) -> Result<(Reminder, ArmState), ControllerError> {
        let fields = input.validate(now)?;
        let id = self.store.fresh_id(now.timestamp_millis());
        let reminder = Reminder::from_fields(id, fields);

        self.store
            .add(reminder.clone())
            .map_err(ControllerError::Storage)?;
        log::info!("Added reminder {} ({})", id, reminder.medicine_name);

        let state = self
            .scheduler
            .schedule_at(&reminder, now)
            .map_err(ControllerError::Scheduling)?;
        Ok((reminder, state))
    }

    pub fn update(
        &mut self,
        id: i64,
        input: &ReminderInput,
    ) -> Result<Option<(Reminder, ArmState)>, ControllerError> {
        self.update_at(id, input, &Local::now())
    }

    /// Returns `Ok(None)` when no reminder has this id.
    pub fn update_at<Tz: TimeZone>(
        &mut self,
        id: i64,
        input: &ReminderInput,
        now: &DateTime<Tz>,
    ) -> Result<Option<(Reminder, ArmState)>, ControllerError> {
        let fields = input.validate(now)?;
        if !self
            .store
            .update(id, fields)
            .map_err(ControllerError::Storage)?
        {
            return Ok(None);
        }
        let Some(reminder) = self.store.get(id).cloned() else {
            return Ok(None);
        };
        log::info!("Updated reminder {}", id);

        let state = self
            .scheduler
            .schedule_at(&reminder, now)
            .map_err(ControllerError::Scheduling)?;
        Ok(Some((reminder, state)))
    }

    /// Returns whether a reminder was removed. Unknown ids are a no-op.
    pub fn delete(&mut self, id: i64) -> Result<bool, ControllerError> {
        if !self.store.remove(id).map_err(ControllerError::Storage)? {
            return Ok(false);
        }
        log::info!("Deleted reminder {}", id);
        self.scheduler
            .cancel(id)
            .map_err(ControllerError::Scheduling)?;
        Ok(true)
    }

    /// A denied prompt is asked once more before giving up.
    fn ensure_notifications(&self) -> bool {
        let alarms = self.scheduler.alarms();
        if alarms.notifications_enabled() || alarms.request_notifications() {
            return true;
        }
        log::warn!("Notification permission denied, asking again");
        let granted = alarms.request_notifications();
        if !granted {
            log::warn!("Notification permission still denied; reminders will not be shown");
        }
        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::FakeAlarms;
    use crate::storage::MemoryStorage;
    use crate::store::REMINDERS_SLOT;
    use chrono::{NaiveDate, Utc};

    fn now() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
    }

    fn controller() -> ReminderController<MemoryStorage, FakeAlarms> {
        ReminderController::new(MemoryStorage::new(), FakeAlarms::exact())
    }

    #[test]
    fn test_add_valid_reminder() {
        let mut c = controller();
        let (r, state) = c
            .add_at(&ReminderInput::new("Aspirin", "1", "18:00", false), &now())
            .unwrap();

        assert_eq!(state, ArmState::Exact);
        assert_eq!(r.id, now().timestamp_millis());
        assert_eq!(c.reminders().len(), 1);
        assert_eq!(c.store().backend().writes(), 1);
        assert!(c.scheduler().alarms().armed.borrow().contains_key(&r.id));
    }

    #[test]
    fn test_add_empty_name_commits_nothing() {
        let mut c = controller();
        let err = c
            .add_at(&ReminderInput::new("", "1", "18:00", false), &now())
            .unwrap_err();

        match err {
            ControllerError::Invalid { field, message } => {
                assert_eq!(field, Field::MedicineName);
                assert_eq!(message, "Medicine name is required");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(c.reminders().is_empty());
        assert_eq!(c.store().backend().writes(), 0);
        assert!(c.scheduler().alarms().armed.borrow().is_empty());
    }

    #[test]
    fn test_two_adds_in_same_millisecond_get_distinct_ids() {
        let mut c = controller();
        let input = ReminderInput::new("Aspirin", "1", "18:00", false);
        let (a, _) = c.add_at(&input, &now()).unwrap();
        let (b, _) = c.add_at(&input, &now()).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(c.reminders().len(), 2);
    }

    #[test]
    fn test_edit_preserves_id_and_reschedules() {
        let mut c = controller();
        let (r, _) = c
            .add_at(&ReminderInput::new("Aspirin", "1", "18:00", false), &now())
            .unwrap();

        let (updated, _) = c
            .update_at(r.id, &ReminderInput::new("Ibuprofen", "2", "08:00", true), &now())
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, r.id);
        assert_eq!(updated.medicine_name, "Ibuprofen");
        assert_eq!(updated.dosage, "2");
        assert!(updated.is_daily);
        assert_eq!(c.reminders().len(), 1);
        assert_eq!(c.store().backend().writes(), 2);

        let armed = c.scheduler().alarms().armed.borrow();
        assert_eq!(armed.len(), 1);
        assert_eq!(armed[&r.id].0.payload.medicine_name, "Ibuprofen");
    }

    #[test]
    fn test_edit_with_invalid_input_keeps_old_fields() {
        let mut c = controller();
        let (r, _) = c
            .add_at(&ReminderInput::new("Aspirin", "1", "18:00", false), &now())
            .unwrap();
        let err = c
            .update_at(r.id, &ReminderInput::new("Aspirin", "", "18:00", false), &now())
            .unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Invalid {
                field: Field::Dosage,
                ..
            }
        ));
        assert_eq!(c.get(r.id).unwrap().dosage, "1");
        assert_eq!(c.store().backend().writes(), 1);
    }

    #[test]
    fn test_edit_unknown_id() {
        let mut c = controller();
        let res = c
            .update_at(5, &ReminderInput::new("Aspirin", "1", "18:00", false), &now())
            .unwrap();
        assert!(res.is_none());
        assert_eq!(c.store().backend().writes(), 0);
    }

    #[test]
    fn test_delete_cancels_alarm() {
        let mut c = controller();
        let (keep, _) = c
            .add_at(&ReminderInput::new("A", "1", "18:00", false), &now())
            .unwrap();
        let (gone, _) = c
            .add_at(&ReminderInput::new("B", "1", "19:00", false), &now())
            .unwrap();

        assert!(c.delete(gone.id).unwrap());
        let ids: Vec<i64> = c.reminders().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![keep.id]);
        assert_eq!(*c.scheduler().alarms().cancelled.borrow(), vec![gone.id]);

        assert!(!c.delete(gone.id).unwrap());
        assert_eq!(c.reminders().len(), 1);
        assert_eq!(c.scheduler().alarms().cancelled.borrow().len(), 1);
    }

    #[test]
    fn test_startup_rearms_daily_only() {
        let blob = r#"[
            {"id":1,"medicineName":"Daily pill","dosage":"1","time":1717221600000,"isDaily":true},
            {"id":2,"medicineName":"Once","dosage":"2","time":1717225200000,"isDaily":false}
        ]"#;
        let mut c = ReminderController::new(
            MemoryStorage::with_slot(REMINDERS_SLOT, blob),
            FakeAlarms::exact(),
        );
        let report = c.start_at(&now()).unwrap();

        assert_eq!(report.loaded, 2);
        assert_eq!(report.rearmed, vec![(1, ArmState::Exact)]);
        assert!(report.failed.is_empty());
        let armed = c.scheduler().alarms().armed.borrow();
        assert!(armed.contains_key(&1));
        assert!(!armed.contains_key(&2));
        assert_eq!(c.store().backend().writes(), 0);
    }

    #[test]
    fn test_startup_with_corrupt_blob_fails() {
        let mut c = ReminderController::new(
            MemoryStorage::with_slot(REMINDERS_SLOT, "not json"),
            FakeAlarms::exact(),
        );
        assert!(matches!(
            c.start_at(&now()),
            Err(ControllerError::Storage(_))
        ));
    }

    #[test]
    fn test_startup_reprompts_notifications_once() {
        let fake = FakeAlarms::exact();
        fake.notifications.set(false);
        *fake.notification_answers.borrow_mut() = vec![false, true];
        let mut c = ReminderController::new(MemoryStorage::new(), fake);

        let report = c.start_at(&now()).unwrap();
        assert!(report.notifications_enabled);
        assert_eq!(c.scheduler().alarms().notification_prompts.get(), 2);
    }

    #[test]
    fn test_startup_gives_up_after_second_denial() {
        let fake = FakeAlarms::exact();
        fake.notifications.set(false);
        let mut c = ReminderController::new(MemoryStorage::new(), fake);

        let report = c.start_at(&now()).unwrap();
        assert!(!report.notifications_enabled);
        assert_eq!(c.scheduler().alarms().notification_prompts.get(), 2);
    }

    #[test]
    fn test_scheduling_failure_keeps_stored_reminder() {
        let fake = FakeAlarms::exact();
        fake.fail.set(true);
        let mut c = ReminderController::new(MemoryStorage::new(), fake);
        let err = c
            .add_at(&ReminderInput::new("Aspirin", "1", "18:00", false), &now())
            .unwrap_err();
        assert!(matches!(err, ControllerError::Scheduling(_)));
        assert_eq!(c.reminders().len(), 1);
    }

    #[test]
    fn test_storage_failure_is_reported() {
        let mut storage = MemoryStorage::new();
        storage.set_fail_writes(true);
        let mut c = ReminderController::new(storage, FakeAlarms::exact());
        let err = c
            .add_at(&ReminderInput::new("Aspirin", "1", "18:00", false), &now())
            .unwrap_err();
        assert!(matches!(err, ControllerError::Storage(_)));
        assert!(c.reminders().is_empty());
        assert!(c.scheduler().alarms().armed.borrow().is_empty());
    }
}
