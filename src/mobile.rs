// File: ./src/mobile.rs
use crate::config::Config;
use crate::controller::{ControllerError, ReminderController, StartupReport};
use crate::model::{Reminder, ReminderInput};
use crate::paths::AppPaths;
use crate::scheduler::{AlarmRequest, AlarmService, ArmState};
use crate::storage::LocalStorage;
use crate::store::REMINDERS_NAMESPACE;
use std::sync::{Arc, Mutex};

#[cfg(target_os = "android")]
use android_logger::Config as LogConfig;
#[cfg(target_os = "android")]
use log::LevelFilter;

#[derive(Debug, uniffi::Error)]
pub enum MobileError {
    /// Inline form error; `field` is `medicine_name`, `dosage` or `time`.
    Invalid { field: String, message: String },
    Generic { message: String },
}
impl From<String> for MobileError {
    fn from(e: String) -> Self {
        Self::Generic { message: e }
    }
}
impl From<&str> for MobileError {
    fn from(e: &str) -> Self {
        Self::Generic {
            message: e.to_string(),
        }
    }
}
impl From<anyhow::Error> for MobileError {
    fn from(e: anyhow::Error) -> Self {
        Self::Generic {
            message: format!("{:#}", e),
        }
    }
}
impl From<ControllerError> for MobileError {
    fn from(e: ControllerError) -> Self {
        match e {
            ControllerError::Invalid { field, message } => Self::Invalid {
                field: field.label().to_string(),
                message,
            },
            other => Self::Generic {
                message: other.to_string(),
            },
        }
    }
}
impl From<uniffi::UnexpectedUniFFICallbackError> for MobileError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Generic { message: e.reason }
    }
}
impl std::fmt::Display for MobileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MobileError::Invalid { message, .. } => write!(f, "{}", message),
            MobileError::Generic { message } => write!(f, "{}", message),
        }
    }
}
impl std::error::Error for MobileError {}

// --- DTOs ---

#[derive(uniffi::Record)]
pub struct MobileReminder {
    pub id: i64,
    pub medicine_name: String,
    pub dosage: String,
    pub time_ms: i64,
    pub time_label: String,
    pub is_daily: bool,
}

#[derive(uniffi::Record)]
pub struct MobileArmResult {
    pub reminder: MobileReminder,
    /// `false` when only a best-effort alarm could be registered.
    pub exact: bool,
}

#[derive(uniffi::Record)]
pub struct MobileStartup {
    pub reminders: Vec<MobileReminder>,
    pub rearmed: u32,
    pub approximate: u32,
    pub failed: u32,
    pub notifications_enabled: bool,
}

#[derive(uniffi::Record)]
pub struct MobileAlarm {
    pub request_code: i64,
    pub action: String,
    pub trigger_at_ms: i64,
    pub interval_ms: Option<i64>,
    pub reminder_id: i64,
    pub medicine_name: String,
    pub dosage: String,
}

#[derive(uniffi::Record)]
pub struct MobileConfig {
    pub dark_mode: bool,
    pub dosage_presets: Vec<String>,
}

fn reminder_to_mobile(r: &Reminder) -> MobileReminder {
    MobileReminder {
        id: r.id,
        medicine_name: r.medicine_name.clone(),
        dosage: r.dosage.clone(),
        time_ms: r.time,
        time_label: r.time_label(),
        is_daily: r.is_daily,
    }
}

fn alarm_to_mobile(req: &AlarmRequest) -> MobileAlarm {
    MobileAlarm {
        request_code: req.request_code,
        action: req.action.clone(),
        trigger_at_ms: req.trigger_at_ms,
        interval_ms: req.interval_ms,
        reminder_id: req.payload.reminder_id,
        medicine_name: req.payload.medicine_name.clone(),
        dosage: req.payload.dosage.clone(),
    }
}

fn arm_result(reminder: &Reminder, state: ArmState) -> MobileArmResult {
    MobileArmResult {
        reminder: reminder_to_mobile(reminder),
        exact: state == ArmState::Exact,
    }
}

// --- HOST SERVICES ---

/// Implemented on the Kotlin side over AlarmManager and the permission APIs.
#[uniffi::export(with_foreign)]
pub trait AlarmPlatform: Send + Sync {
    fn can_schedule_exact(&self) -> bool;
    fn request_exact_permission(&self) -> bool;
    fn set_exact(&self, alarm: MobileAlarm) -> Result<(), MobileError>;
    fn set_inexact(&self, alarm: MobileAlarm) -> Result<(), MobileError>;
    fn cancel(&self, request_code: i64) -> Result<(), MobileError>;
    fn notifications_enabled(&self) -> bool;
    fn request_notifications(&self) -> bool;
}

struct PlatformAlarms(Arc<dyn AlarmPlatform>);

impl AlarmService for PlatformAlarms {
    fn can_schedule_exact(&self) -> bool {
        self.0.can_schedule_exact()
    }

    fn request_exact_permission(&self) -> bool {
        self.0.request_exact_permission()
    }

    fn set_exact(&self, request: &AlarmRequest) -> anyhow::Result<()> {
        self.0
            .set_exact(alarm_to_mobile(request))
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    fn set_inexact(&self, request: &AlarmRequest) -> anyhow::Result<()> {
        self.0
            .set_inexact(alarm_to_mobile(request))
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    fn cancel(&self, request_code: i64) -> anyhow::Result<()> {
        self.0
            .cancel(request_code)
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    fn notifications_enabled(&self) -> bool {
        self.0.notifications_enabled()
    }

    fn request_notifications(&self) -> bool {
        self.0.request_notifications()
    }
}

// --- MAIN OBJECT ---

#[derive(uniffi::Object)]
pub struct MediAlertMobile {
    controller: Mutex<ReminderController<LocalStorage, PlatformAlarms>>,
}

#[uniffi::export]
impl MediAlertMobile {
    #[uniffi::constructor]
    pub fn new(
        android_files_dir: String,
        platform: Arc<dyn AlarmPlatform>,
    ) -> Result<Self, MobileError> {
        #[cfg(target_os = "android")]
        android_logger::init_once(
            LogConfig::default()
                .with_max_level(LevelFilter::Debug)
                .with_tag("MediAlertRust"),
        );
        AppPaths::init_android_path(android_files_dir);
        let storage = LocalStorage::open(REMINDERS_NAMESPACE).map_err(MobileError::from)?;
        Ok(Self {
            controller: Mutex::new(ReminderController::new(
                storage,
                PlatformAlarms(platform),
            )),
        })
    }

    /// Loads persisted reminders and re-arms the daily ones.
    pub fn start(&self) -> Result<MobileStartup, MobileError> {
        let mut controller = self.lock()?;
        let report: StartupReport = controller.start().map_err(MobileError::from)?;
        let approximate = report
            .rearmed
            .iter()
            .filter(|(_, s)| *s == ArmState::Approximate)
            .count();
        Ok(MobileStartup {
            reminders: controller
                .reminders()
                .into_iter()
                .map(reminder_to_mobile)
                .collect(),
            rearmed: report.rearmed.len() as u32,
            approximate: approximate as u32,
            failed: report.failed.len() as u32,
            notifications_enabled: report.notifications_enabled,
        })
    }

    pub fn get_reminders(&self) -> Result<Vec<MobileReminder>, MobileError> {
        let controller = self.lock()?;
        Ok(controller
            .reminders()
            .into_iter()
            .map(reminder_to_mobile)
            .collect())
    }

    pub fn add_reminder(
        &self,
        medicine_name: String,
        dosage: String,
        time: String,
        is_daily: bool,
    ) -> Result<MobileArmResult, MobileError> {
        let input = ReminderInput {
            medicine_name,
            dosage,
            time,
            is_daily,
        };
        let mut controller = self.lock()?;
        let (reminder, state) = controller.add(&input).map_err(MobileError::from)?;
        Ok(arm_result(&reminder, state))
    }

    pub fn update_reminder(
        &self,
        id: i64,
        medicine_name: String,
        dosage: String,
        time: String,
        is_daily: bool,
    ) -> Result<Option<MobileArmResult>, MobileError> {
        let input = ReminderInput {
            medicine_name,
            dosage,
            time,
            is_daily,
        };
        let mut controller = self.lock()?;
        let updated = controller.update(id, &input).map_err(MobileError::from)?;
        Ok(updated.map(|(reminder, state)| arm_result(&reminder, state)))
    }

    pub fn delete_reminder(&self, id: i64) -> Result<bool, MobileError> {
        let mut controller = self.lock()?;
        controller.delete(id).map_err(MobileError::from)
    }

    pub fn get_config(&self) -> MobileConfig {
        let c = Config::load().unwrap_or_default();
        MobileConfig {
            dark_mode: c.dark_mode,
            dosage_presets: c.dosage_presets,
        }
    }

    pub fn save_config(
        &self,
        dark_mode: bool,
        dosage_presets: Vec<String>,
    ) -> Result<(), MobileError> {
        Config::update(|c| {
            c.dark_mode = dark_mode;
            if !dosage_presets.is_empty() {
                c.dosage_presets = dosage_presets;
            }
        })
        .map(|_| ())
        .map_err(MobileError::from)
    }
}

impl MediAlertMobile {
    fn lock(
        &self,
    ) -> Result<
        std::sync::MutexGuard<'_, ReminderController<LocalStorage, PlatformAlarms>>,
        MobileError,
    > {
        self.controller
            .lock()
            .map_err(|_| MobileError::from("Reminder state poisoned"))
    }
}
