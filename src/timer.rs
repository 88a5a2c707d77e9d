use crate::scheduler::{AlarmPayload, AlarmRequest, AlarmService};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// In-process alarm service for desktop front-ends.
///
/// Each armed alarm is a tokio task that sleeps until its trigger and then
/// sends the payload down `fired`. Timers are always precise here, so exact
/// and inexact registrations behave the same.
pub struct TokioAlarms {
    runtime: Handle,
    fired: UnboundedSender<AlarmPayload>,
    tasks: Mutex<HashMap<i64, JoinHandle<()>>>,
}

impl TokioAlarms {
    /// Must be called from inside a tokio runtime.
    pub fn new(fired: UnboundedSender<AlarmPayload>) -> Result<Self> {
        let runtime = Handle::try_current().context("Alarm timers need a tokio runtime")?;
        Ok(Self {
            runtime,
            fired,
            tasks: Mutex::new(HashMap::new()),
        })
    }

    pub fn armed_count(&self) -> usize {
        self.tasks
            .lock()
            .map(|tasks| tasks.values().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }

    fn arm(&self, request: &AlarmRequest) -> Result<()> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let delay = Duration::from_millis((request.trigger_at_ms - now_ms).max(0) as u64);
        let interval = request
            .interval_ms
            .filter(|ms| *ms > 0)
            .map(|ms| Duration::from_millis(ms as u64));
        let payload = request.payload.clone();
        let tx = self.fired.clone();

        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            loop {
                log::info!(
                    "Reminder {} due: {} ({})",
                    payload.reminder_id,
                    payload.medicine_name,
                    payload.dosage
                );
                if tx.send(payload.clone()).is_err() {
                    break;
                }
                match interval {
                    Some(period) => tokio::time::sleep(period).await,
                    None => break,
                }
            }
        });

        let mut tasks = self
            .tasks
            .lock()
            .map_err(|_| anyhow::anyhow!("Alarm table poisoned"))?;
        if let Some(previous) = tasks.insert(request.request_code, task) {
            previous.abort();
        }
        Ok(())
    }
}

impl AlarmService for TokioAlarms {
    fn can_schedule_exact(&self) -> bool {
        true
    }

    fn request_exact_permission(&self) -> bool {
        true
    }

    fn set_exact(&self, request: &AlarmRequest) -> Result<()> {
        self.arm(request)
    }

    fn set_inexact(&self, request: &AlarmRequest) -> Result<()> {
        self.arm(request)
    }

    fn cancel(&self, request_code: i64) -> Result<()> {
        let mut tasks = self
            .tasks
            .lock()
            .map_err(|_| anyhow::anyhow!("Alarm table poisoned"))?;
        if let Some(task) = tasks.remove(&request_code) {
            task.abort();
        }
        Ok(())
    }

    fn notifications_enabled(&self) -> bool {
        true
    }

    fn request_notifications(&self) -> bool {
        true
    }
}

impl Drop for TokioAlarms {
    fn drop(&mut self) {
        if let Ok(tasks) = self.tasks.get_mut() {
            for (_, task) in tasks.drain() {
                task.abort();
            }
        }
    }
}
