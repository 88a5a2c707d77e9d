use crate::model::ReminderInput;
use crate::scheduler::AlarmPayload;

#[derive(Debug)]
pub enum Action {
    CreateReminder(ReminderInput),
    UpdateReminder(i64, ReminderInput),
    DeleteReminder(i64),
    Quit,
}

#[derive(Debug)]
pub enum AppEvent {
    AlarmFired(AlarmPayload),
    Error(String),
}
