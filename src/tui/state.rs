use crate::model::{DEFAULT_DOSAGE_PRESETS, Field, Reminder, ReminderInput};
use ratatui::widgets::ListState;

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum InputMode {
    Normal,
    Form,
    ConfirmDelete,
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum FormField {
    MedicineName,
    Dosage,
    Time,
    Daily,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::MedicineName => FormField::Dosage,
            FormField::Dosage => FormField::Time,
            FormField::Time => FormField::Daily,
            FormField::Daily => FormField::MedicineName,
        }
    }

    fn previous(self) -> Self {
        match self {
            FormField::MedicineName => FormField::Daily,
            FormField::Dosage => FormField::MedicineName,
            FormField::Time => FormField::Dosage,
            FormField::Daily => FormField::Time,
        }
    }
}

pub struct FormState {
    pub input: ReminderInput,
    pub focus: FormField,
    /// `Some(id)` while editing an existing reminder.
    pub editing: Option<i64>,
    pub error: Option<(Field, String)>,
    preset_index: Option<usize>,
}

impl FormState {
    fn blank() -> Self {
        Self {
            input: ReminderInput::default(),
            focus: FormField::MedicineName,
            editing: None,
            error: None,
            preset_index: None,
        }
    }
}

pub struct AppState {
    // Data
    pub reminders: Vec<Reminder>,
    pub dosage_presets: Vec<String>,

    // UI State
    pub list_state: ListState,
    pub mode: InputMode,
    pub message: String,
    pub dark_mode: bool,

    // Input Buffers
    pub form: FormState,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        let mut l_state = ListState::default();
        l_state.select(Some(0));

        Self {
            reminders: vec![],
            dosage_presets: DEFAULT_DOSAGE_PRESETS.iter().map(|s| s.to_string()).collect(),
            list_state: l_state,
            mode: InputMode::Normal,
            message: "Loading...".to_string(),
            dark_mode: false,
            form: FormState::blank(),
        }
    }

    /// Replaces the displayed list and keeps the selection in range.
    pub fn set_reminders(&mut self, reminders: Vec<Reminder>) {
        self.reminders = reminders;
        let selected = self.list_state.selected().unwrap_or(0);
        if self.reminders.is_empty() {
            self.list_state.select(None);
        } else {
            self.list_state
                .select(Some(selected.min(self.reminders.len() - 1)));
        }
    }

    pub fn get_selected_reminder(&self) -> Option<&Reminder> {
        self.list_state
            .selected()
            .and_then(|idx| self.reminders.get(idx))
    }

    pub fn next(&mut self) {
        if self.reminders.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.reminders.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.reminders.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.reminders.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn open_create(&mut self) {
        self.form = FormState::blank();
        self.mode = InputMode::Form;
    }

    pub fn open_edit(&mut self) {
        if let Some(r) = self.get_selected_reminder() {
            let input = ReminderInput::from_reminder(r);
            let editing = Some(r.id);
            let preset_index = self.dosage_presets.iter().position(|p| *p == input.dosage);
            self.form = FormState {
                input,
                focus: FormField::MedicineName,
                editing,
                error: None,
                preset_index,
            };
            self.mode = InputMode::Form;
        }
    }

    pub fn close_form(&mut self) {
        self.form = FormState::blank();
        self.mode = InputMode::Normal;
    }

    pub fn set_field_error(&mut self, field: Field, message: String) {
        self.form.focus = match field {
            Field::MedicineName => FormField::MedicineName,
            Field::Dosage => FormField::Dosage,
            Field::Time => FormField::Time,
        };
        self.form.error = Some((field, message));
    }

    pub fn next_field(&mut self) {
        self.form.focus = self.form.focus.next();
    }

    pub fn previous_field(&mut self) {
        self.form.focus = self.form.focus.previous();
    }

    fn focused_buffer(&mut self) -> Option<&mut String> {
        match self.form.focus {
            FormField::MedicineName => Some(&mut self.form.input.medicine_name),
            FormField::Dosage => Some(&mut self.form.input.dosage),
            FormField::Time => Some(&mut self.form.input.time),
            FormField::Daily => None,
        }
    }

    pub fn enter_char(&mut self, c: char) {
        if self.form.focus == FormField::Daily {
            if c == ' ' {
                self.toggle_daily();
            }
            return;
        }
        if let Some(buf) = self.focused_buffer() {
            buf.push(c);
        }
        self.form.error = None;
    }

    pub fn delete_char(&mut self) {
        if let Some(buf) = self.focused_buffer() {
            buf.pop();
        }
    }

    pub fn toggle_daily(&mut self) {
        self.form.input.is_daily = !self.form.input.is_daily;
    }

    /// Steps through the dosage presets, wrapping at both ends.
    pub fn cycle_dosage(&mut self, delta: i32) {
        if self.dosage_presets.is_empty() {
            return;
        }
        let len = self.dosage_presets.len() as i32;
        let idx = match self.form.preset_index {
            Some(i) => (i as i32 + delta).rem_euclid(len),
            None if delta >= 0 => 0,
            None => len - 1,
        } as usize;
        self.form.preset_index = Some(idx);
        self.form.input.dosage = self.dosage_presets[idx].clone();
        self.form.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_reminder(id: i64) -> Reminder {
        Reminder {
            id,
            medicine_name: format!("Med {}", id),
            dosage: "1/2".into(),
            time: 1_700_000_000_000,
            is_daily: false,
        }
    }

    #[test]
    fn test_navigation_next_wraps() {
        let mut state = AppState::new();
        state.set_reminders(vec![dummy_reminder(1), dummy_reminder(2), dummy_reminder(3)]);
        state.list_state.select(Some(0));

        state.next();
        assert_eq!(state.list_state.selected(), Some(1));
        state.next();
        assert_eq!(state.list_state.selected(), Some(2));
        state.next();
        assert_eq!(state.list_state.selected(), Some(0));
    }

    #[test]
    fn test_navigation_previous_wraps() {
        let mut state = AppState::new();
        state.set_reminders(vec![dummy_reminder(1), dummy_reminder(2), dummy_reminder(3)]);
        state.list_state.select(Some(0));

        state.previous();
        assert_eq!(state.list_state.selected(), Some(2));
        state.previous();
        assert_eq!(state.list_state.selected(), Some(1));
    }

    #[test]
    fn test_navigation_empty_list_safety() {
        let mut state = AppState::new();
        state.set_reminders(vec![]);
        state.next();
        state.previous();
        assert!(state.get_selected_reminder().is_none());
    }

    #[test]
    fn test_selection_clamped_after_shrink() {
        let mut state = AppState::new();
        state.set_reminders(vec![dummy_reminder(1), dummy_reminder(2), dummy_reminder(3)]);
        state.list_state.select(Some(2));
        state.set_reminders(vec![dummy_reminder(1)]);
        assert_eq!(state.list_state.selected(), Some(0));
    }

    #[test]
    fn test_open_edit_prefills_form() {
        let mut state = AppState::new();
        state.set_reminders(vec![dummy_reminder(10), dummy_reminder(20)]);
        state.list_state.select(Some(1));
        state.open_edit();

        assert_eq!(state.mode, InputMode::Form);
        assert_eq!(state.form.editing, Some(20));
        assert_eq!(state.form.input.medicine_name, "Med 20");
        assert_eq!(state.form.input.dosage, "1/2");
        assert!(!state.form.input.time.is_empty());
    }

    #[test]
    fn test_typing_goes_to_focused_field() {
        let mut state = AppState::new();
        state.open_create();
        for c in "Zinc".chars() {
            state.enter_char(c);
        }
        state.next_field();
        state.next_field();
        for c in "08:00".chars() {
            state.enter_char(c);
        }
        state.delete_char();
        state.next_field();
        state.enter_char(' ');

        assert_eq!(state.form.input.medicine_name, "Zinc");
        assert_eq!(state.form.input.dosage, "");
        assert_eq!(state.form.input.time, "08:0");
        assert!(state.form.input.is_daily);
        state.next_field();
        assert_eq!(state.form.focus, FormField::MedicineName);
    }

    #[test]
    fn test_cycle_dosage_wraps() {
        let mut state = AppState::new();
        state.open_create();
        state.cycle_dosage(-1);
        assert_eq!(state.form.input.dosage, "Other");
        state.cycle_dosage(1);
        assert_eq!(state.form.input.dosage, "1/4");
        state.cycle_dosage(1);
        assert_eq!(state.form.input.dosage, "1/2");
    }

    #[test]
    fn test_field_error_moves_focus() {
        let mut state = AppState::new();
        state.open_create();
        state.next_field();
        state.set_field_error(Field::MedicineName, "Medicine name is required".into());
        assert_eq!(state.form.focus, FormField::MedicineName);
        assert!(state.form.error.is_some());
        state.enter_char('A');
        assert!(state.form.error.is_none());
    }
}
