// File: src/tui/handlers.rs
use crate::tui::action::{Action, AppEvent};
use crate::tui::state::{AppState, FormField, InputMode};
use crossterm::event::{KeyCode, KeyEvent};

pub fn handle_app_event(state: &mut AppState, event: AppEvent) {
    match event {
        AppEvent::Error(s) => state.message = format!("Error: {}", s),
        AppEvent::AlarmFired(payload) => {
            state.message = format!(
                "Time to take {} ({})",
                payload.medicine_name, payload.dosage
            );
        }
    }
}

/// Maps a key press to state changes and, when the user commits something,
/// the action the controller has to apply.
pub fn handle_key_event(key: KeyEvent, state: &mut AppState) -> Option<Action> {
    match state.mode {
        InputMode::Form => match key.code {
            KeyCode::Enter => {
                let input = state.form.input.clone();
                return Some(match state.form.editing {
                    Some(id) => Action::UpdateReminder(id, input),
                    None => Action::CreateReminder(input),
                });
            }
            KeyCode::Esc => state.close_form(),
            KeyCode::Tab | KeyCode::Down if state.form.focus != FormField::Dosage => {
                state.next_field()
            }
            KeyCode::BackTab | KeyCode::Up if state.form.focus != FormField::Dosage => {
                state.previous_field()
            }
            KeyCode::Tab => state.next_field(),
            KeyCode::BackTab => state.previous_field(),
            KeyCode::Down => state.cycle_dosage(1),
            KeyCode::Up => state.cycle_dosage(-1),
            KeyCode::Char(c) => state.enter_char(c),
            KeyCode::Backspace => state.delete_char(),
            _ => {}
        },

        InputMode::ConfirmDelete => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                state.mode = InputMode::Normal;
                if let Some(r) = state.get_selected_reminder() {
                    return Some(Action::DeleteReminder(r.id));
                }
            }
            _ => {
                state.mode = InputMode::Normal;
                state.message = "Delete cancelled.".to_string();
            }
        },

        InputMode::Normal => match key.code {
            KeyCode::Char('q') => return Some(Action::Quit),
            KeyCode::Char('a') => state.open_create(),
            KeyCode::Char('e') | KeyCode::Enter => state.open_edit(),
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(r) = state.get_selected_reminder() {
                    state.message = format!("Delete '{}'? (y/n)", r.medicine_name);
                    state.mode = InputMode::ConfirmDelete;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => state.next(),
            KeyCode::Up | KeyCode::Char('k') => state.previous(),
            _ => {}
        },
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Reminder;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state_with_one() -> AppState {
        let mut state = AppState::new();
        state.set_reminders(vec![Reminder {
            id: 42,
            medicine_name: "Aspirin".into(),
            dosage: "1".into(),
            time: 1_700_000_000_000,
            is_daily: true,
        }]);
        state
    }

    #[test]
    fn test_create_flow_emits_create_action() {
        let mut state = AppState::new();
        assert!(handle_key_event(key(KeyCode::Char('a')), &mut state).is_none());
        assert_eq!(state.mode, InputMode::Form);

        for c in "Zinc".chars() {
            handle_key_event(key(KeyCode::Char(c)), &mut state);
        }
        handle_key_event(key(KeyCode::Tab), &mut state);
        handle_key_event(key(KeyCode::Down), &mut state);
        handle_key_event(key(KeyCode::Down), &mut state);

        match handle_key_event(key(KeyCode::Enter), &mut state) {
            Some(Action::CreateReminder(input)) => {
                assert_eq!(input.medicine_name, "Zinc");
                assert_eq!(input.dosage, "1/2");
            }
            other => panic!("unexpected action: {:?}", other),
        }
        // Form stays open until the controller accepts the input.
        assert_eq!(state.mode, InputMode::Form);
    }

    #[test]
    fn test_edit_flow_emits_update_action() {
        let mut state = state_with_one();
        handle_key_event(key(KeyCode::Char('e')), &mut state);
        handle_key_event(key(KeyCode::Backspace), &mut state);
        match handle_key_event(key(KeyCode::Enter), &mut state) {
            Some(Action::UpdateReminder(42, input)) => {
                assert_eq!(input.medicine_name, "Aspiri");
                assert!(input.is_daily);
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let mut state = state_with_one();
        assert!(handle_key_event(key(KeyCode::Char('d')), &mut state).is_none());
        assert_eq!(state.mode, InputMode::ConfirmDelete);
        assert!(matches!(
            handle_key_event(key(KeyCode::Char('y')), &mut state),
            Some(Action::DeleteReminder(42))
        ));

        handle_key_event(key(KeyCode::Char('d')), &mut state);
        assert!(handle_key_event(key(KeyCode::Char('n')), &mut state).is_none());
        assert_eq!(state.mode, InputMode::Normal);
    }

    #[test]
    fn test_alarm_event_shows_in_status() {
        let mut state = AppState::new();
        handle_app_event(
            &mut state,
            AppEvent::AlarmFired(crate::scheduler::AlarmPayload {
                reminder_id: 1,
                medicine_name: "Iron".into(),
                dosage: "2".into(),
            }),
        );
        assert_eq!(state.message, "Time to take Iron (2)");
    }
}
