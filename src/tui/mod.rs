pub mod action;
pub mod handlers;
pub mod state;
pub mod view;

use crate::config::Config;
use crate::controller::{ControllerError, ReminderController, StartupReport};
use crate::paths::AppPaths;
use crate::scheduler::{AlarmService, ArmState};
use crate::storage::{KeyValueStore, LocalStorage};
use crate::store::REMINDERS_NAMESPACE;
use crate::timer::TokioAlarms;

use action::{Action, AppEvent};
use handlers::{handle_app_event, handle_key_event};
use state::{AppState, InputMode};
use view::draw;

use anyhow::Result;
use crossterm::{
    event::{self, Event, MouseEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{env, io, time::Duration};
use tokio::sync::mpsc;

fn init_logging(level: &str) {
    let Ok(path) = AppPaths::get_log_path() else {
        return;
    };
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    else {
        return;
    };
    // Log to a file: stderr belongs to the terminal UI.
    let _ = env_logger::Builder::new()
        .parse_filters(level)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init();
}

/// Applies a committed action and reports the outcome on the state.
/// Returns `false` once the user asked to quit.
pub fn apply_action<S: KeyValueStore, A: AlarmService>(
    action: Action,
    controller: &mut ReminderController<S, A>,
    state: &mut AppState,
) -> bool {
    let result = match action {
        Action::Quit => return false,
        Action::CreateReminder(input) => controller.add(&input).map(|(r, arm)| {
            Some(format!("Added {}{}", r.medicine_name, arm_suffix(arm)))
        }),
        Action::UpdateReminder(id, input) => controller.update(id, &input).map(|res| {
            Some(match res {
                Some((r, arm)) => format!("Saved {}{}", r.medicine_name, arm_suffix(arm)),
                None => "Reminder no longer exists.".to_string(),
            })
        }),
        Action::DeleteReminder(id) => controller
            .delete(id)
            .map(|found| found.then(|| "Deleted.".to_string())),
    };

    match result {
        Ok(message) => {
            if state.mode == InputMode::Form {
                state.close_form();
            }
            if let Some(m) = message {
                state.message = m;
            }
        }
        Err(ControllerError::Invalid { field, message }) => {
            state.set_field_error(field, message);
        }
        Err(e) => {
            log::error!("{:#}", e);
            if state.mode == InputMode::Form {
                state.close_form();
            }
            handle_app_event(state, AppEvent::Error(e.to_string()));
        }
    }
    state.set_reminders(controller.reminders().into_iter().cloned().collect());
    true
}

/// Startup reconciliation for the terminal front-end. A list that cannot be
/// read is fatal, so the stored blob is never overwritten by an empty one.
fn start_controller<S: KeyValueStore, A: AlarmService>(
    controller: &mut ReminderController<S, A>,
) -> Result<StartupReport> {
    controller
        .start()
        .map_err(|e| anyhow::anyhow!("Could not load reminders: {}", e))
}

fn arm_suffix(arm: ArmState) -> &'static str {
    match arm {
        ArmState::Exact => ".",
        ArmState::Approximate => " (alarm may be late).",
    }
}

pub async fn run() -> Result<()> {
    // --- 1. PREAMBLE & CONFIG ---
    let args: Vec<String> = env::args().collect();
    if args.len() > 1 && (args[1] == "--help" || args[1] == "-h") {
        println!("MediAlert - Medication reminders");
        println!("----------------------------------------");
        println!("Usage: medialert");
        println!();
        match Config::get_path_string() {
            Ok(path) => println!("Configuration File: {}", path),
            Err(_) => println!("Configuration Path: ~/.config/medialert/config.toml"),
        }
        println!();
        println!("Config Options:");
        println!("  dark_mode = false");
        println!("  dosage_presets = [\"1/4\", \"1/2\", \"1\", \"2\"]");
        println!("  log_level = \"info\"");
        return Ok(());
    }

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        use std::io::Write;
        if let Ok(mut file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("medialert_panic.log")
        {
            let _ = writeln!(file, "PANIC: {:?}", info);
        }
        default_hook(info);
    }));

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Could not read config ({:#}), using defaults.", e);
            Config::default()
        }
    };
    init_logging(&config.log_level);

    // --- 2. CONTROLLER & STARTUP RECONCILIATION ---
    let (fired_tx, mut fired_rx) = mpsc::unbounded_channel();
    let alarms = TokioAlarms::new(fired_tx)?;
    let storage = LocalStorage::open(REMINDERS_NAMESPACE)?;
    let mut controller = ReminderController::new(storage, alarms);

    let report = start_controller(&mut controller)?;

    // --- 3. TERMINAL SETUP ---
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app_state = AppState::new();
    app_state.dark_mode = config.dark_mode;
    app_state.dosage_presets = config.dosage_presets;
    app_state.set_reminders(controller.reminders().into_iter().cloned().collect());
    app_state.message = if report.failed.is_empty() {
        format!(
            "{} reminders, {} daily re-armed.",
            report.loaded,
            report.rearmed.len()
        )
    } else {
        format!("{} daily reminders could not be re-armed.", report.failed.len())
    };

    // --- 4. UI LOOP ---
    let outcome = async {
        loop {
            terminal.draw(|f| draw(f, &mut app_state))?;

            // A. Alarm Events
            while let Ok(payload) = fired_rx.try_recv() {
                handle_app_event(&mut app_state, AppEvent::AlarmFired(payload));
            }

            // B. User Input
            if event::poll(Duration::from_millis(50))? {
                match event::read()? {
                    Event::Mouse(mouse) => match mouse.kind {
                        MouseEventKind::ScrollDown => app_state.next(),
                        MouseEventKind::ScrollUp => app_state.previous(),
                        _ => {}
                    },
                    Event::Key(key) => {
                        if let Some(action) = handle_key_event(key, &mut app_state)
                            && !apply_action(action, &mut controller, &mut app_state)
                        {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            tokio::task::yield_now().await;
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    // --- 5. RESTORE TERMINAL ---
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    outcome
}
