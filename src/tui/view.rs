use crate::tui::state::{AppState, FormField, InputMode};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

struct Palette {
    text: Color,
    accent: Color,
    muted: Color,
    error: Color,
}

fn palette(dark_mode: bool) -> Palette {
    if dark_mode {
        Palette {
            text: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            error: Color::LightRed,
        }
    } else {
        Palette {
            text: Color::Black,
            accent: Color::Blue,
            muted: Color::Gray,
            error: Color::Red,
        }
    }
}

pub fn draw(f: &mut Frame, state: &mut AppState) {
    let colors = palette(state.dark_mode);
    let v_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    // --- Reminder List ---
    if state.reminders.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from("No reminders yet."),
            Line::from(Span::styled(
                "Press 'a' to add your first medication reminder.",
                Style::default().fg(colors.muted),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title(" MediAlert "));
        f.render_widget(empty, v_chunks[0]);
    } else {
        let items: Vec<ListItem> = state
            .reminders
            .iter()
            .map(|r| {
                let repeat = if r.is_daily { " [daily]" } else { "" };
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{} ", r.time_label()),
                        Style::default().fg(colors.accent),
                    ),
                    Span::styled(r.medicine_name.clone(), Style::default().fg(colors.text)),
                    Span::styled(
                        format!("  {}{}", r.dosage, repeat),
                        Style::default().fg(colors.muted),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Reminders ({}) ", state.reminders.len())),
            )
            .highlight_style(
                Style::default()
                    .add_modifier(Modifier::BOLD)
                    .bg(colors.accent),
            );
        f.render_stateful_widget(list, v_chunks[0], &mut state.list_state);
    }

    // --- Status Bar ---
    let help = match state.mode {
        InputMode::Normal => "a:Add  e:Edit  d:Delete  q:Quit",
        InputMode::Form => "Tab:Next field  Up/Down:Dosage preset  Space:Daily  Enter:Save  Esc:Cancel",
        InputMode::ConfirmDelete => "y:Delete  any other key:Cancel",
    };
    let status = Paragraph::new(vec![
        Line::from(state.message.clone()),
        Line::from(Span::styled(help, Style::default().fg(colors.muted))),
    ])
    .block(Block::default().borders(Borders::TOP));
    f.render_widget(status, v_chunks[1]);

    if state.mode == InputMode::Form {
        draw_form(f, state, &colors);
    }
}

fn draw_form(f: &mut Frame, state: &AppState, colors: &Palette) {
    let area = centered_rect(60, 50, f.area());
    f.render_widget(Clear, area);

    let title = if state.form.editing.is_some() {
        " Edit Reminder "
    } else {
        " Add Reminder "
    };

    let field_line = |label: &str, value: String, field: FormField| {
        let style = if state.form.focus == field {
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.text)
        };
        let cursor = if state.form.focus == field { "_" } else { "" };
        Line::from(vec![
            Span::styled(format!("{:<14}", label), style),
            Span::raw(format!("{}{}", value, cursor)),
        ])
    };

    let input = &state.form.input;
    let mut lines = vec![
        field_line("Medicine name", input.medicine_name.clone(), FormField::MedicineName),
        field_line("Dosage", input.dosage.clone(), FormField::Dosage),
        field_line("Time (HH:MM)", input.time.clone(), FormField::Time),
        field_line(
            "Repeat daily",
            if input.is_daily { "[x]" } else { "[ ]" }.to_string(),
            FormField::Daily,
        ),
    ];

    if let Some((field, message)) = &state.form.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{}: {}", field.label(), message),
            Style::default().fg(colors.error),
        )));
    }

    let form = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(form, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
