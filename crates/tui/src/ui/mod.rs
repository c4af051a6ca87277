pub mod components;
pub mod keymap;
pub mod screens;

mod terminal;
mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::app::{AppState, Modal, Screen, Section};

use components::hints::{KeyHint, hint_separator, hints_to_spans};

pub use terminal::{AppTerminal as Terminal, restore_terminal, setup_terminal};
pub use theme::Theme;

pub fn render(frame: &mut Frame<'_>, state: &AppState) {
    let area = frame.area();
    match state.screen {
        Screen::Login => screens::login::render(frame, area, state),
        Screen::Shell => render_shell(frame, area, state),
    }
    components::toast::render(frame, area, state.toast.as_ref());
}

fn render_shell(frame: &mut Frame<'_>, area: Rect, state: &AppState) {
    let theme = Theme::default();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Info bar
            Constraint::Length(2), // Tabs
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Hints
        ])
        .split(area);

    render_info_bar(frame, layout[0], state, &theme);
    components::tabs::render_tabs(frame, layout[1], state.section, &theme);

    match state.section {
        Section::Users => screens::users::render(frame, layout[2], state, &theme),
        Section::Crm => screens::crm_fields::render(frame, layout[2], state, &theme),
    }

    render_bottom_bar(frame, layout[3], state, &theme);

    match &state.modal {
        Some(Modal::Form(form)) => components::form_modal::render(frame, area, form, &theme),
        Some(Modal::ConfirmDelete(target)) => {
            components::confirm::render(frame, area, &target.prompt(), &theme)
        }
        None => {}
    }
}

fn render_info_bar(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let user = state.identity.as_deref().unwrap_or("-");
    let refresh = state
        .last_refresh
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    let (status, status_style) = if state.connection.ok {
        ("OK", Style::default().fg(theme.positive))
    } else {
        ("OFFLINE", Style::default().fg(theme.error))
    };

    let line = Line::from(vec![
        Span::styled("Server", Style::default().fg(theme.text_muted)),
        Span::raw(format!(": {}  ", state.base_url)),
        Span::styled("User", Style::default().fg(theme.text_muted)),
        Span::raw(format!(": {user}  ")),
        Span::styled("Refresh", Style::default().fg(theme.text_muted)),
        Span::raw(format!(": {refresh}  ")),
        Span::styled(status, status_style),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

fn render_bottom_bar(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let hints = match &state.modal {
        Some(Modal::Form(_)) => vec![
            KeyHint::new("Tab", "next"),
            KeyHint::new("←→", "choose"),
            KeyHint::new("Enter", "save"),
            KeyHint::new("Esc", "cancel"),
        ],
        Some(Modal::ConfirmDelete(_)) => {
            vec![KeyHint::new("y", "delete"), KeyHint::new("n", "keep")]
        }
        None => shell_hints(state),
    };

    let mut parts = components::tabs::tab_shortcuts(theme);
    parts.push(hint_separator(theme));
    parts.extend(hints_to_spans(&hints, theme));
    parts.push(hint_separator(theme));
    parts.extend(hints_to_spans(
        &[KeyHint::new("L", "logout"), KeyHint::new("q", "quit")],
        theme,
    ));

    frame.render_widget(Paragraph::new(Line::from(parts)), area);
}

fn shell_hints(state: &AppState) -> Vec<KeyHint> {
    let mut hints = vec![
        KeyHint::new("↑↓", "select"),
        KeyHint::new("a", "add"),
        KeyHint::new("e", "edit"),
        KeyHint::new("d", "delete"),
    ];
    if state.section == Section::Crm {
        hints.push(KeyHint::new("[ ]", "campaign"));
    }
    let refresh = if state.has_retry() { "retry" } else { "refresh" };
    hints.push(KeyHint::new("r", refresh));
    hints
}
