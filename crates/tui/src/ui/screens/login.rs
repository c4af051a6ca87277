use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::Span,
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::{
    app::{AppState, LoginField},
    ui::{components::centered_box, theme::Theme},
};

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState) {
    let theme = Theme::default();

    let card_area = centered_box(40, 7, area);
    frame.render_widget(Clear, card_area);

    let block = Block::default()
        .title(" crmdesk login ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border));

    let inner = block.inner(card_area);
    frame.render_widget(block, card_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Email
            Constraint::Length(1),
            Constraint::Length(1), // Password
        ])
        .margin(1)
        .split(inner);

    let login = &state.login;
    render_input(
        frame,
        rows[0],
        "email",
        &login.email,
        false,
        login.focus == LoginField::Email,
        &theme,
    );
    render_input(
        frame,
        rows[2],
        "password",
        &login.password,
        true,
        login.focus == LoginField::Password,
        &theme,
    );

    if let Some(message) = &login.message {
        let error_area = Rect {
            x: area.x,
            y: card_area.y + card_area.height + 1,
            width: area.width,
            height: 1,
        };
        frame.render_widget(
            Paragraph::new(Span::styled(
                message.as_str(),
                Style::default().fg(theme.error),
            ))
            .alignment(Alignment::Center),
            error_area.intersection(area),
        );
    }
}

fn render_input(
    frame: &mut Frame<'_>,
    area: Rect,
    placeholder: &str,
    value: &str,
    is_password: bool,
    focused: bool,
    theme: &Theme,
) {
    let cursor = if focused { "│" } else { "" };

    let (display, style) = if value.is_empty() && !focused {
        (placeholder.to_string(), Style::default().fg(theme.border))
    } else if is_password {
        (format!("{}{cursor}", mask_password(value)), input_style(focused, theme))
    } else {
        (format!("{value}{cursor}"), input_style(focused, theme))
    };

    frame.render_widget(Paragraph::new(Span::styled(display, style)), area);
}

fn input_style(focused: bool, theme: &Theme) -> Style {
    if focused {
        Style::default().fg(theme.accent)
    } else {
        Style::default().fg(theme.text_muted)
    }
}

/// One bullet per character.
pub fn mask_password(password: &str) -> String {
    "•".repeat(password.chars().count())
}
