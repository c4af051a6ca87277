use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
};

use crate::{app::AppState, ui::theme::Theme};

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    if !state.users.is_loaded() {
        return super::render_empty(frame, area, "users", "Loading users… (r to retry)", theme);
    }
    let users = state.users.users();
    if users.is_empty() {
        return super::render_empty(frame, area, "users", "No users yet. Press a to add one.", theme);
    }

    let header = Row::new(["User Id", "Name", "Role", "CRM Email", "Agent Mobile"])
        .style(
            Style::default()
                .fg(theme.text_muted)
                .add_modifier(Modifier::BOLD),
        );

    let rows = users.iter().map(|user| {
        let pending = state.users.is_pending(&user.id);
        let style = if pending {
            Style::default().fg(theme.text_muted)
        } else {
            Style::default().fg(theme.text)
        };
        Row::new([
            Cell::from(user.id.clone()),
            Cell::from(user.username.clone()),
            Cell::from(user.role.as_str()),
            Cell::from(user.crm_email.clone()),
            Cell::from(user.agent_mobile.clone()),
        ])
        .style(style)
    });

    let widths = [
        Constraint::Length(12),
        Constraint::Percentage(25),
        Constraint::Length(11),
        Constraint::Percentage(35),
        Constraint::Length(14),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(format!(" users ({}) ", users.len()))
                .borders(Borders::TOP)
                .border_style(Style::default().fg(theme.border)),
        )
        .row_highlight_style(Style::default().bg(theme.selection).fg(theme.accent))
        .highlight_symbol("› ");

    let mut table_state = TableState::default().with_selected(Some(state.user_selected));
    frame.render_stateful_widget(table, area, &mut table_state);
}
