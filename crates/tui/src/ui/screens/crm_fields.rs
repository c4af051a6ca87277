use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
};

use crate::{app::AppState, ui::theme::Theme};

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(area);

    render_campaigns(frame, layout[0], state, theme);

    let Some(campaign) = state.crm.selected_campaign() else {
        let message = if state.crm.is_loaded() {
            "No campaign selected. Use [ and ] to pick one."
        } else {
            "Loading CRM configuration… (r to retry)"
        };
        return super::render_empty(frame, layout[1], "crm fields", message, theme);
    };
    if campaign.crm_fields.is_empty() {
        return super::render_empty(
            frame,
            layout[1],
            "crm fields",
            "No fields in this campaign. Press a to add one.",
            theme,
        );
    }

    let header = Row::new(["#", "Caption", "Type", "Required", "Read only"]).style(
        Style::default()
            .fg(theme.text_muted)
            .add_modifier(Modifier::BOLD),
    );

    let rows = campaign.crm_fields.iter().map(|field| {
        let style = if state.crm.is_pending(&field.id) {
            Style::default().fg(theme.text_muted)
        } else {
            Style::default().fg(theme.text)
        };
        Row::new([
            Cell::from(field.position.to_string()),
            Cell::from(field.caption.clone()),
            Cell::from(field.field_type.as_str()),
            Cell::from(yes_no(field.required)),
            Cell::from(yes_no(field.read_only)),
        ])
        .style(style)
    });

    let widths = [
        Constraint::Length(4),
        Constraint::Percentage(40),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(format!(" {} fields ", campaign.crm_fields.len()))
                .borders(Borders::TOP)
                .border_style(Style::default().fg(theme.border)),
        )
        .row_highlight_style(Style::default().bg(theme.selection).fg(theme.accent))
        .highlight_symbol("› ");

    let mut table_state = TableState::default().with_selected(Some(state.field_selected));
    frame.render_stateful_widget(table, layout[1], &mut table_state);
}

fn render_campaigns(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let selected = state.crm.selected_campaign().map(|campaign| campaign.id.as_str());

    let mut spans = vec![Span::styled(
        " Campaign: ",
        Style::default().fg(theme.text_muted),
    )];
    for (i, campaign) in state.crm.campaigns().iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        let style = if Some(campaign.id.as_str()) == selected {
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text_muted)
        };
        spans.push(Span::styled(campaign.campaign_name.clone(), style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}
