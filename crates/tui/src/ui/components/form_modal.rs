use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::{
    app::{FormInput, FormState},
    ui::{components::centered_box, screens::login::mask_password, theme::Theme},
};

const LABEL_WIDTH: usize = 14;

pub fn render(frame: &mut Frame<'_>, area: Rect, form: &FormState, theme: &Theme) {
    // Banner, then a value row and an error row per input.
    let height = (form.inputs.len() as u16) * 2 + 4;
    let rect = centered_box(64, height, area);
    frame.render_widget(Clear, rect);

    let block = Block::default()
        .title(form.kind.title())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let mut constraints = vec![Constraint::Length(1)];
    constraints.extend(form.inputs.iter().flat_map(|_| [Constraint::Length(1); 2]));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .horizontal_margin(1)
        .split(inner);

    if let Some(banner) = form.errors.banner_message() {
        frame.render_widget(
            Paragraph::new(Span::styled(banner, Style::default().fg(theme.error))),
            rows[0],
        );
    }

    for (index, input) in form.inputs.iter().enumerate() {
        let focused = index == form.focus;
        let value_row = rows[1 + index * 2];
        let error_row = rows[2 + index * 2];

        frame.render_widget(
            Paragraph::new(input_line(input, form.values.get(input.name), focused, theme)),
            value_row,
        );
        if let Some(message) = form.errors.field(input.name) {
            let indent = " ".repeat(LABEL_WIDTH);
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!("{indent}{message}"),
                    Style::default().fg(theme.error),
                )),
                error_row,
            );
        }
    }
}

fn input_line(input: &FormInput, value: &str, focused: bool, theme: &Theme) -> Line<'static> {
    let label_style = if focused {
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text_muted)
    };
    let value_style = if focused {
        Style::default().fg(theme.accent)
    } else {
        Style::default().fg(theme.text)
    };

    let shown = if input.secret {
        mask_password(value)
    } else {
        value.to_string()
    };
    let mut spans = vec![
        Span::styled(format!("{:<width$}", input.label, width = LABEL_WIDTH), label_style),
        Span::styled(shown, value_style),
    ];
    if focused {
        spans.push(Span::styled("│", value_style));
    }
    if focused && !input.choices.is_empty() {
        spans.push(Span::styled(
            format!("  ({})", input.choices.join("/")),
            Style::default().fg(theme.text_muted),
        ));
    }
    Line::from(spans)
}
