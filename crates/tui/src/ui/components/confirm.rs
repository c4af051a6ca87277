use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::ui::{components::centered_box, theme::Theme};

pub fn render(frame: &mut Frame<'_>, area: Rect, prompt: &str, theme: &Theme) {
    let width = (prompt.chars().count() as u16 + 6).max(30);
    let rect = centered_box(width, 5, area);
    frame.render_widget(Clear, rect);

    let block = Block::default()
        .title(" confirm ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.error));

    let lines = vec![
        Line::from(Span::styled(prompt, Style::default().fg(theme.text))),
        Line::from(vec![
            Span::styled("y", Style::default().fg(theme.accent)),
            Span::raw(" yes  "),
            Span::styled("n", Style::default().fg(theme.accent)),
            Span::raw(" no"),
        ]),
    ];
    let content = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(content, rect);
}
