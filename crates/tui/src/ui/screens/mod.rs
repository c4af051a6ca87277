pub mod crm_fields;
pub mod login;
pub mod users;

use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Paragraph},
};

use crate::ui::theme::Theme;

/// Placeholder shown while a collection is empty or not loaded.
fn render_empty(frame: &mut Frame<'_>, area: Rect, title: &str, message: &str, theme: &Theme) {
    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::TOP)
        .border_style(Style::default().fg(theme.border));
    frame.render_widget(
        Paragraph::new(message.to_string())
            .style(Style::default().fg(theme.text_muted))
            .block(block),
        area,
    );
}
