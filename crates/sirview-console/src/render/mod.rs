//! Pure drawing of view state. Nothing here mutates the session.

mod chart;
mod frame;

pub use chart::{series, StatsChart};
pub use frame::{status_color, FrameRenderer};

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn draw_placeholder(frame: &mut Frame, area: Rect, title: &str, message: &str) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner_height = area.height.saturating_sub(2);
    let mut lines: Vec<Line> = (0..inner_height / 2).map(|_| Line::from("")).collect();
    lines.push(Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(Color::DarkGray),
    )));
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}
