use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::notify::{Level, Notifications};

const TOAST_WIDTH: u16 = 48;
const MAX_TOASTS: usize = 3;

/// Stack the newest notifications in the bottom-right corner of `area`
pub fn draw_toasts(frame: &mut Frame, area: Rect, notifications: &Notifications) {
  let width = TOAST_WIDTH.min(area.width);
  let mut bottom = area.y + area.height;

  for note in notifications.visible().iter().rev().take(MAX_TOASTS) {
    let inner_width = width.saturating_sub(2).max(1) as usize;
    let lines = (note.message.chars().count() / inner_width + 1) as u16;
    let height = lines + 2;
    if bottom < area.y + height {
      break;
    }
    bottom -= height;
    let rect = Rect::new(area.x + area.width - width, bottom, width, height);

    let (title, color) = match note.level {
      Level::Success => (" ✓ ", Color::Green),
      Level::Error => (" ✗ ", Color::Red),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(color));
    let paragraph = Paragraph::new(note.message.as_str())
      .block(block)
      .wrap(Wrap { trim: true });

    frame.render_widget(Clear, rect);
    frame.render_widget(paragraph, rect);
  }
}
