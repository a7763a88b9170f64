use ratatui::prelude::Color;

use crate::derived::Tone;

/// Truncate to at most `max_len` characters, ending in "..." if cut
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a badge tone
pub fn tone_color(tone: Tone) -> Color {
  match tone {
    Tone::Success => Color::Green,
    Tone::Info => Color::Cyan,
    Tone::Warning => Color::Yellow,
    Tone::Danger => Color::Red,
    Tone::Neutral => Color::Gray,
  }
}

/// Centered rect of at most `width` x `height` inside `area`
pub fn centered(area: ratatui::layout::Rect, width: u16, height: u16) -> ratatui::layout::Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  ratatui::layout::Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use ratatui::layout::Rect;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_counts_characters() {
    assert_eq!(truncate("₹12,34,567.00", 8), "₹12,3...");
  }

  #[test]
  fn test_tone_color() {
    assert_eq!(tone_color(Tone::Danger), Color::Red);
    assert_eq!(tone_color(Tone::Success), Color::Green);
  }

  #[test]
  fn test_centered_clamps_to_area() {
    let area = Rect::new(0, 0, 40, 10);
    assert_eq!(centered(area, 20, 4), Rect::new(10, 3, 20, 4));
    assert_eq!(centered(area, 80, 20), area);
  }
}
