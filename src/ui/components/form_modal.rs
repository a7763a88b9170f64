use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use super::KeyResult;
use crate::form::{FieldKind, FormState};
use crate::ui::renderfns::{centered, truncate};

const LABEL_WIDTH: usize = 20;

/// What the parent should do with the open form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
  Submit,
  Cancel,
}

/// Apply an editing key to `form`. Enter and Esc are reported back.
pub fn handle_form_key(form: &mut FormState, key: KeyEvent) -> KeyResult<FormEvent> {
  let kind = form.focused().map(|f| f.kind);
  match key.code {
    KeyCode::Esc => return KeyResult::Event(FormEvent::Cancel),
    KeyCode::Enter => return KeyResult::Event(FormEvent::Submit),
    KeyCode::Tab | KeyCode::Down => form.focus_next(),
    KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
    KeyCode::Left => form.cycle(-1),
    KeyCode::Right => form.cycle(1),
    KeyCode::Backspace => form.pop_char(),
    KeyCode::Char(' ') if matches!(kind, Some(FieldKind::Toggle | FieldKind::Select(_))) => {
      form.cycle(1)
    }
    KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => form.push_char(c),
    _ => return KeyResult::NotHandled,
  }
  KeyResult::Handled
}

/// Draw `form` as a centered modal over `area`
pub fn draw_form(
  frame: &mut Frame,
  area: Rect,
  form: &FormState,
  submitting: bool,
  submit_error: Option<&str>,
) {
  let fields = &form.schema().fields;
  let height = fields.len() as u16 * 2 + 5;
  let rect = centered(area, 72, height);

  let title = match form.editing() {
    Some(id) => format!(" Edit record #{} ", id),
    None => format!(" {} ", form.title()),
  };
  let block = Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(if submitting { Color::DarkGray } else { Color::Yellow }));

  let value_width = (rect.width as usize).saturating_sub(LABEL_WIDTH + 6);
  let mut lines: Vec<Line> = Vec::new();
  for (i, field) in fields.iter().enumerate() {
    let focused = i == form.focus_index() && !submitting;
    let marker = if field.required { "*" } else { " " };
    let label_style = if focused {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    let shown = match field.kind {
      FieldKind::Toggle => {
        if form.value(field.name) == "true" {
          "[x]".to_string()
        } else {
          "[ ]".to_string()
        }
      }
      FieldKind::Select(_) => {
        let value = form.display_value(field.name);
        if value.is_empty() {
          "‹ choose ›".to_string()
        } else {
          format!("‹ {} ›", value)
        }
      }
      _ => form.display_value(field.name),
    };
    let value_style = match field.kind {
      FieldKind::Computed => Style::default().fg(Color::DarkGray).italic(),
      _ if focused => Style::default().fg(Color::White).underlined(),
      _ => Style::default().fg(Color::Gray),
    };

    let mut spans = vec![
      Span::styled(
        format!("{}{:<width$}", marker, truncate(field.label, LABEL_WIDTH), width = LABEL_WIDTH),
        label_style,
      ),
      Span::raw(" "),
      Span::styled(truncate(&shown, value_width), value_style),
    ];
    if focused && !matches!(field.kind, FieldKind::Select(_) | FieldKind::Toggle) {
      spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
    }
    lines.push(Line::from(spans));

    let hint = form.error(field.name).unwrap_or("");
    lines.push(Line::from(Span::styled(
      format!(" {:<width$} {}", "", hint, width = LABEL_WIDTH),
      Style::default().fg(Color::Red),
    )));
  }

  let status = if submitting {
    Span::styled("Saving…", Style::default().fg(Color::Yellow))
  } else if let Some(message) = submit_error {
    Span::styled(message.to_string(), Style::default().fg(Color::Red))
  } else {
    Span::styled(
      "Tab next · ←/→ choose · Enter save · Esc cancel",
      Style::default().fg(Color::DarkGray),
    )
  };
  lines.push(Line::from(status));

  frame.render_widget(Clear, rect);
  frame.render_widget(Paragraph::new(lines).block(block), rect);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::resources::{Departments, Resource};
  use chrono::NaiveDate;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn department_form() -> FormState {
    FormState::new(
      Departments::form(),
      NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
    )
  }

  #[test]
  fn test_typing_and_toggle() {
    let mut form = department_form();
    for c in "Science".chars() {
      handle_form_key(&mut form, key(KeyCode::Char(c)));
    }
    assert_eq!(form.value("name"), "Science");

    // name, code, head, description, is_active
    for _ in 0..4 {
      handle_form_key(&mut form, key(KeyCode::Tab));
    }
    assert_eq!(form.focused().map(|f| f.name), Some("is_active"));
    handle_form_key(&mut form, key(KeyCode::Char(' ')));
    assert_eq!(form.value("is_active"), "false");
  }

  #[test]
  fn test_enter_and_esc_reported() {
    let mut form = department_form();
    assert_eq!(
      handle_form_key(&mut form, key(KeyCode::Enter)),
      KeyResult::Event(FormEvent::Submit)
    );
    assert_eq!(
      handle_form_key(&mut form, key(KeyCode::Esc)),
      KeyResult::Event(FormEvent::Cancel)
    );
  }
}
