use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell as TableCell, Paragraph, Row, Table, TableState};

use crate::api::types::Record;
use crate::api::ListParams;
use crate::controller::{Context, ListController, Phase};
use crate::resources::Resource;
use crate::ui::components::{
  draw_form, handle_form_key, FormEvent, KeyResult, SearchEvent, SearchInput,
};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::tone_color;
use crate::ui::view::{Shortcut, View, ViewAction};

const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";

/// Static label for a single-letter key binding
fn key_label(c: char) -> &'static str {
  match LETTERS.find(c) {
    Some(i) => &LETTERS[i..i + 1],
    None => "?",
  }
}

/// Table screen for one resource: rows, filter, create/edit form and row
/// actions, all driven through a [`ListController`].
pub struct ResourceListView<R: Resource> {
  controller: ListController<R>,
  table_state: TableState,
  search: SearchInput,
  /// Row armed by a first `d`; a second `d` on it deletes
  confirm_delete: Option<u64>,
}

impl<R: Resource> ResourceListView<R> {
  pub fn new() -> Self {
    Self {
      controller: ListController::new(ListParams::new()),
      table_state: TableState::default(),
      search: SearchInput::new(),
      confirm_delete: None,
    }
  }

  fn selected_id(&self) -> Option<u64> {
    let idx = self.table_state.selected()?;
    self.controller.rows().get(idx).map(|r| r.id())
  }

  fn handle_form(&mut self, key: KeyEvent, ctx: &mut Context) {
    // Input is frozen while the submission is pending
    let Some(form) = self.controller.form_mut() else {
      return;
    };
    match handle_form_key(form, key) {
      KeyResult::Event(FormEvent::Submit) => {
        self.controller.submit(ctx);
      }
      KeyResult::Event(FormEvent::Cancel) => {
        self.controller.close_form();
      }
      _ => {}
    }
  }

  fn title(&self, ctx: &Context) -> String {
    let mut title = format!(" {} ({})", R::TITLE, self.controller.rows().len());
    if let Some(total) = self.controller.total() {
      title.push_str(&format!(" · Total {}", ctx.formatter.currency(Some(total))));
    }
    if !self.controller.filter().is_empty() {
      title.push_str(&format!(" [/{}]", self.controller.filter()));
    }
    if let Some(id) = self.confirm_delete {
      title.push_str(&format!(" · press d again to delete #{}", id));
    }
    if self.controller.is_fetching() {
      title.push_str(" (loading...)");
    } else if let Some(error) = self.controller.error() {
      title.push_str(&format!(" (stale: {})", error));
    }
    title.push(' ');
    title
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect, ctx: &Context) {
    let block = Block::default()
      .title(self.title(ctx))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let message = match self.controller.phase() {
      Phase::Loading => Some(("Loading...".to_string(), Color::DarkGray)),
      Phase::Empty => Some((
        "No records found. Press 'n' to add one.".to_string(),
        Color::DarkGray,
      )),
      Phase::Failed(reason) => Some((format!("{}. Press 'r' to retry.", reason), Color::Red)),
      Phase::Ready if self.controller.rows().is_empty() => Some((
        format!("No records match \"{}\".", self.controller.filter()),
        Color::DarkGray,
      )),
      Phase::Ready => None,
    };
    if let Some((text, color)) = message {
      let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(color));
      frame.render_widget(paragraph, area);
      return;
    }

    let rows = self.controller.rows();
    ensure_valid_selection(&mut self.table_state, rows.len());

    let columns = R::columns();
    let header = Row::new(columns.iter().map(|c| TableCell::from(c.header)))
      .style(Style::default().fg(Color::Yellow).bold());
    let body = rows.iter().map(|record| {
      Row::new(R::cells(record, &ctx.formatter).into_iter().map(|cell| {
        let style = cell
          .tone
          .map(|tone| Style::default().fg(tone_color(tone)))
          .unwrap_or_default();
        TableCell::from(cell.text).style(style)
      }))
    });
    let widths = columns.iter().map(|c| Constraint::Percentage(c.width));

    let table = Table::new(body, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

impl<R: Resource> Default for ResourceListView<R> {
  fn default() -> Self {
    Self::new()
  }
}

impl<R: Resource> View for ResourceListView<R> {
  fn handle_key(&mut self, key: KeyEvent, ctx: &mut Context) -> ViewAction {
    if self.controller.form().is_some() {
      self.handle_form(key, ctx);
      return ViewAction::None;
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(query)) => {
        self.controller.set_filter(query);
        self.table_state.select(Some(0));
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    // Row keys act on the row the table shows as selected
    ensure_valid_selection(&mut self.table_state, self.controller.rows().len());
    let armed = self.confirm_delete.take();
    match key.code {
      KeyCode::Char('d') if R::COPY.delete.is_some() => {
        if let Some(id) = self.selected_id() {
          if armed == Some(id) {
            self.controller.delete(ctx, id);
          } else {
            self.confirm_delete = Some(id);
          }
        }
      }
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('n') => self.controller.open_create(ctx),
      KeyCode::Char('e') => {
        if let Some(id) = self.selected_id() {
          self.controller.open_edit(ctx, id);
        }
      }
      KeyCode::Char('r') => self.controller.refresh(ctx),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      KeyCode::Char(c) => {
        let action = R::actions().into_iter().find(|a| a.key == c);
        if let (Some(action), Some(id)) = (action, self.selected_id()) {
          self.controller.run_action(ctx, &action, id);
        }
      }
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &Context) {
    self.render_table(frame, area, ctx);
    if let Some(form) = self.controller.form() {
      draw_form(
        frame,
        area,
        form,
        self.controller.is_submitting(),
        self.controller.submit_error(),
      );
    }
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    R::TITLE.to_string()
  }

  fn tick(&mut self, ctx: &mut Context) {
    self.controller.sync(ctx);
  }

  fn leave(&mut self) {
    self.controller.unmount();
  }

  fn captures_input(&self) -> bool {
    self.controller.form().is_some() || self.search.is_active()
  }

  fn is_busy(&self) -> bool {
    self.controller.is_fetching() || self.controller.is_submitting()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    if self.controller.form().is_some() {
      return vec![
        Shortcut::new("tab", "next field").with_priority(10),
        Shortcut::new("enter", "save").with_priority(20),
        Shortcut::new("esc", "cancel").with_priority(30),
      ];
    }
    let mut shortcuts = vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("/", "filter").with_priority(20),
      Shortcut::new("n", "new").with_priority(30),
      Shortcut::new("e", "edit").with_priority(40),
      Shortcut::new("r", "refresh").with_priority(50),
      Shortcut::new("q", "back").with_priority(90),
    ];
    if R::COPY.delete.is_some() {
      shortcuts.push(Shortcut::new("d", "delete").with_priority(70));
    }
    for action in R::actions() {
      shortcuts.push(Shortcut::new(key_label(action.key), action.label).with_priority(60));
    }
    shortcuts
  }
}
