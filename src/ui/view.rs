use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use crate::controller::Context;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct Shortcut {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl Shortcut {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
  /// No action needed
  None,
  /// Leave the current view
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, form, etc.) and return
/// actions for the App to execute: App → View → Components.
///
/// Views that load data read it through the shared [`Context`] cache in
/// `tick()`, which the App calls after applying finished requests.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent, ctx: &mut Context) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &Context);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to observe background work
  fn tick(&mut self, _ctx: &mut Context) {}

  /// Called once when the view is removed from the stack
  fn leave(&mut self) {}

  /// True while the view owns every key (open form, active search), so
  /// global keys like `:` and `q` are passed through.
  fn captures_input(&self) -> bool {
    false
  }

  /// True while the view waits on a request, shown in the footer
  fn is_busy(&self) -> bool {
    false
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}
