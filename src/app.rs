use crate::api::api_types::SessionUser;
use crate::api::Gateway;
use crate::commands::{self, Action};
use crate::config::{Config, Screen};
use crate::controller::Context;
use crate::event::{Event, EventHandler};
use crate::resources::{Budgets, Departments, Expenses, Incomes, Salaries};
use crate::session::{Session, StoredSession};
use crate::ui::components::{draw_footer, draw_toasts, CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::draw_header;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{ReportsView, ResourceListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::{stdout, Stdout};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

fn user_label(user: &SessionUser) -> String {
  let name = format!("{} {}", user.first_name, user.last_name);
  match name.trim() {
    "" => user.email.clone(),
    name => name.to_string(),
  }
}

/// Main application state
pub struct App {
  config: Config,
  ctx: Context,
  session: Session,
  session_rx: watch::Receiver<Option<StoredSession>>,

  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Command palette (after pressing :)
  command: CommandInput,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config, gateway: Gateway, session: Session, screen: Screen) -> Self {
    let ctx = Context::new(
      gateway,
      config.currency.formatter(),
      config.cache.stale_time(),
    );
    let session_rx = session.subscribe();
    let mut app = Self {
      config,
      ctx,
      session,
      session_rx,
      view_stack: Vec::new(),
      command: CommandInput::new(),
      should_quit: false,
    };
    let root = app.make_view(screen);
    app.view_stack.push(root);
    app
  }

  fn make_view(&self, screen: Screen) -> Box<dyn View> {
    match screen {
      Screen::Incomes => Box::new(ResourceListView::<Incomes>::new()),
      Screen::Expenses => Box::new(ResourceListView::<Expenses>::new()),
      Screen::Budgets => Box::new(ResourceListView::<Budgets>::new()),
      Screen::Salaries => Box::new(ResourceListView::<Salaries>::new()),
      Screen::Departments => Box::new(ResourceListView::<Departments>::new()),
      Screen::Reports => Box::new(ReportsView::new(self.ctx.today())),
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.main_loop(&mut terminal).await;

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(250));
    self.tick();

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => {
          self.handle_key(key);
          // Apply the key's effects before the next frame
          self.tick();
        }
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    for view in self.view_stack.iter_mut() {
      view.leave();
    }
    Ok(())
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    let title = self
      .config
      .title
      .clone()
      .unwrap_or_else(|| "School Finance".to_string());
    let user = self.session.user().map(|u| user_label(&u));
    let user = match (&user, self.session.is_authenticated()) {
      (Some(name), _) => Some(name.as_str()),
      (None, true) => Some("signed in"),
      (None, false) => None,
    };
    let shortcuts = self
      .view_stack
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default();
    draw_header(frame, chunks[0], &title, &self.config.api.host(), user, &shortcuts);

    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, chunks[1], &self.ctx);
    }
    draw_toasts(frame, chunks[1], &self.ctx.notifications);
    self.command.render_overlay(frame, chunks[1]);

    let breadcrumb: Vec<String> = self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect();
    let busy = self.view_stack.last().map(|v| v.is_busy()).unwrap_or(false);
    draw_footer(frame, chunks[2], &breadcrumb, busy);
  }

  /// Apply finished background work, then let the current view re-read.
  fn tick(&mut self) {
    if self.session_rx.has_changed().unwrap_or(false) {
      let signed_in = self.session_rx.borrow_and_update().is_some();
      self.on_session_changed(signed_in);
    }
    self.ctx.cache.poll();
    self.ctx.notifications.prune();
    if let Some(view) = self.view_stack.last_mut() {
      view.tick(&mut self.ctx);
    }
  }

  /// Cached data belongs to the previous identity.
  fn on_session_changed(&mut self, signed_in: bool) {
    info!(signed_in, "session changed, clearing cache");
    self.ctx.cache.clear();
    if signed_in {
      self.ctx.notifications.success("Signed in");
    } else {
      self
        .ctx
        .notifications
        .error("Signed out. Run `bursar login` to sign in again.");
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
      match key.code {
        KeyCode::Char('c') => {
          self.should_quit = true;
          return;
        }
        KeyCode::Char('d') => {
          self.ctx.notifications.dismiss_latest();
          return;
        }
        _ => {}
      }
    }

    // An open form or search owns `:` as a plain character
    let captured = self
      .view_stack
      .last()
      .map(|v| v.captures_input())
      .unwrap_or(false);
    if !captured || self.command.is_active() {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let Some(view) = self.view_stack.last_mut() else {
      return;
    };
    if view.handle_key(key, &mut self.ctx) == ViewAction::Pop {
      self.pop_view();
    }
  }

  fn pop_view(&mut self) {
    if self.view_stack.len() > 1 {
      if let Some(mut view) = self.view_stack.pop() {
        view.leave();
      }
    } else {
      self.should_quit = true;
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    match commands::resolve(cmd) {
      Some(Action::Open(screen)) => {
        for mut view in self.view_stack.drain(..) {
          view.leave();
        }
        let root = self.make_view(screen);
        self.view_stack.push(root);
      }
      Some(Action::Logout) => {
        if let Err(e) = self.session.logout() {
          warn!(error = %e, "logout failed");
          self.ctx.notifications.error(format!("Logout failed: {}", e));
        }
      }
      Some(Action::Quit) => self.should_quit = true,
      None if cmd.is_empty() => {}
      None => {
        self
          .ctx
          .notifications
          .error(format!("Unknown command: {}", cmd));
      }
    }
  }
}
