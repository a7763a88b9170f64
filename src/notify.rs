//! Short-lived user notifications, shown as toasts over the current view.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Success,
  Error,
}

impl Level {
  fn ttl(self) -> Duration {
    match self {
      Level::Success => Duration::from_secs(3),
      Level::Error => Duration::from_secs(6),
    }
  }
}

#[derive(Debug, Clone)]
pub struct Notification {
  pub id: u64,
  pub level: Level,
  pub message: String,
  expires_at: Instant,
}

/// Queue of visible notifications, newest last.
#[derive(Debug, Default)]
pub struct Notifications {
  items: Vec<Notification>,
  next_id: u64,
}

impl Notifications {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn success(&mut self, message: impl Into<String>) -> u64 {
    self.push(Level::Success, message.into())
  }

  pub fn error(&mut self, message: impl Into<String>) -> u64 {
    self.push(Level::Error, message.into())
  }

  fn push(&mut self, level: Level, message: String) -> u64 {
    self.next_id += 1;
    self.items.push(Notification {
      id: self.next_id,
      level,
      message,
      expires_at: Instant::now() + level.ttl(),
    });
    self.next_id
  }

  pub fn dismiss(&mut self, id: u64) {
    self.items.retain(|n| n.id != id);
  }

  pub fn dismiss_latest(&mut self) {
    self.items.pop();
  }

  /// Drop expired notifications. Returns `true` if any were removed.
  pub fn prune(&mut self) -> bool {
    let now = Instant::now();
    let before = self.items.len();
    self.items.retain(|n| n.expires_at > now);
    self.items.len() != before
  }

  pub fn visible(&self) -> &[Notification] {
    &self.items
  }

  pub fn latest(&self) -> Option<&Notification> {
    self.items.last()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}
