//! Mutation pipeline: `idle → pending → (success | error)`.
//!
//! A [`Mutation`] runs one create/update/action request at a time. The
//! request runs on a spawned task; [`Mutation::poll`] observes its outcome
//! on the event loop and only then touches the cache, so invalidation never
//! precedes a confirmed success.

use std::future::Future;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::api::{ApiError, ResourceKind};
use crate::notify::Notifications;
use crate::query::QueryCache;

/// User-facing copy for one kind of mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationCopy {
  pub success: &'static str,
  /// Shown when the server gives no reason of its own
  pub failure: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState {
  Idle,
  Pending,
  Success,
  Error(String),
}

/// Outcome handed back to the owner once, when the request settles.
#[derive(Debug)]
pub enum Settled<T> {
  Success(T),
  Error(ApiError),
}

struct InFlight<T> {
  rx: oneshot::Receiver<Result<T, ApiError>>,
  invalidates: ResourceKind,
  copy: MutationCopy,
}

pub struct Mutation<T> {
  state: MutationState,
  in_flight: Option<InFlight<T>>,
}

impl<T> Default for Mutation<T> {
  fn default() -> Self {
    Self {
      state: MutationState::Idle,
      in_flight: None,
    }
  }
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> &MutationState {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    self.state == MutationState::Pending
  }

  /// Start `request`. Refused while a previous submission is pending.
  pub fn submit<Fut>(&mut self, invalidates: ResourceKind, copy: MutationCopy, request: Fut) -> bool
  where
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      // Receiver is gone if the owner unmounted meanwhile
      let _ = tx.send(request.await);
    });
    info!(resource = %invalidates, "mutation submitted");
    self.state = MutationState::Pending;
    self.in_flight = Some(InFlight {
      rx,
      invalidates,
      copy,
    });
    true
  }

  /// Observe a settled request. On success the resource's cache keys are
  /// invalidated and a success notification is pushed; on failure the
  /// server's reason (or the fallback copy) is pushed instead.
  pub fn poll(
    &mut self,
    cache: &mut QueryCache,
    notifications: &mut Notifications,
  ) -> Option<Settled<T>> {
    let in_flight = self.in_flight.as_mut()?;
    let result = match in_flight.rx.try_recv() {
      Ok(result) => result,
      Err(oneshot::error::TryRecvError::Empty) => return None,
      Err(oneshot::error::TryRecvError::Closed) => {
        Err(ApiError::Transport("request was cancelled".to_string()))
      }
    };
    let InFlight {
      invalidates, copy, ..
    } = self.in_flight.take()?;

    match result {
      Ok(value) => {
        info!(resource = %invalidates, "mutation succeeded");
        cache.invalidate_resource(invalidates);
        notifications.success(copy.success);
        self.state = MutationState::Success;
        Some(Settled::Success(value))
      }
      Err(error) => {
        warn!(resource = %invalidates, %error, "mutation failed");
        let message = error.user_message(copy.failure);
        notifications.error(message.clone());
        self.state = MutationState::Error(message);
        Some(Settled::Error(error))
      }
    }
  }

  /// Forget any pending request; its outcome will never be applied.
  pub fn cancel(&mut self) {
    self.in_flight = None;
    self.state = MutationState::Idle;
  }

  /// Back to idle after the owner consumed a settled outcome.
  pub fn reset(&mut self) {
    if !self.is_pending() {
      self.state = MutationState::Idle;
    }
  }
}
