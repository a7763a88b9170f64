//! Keyed query cache for remote collections.
//!
//! Inspired by TanStack Query: every collection the screens read lives under
//! a [`QueryKey`], is fetched at most once at a time, and is served from
//! memory until it goes stale or is invalidated. Loaders run on spawned tokio
//! tasks and report back over a channel that the event loop drains with
//! [`QueryCache::poll`] on each tick.
//!
//! # Example
//!
//! ```ignore
//! let key = QueryKey::all(ResourceKind::Expenses);
//! let gateway = gateway.clone();
//! let snapshot = cache.fetch(&key, move || async move {
//!     gateway.list::<ExpenseRecord>(ResourceKind::Expenses, &ListParams::new()).await
//! });
//!
//! // In event loop tick
//! if cache.poll() {
//!     // Some entry changed, re-read snapshots
//! }
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::api::{ApiError, QueryKey, ResourceKind};

type Payload = Arc<dyn Any + Send + Sync>;

/// What a reader sees for one key at one instant.
#[derive(Debug)]
pub struct QuerySnapshot<T> {
  /// Last successfully fetched value, kept across later failures
  pub data: Option<Arc<T>>,
  /// A request is in flight and there is nothing to show yet
  pub is_loading: bool,
  /// A request is in flight, with or without data to show
  pub is_fetching: bool,
  /// Error of the most recent completed request, cleared by the next success
  pub error: Option<ApiError>,
}

impl<T> Default for QuerySnapshot<T> {
  fn default() -> Self {
    Self {
      data: None,
      is_loading: false,
      is_fetching: false,
      error: None,
    }
  }
}

struct Completion {
  key: QueryKey,
  generation: u64,
  seq: u64,
  result: Result<Payload, ApiError>,
}

#[derive(Default)]
struct Entry {
  data: Option<Payload>,
  error: Option<ApiError>,
  /// When the last request for this key completed, successfully or not
  settled_at: Option<Instant>,
  /// Set by `invalidate`, cleared when a response issued after it is accepted
  invalidated: bool,
  /// Newest request that was already in flight when `invalidate` hit. Its
  /// response, and any older one, predates the invalidation.
  invalidated_after: Option<u64>,
  /// Highest sequence number whose response was accepted
  accepted_seq: u64,
  /// Most recently issued request still awaiting its response
  in_flight: Option<u64>,
}

impl Entry {
  fn invalidate(&mut self) {
    self.invalidated = true;
    if let Some(seq) = self.in_flight {
      self.invalidated_after = self.invalidated_after.max(Some(seq));
    }
  }

  fn needs_fetch(&self, stale_time: Duration) -> bool {
    if self.in_flight.is_some() {
      return false;
    }
    match self.settled_at {
      None => true,
      Some(at) => self.invalidated || at.elapsed() > stale_time,
    }
  }
}

pub struct QueryCache {
  entries: HashMap<QueryKey, Entry>,
  stale_time: Duration,
  /// Monotonic across all keys, so sequence numbers are never reused
  next_seq: u64,
  /// Bumped by `clear`; completions from an older generation are dropped
  generation: u64,
  tx: mpsc::UnboundedSender<Completion>,
  rx: mpsc::UnboundedReceiver<Completion>,
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new()
  }
}

impl QueryCache {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      entries: HashMap::new(),
      stale_time: Duration::from_secs(60),
      next_seq: 0,
      generation: 0,
      tx,
      rx,
    }
  }

  /// Set how long fetched data is served without a background refetch.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Read `key`, starting `loader` when the entry is missing, stale or
  /// invalidated and nothing is already in flight for it.
  ///
  /// The loader is only invoked when a request is actually issued, so any
  /// number of readers can call this on every tick.
  pub fn fetch<T, F, Fut>(&mut self, key: &QueryKey, loader: F) -> QuerySnapshot<T>
  where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let needs_fetch = self
      .entries
      .get(key)
      .map(|e| e.needs_fetch(self.stale_time))
      .unwrap_or(true);
    if needs_fetch {
      self.spawn(key, loader());
    }
    self.peek(key)
  }

  /// Issue a new request even if one is already in flight. Whichever
  /// response was issued last wins, regardless of arrival order.
  pub fn refetch<T, F, Fut>(&mut self, key: &QueryKey, loader: F) -> QuerySnapshot<T>
  where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    self.spawn(key, loader());
    self.peek(key)
  }

  /// Current state of `key` without starting anything.
  pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QuerySnapshot<T> {
    let Some(entry) = self.entries.get(key) else {
      return QuerySnapshot::default();
    };
    let data = entry.data.clone().and_then(|p| p.downcast::<T>().ok());
    QuerySnapshot {
      is_loading: entry.in_flight.is_some() && data.is_none(),
      is_fetching: entry.in_flight.is_some(),
      error: entry.error.clone(),
      data,
    }
  }

  /// Mark `key` stale. The next read refetches. A response already in flight
  /// is still stored when it lands but does not count as fresh, so the read
  /// after it issues exactly one new request.
  pub fn invalidate(&mut self, key: &QueryKey) {
    if let Some(entry) = self.entries.get_mut(key) {
      debug!(%key, "invalidated");
      entry.invalidate();
    }
  }

  /// Invalidate every key of a resource kind, whatever its parameters.
  pub fn invalidate_resource(&mut self, kind: ResourceKind) {
    for (key, entry) in self.entries.iter_mut().filter(|(k, _)| k.kind == kind) {
      debug!(%key, "invalidated");
      entry.invalidate();
    }
  }

  /// Drop every entry. Responses still in flight are ignored when they land.
  pub fn clear(&mut self) {
    self.entries.clear();
    self.generation += 1;
  }

  /// Apply completed requests. Returns `true` if any entry changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(completion) = self.rx.try_recv() {
      changed |= self.apply(completion);
    }
    changed
  }

  fn spawn<T, Fut>(&mut self, key: &QueryKey, future: Fut)
  where
    T: Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    self.next_seq += 1;
    let seq = self.next_seq;
    let generation = self.generation;
    self.entries.entry(key.clone()).or_default().in_flight = Some(seq);
    debug!(%key, seq, "fetch started");

    let tx = self.tx.clone();
    let key = key.clone();
    tokio::spawn(async move {
      let result = future.await.map(|v| Arc::new(v) as Payload);
      // Receiver may have been dropped with the cache
      let _ = tx.send(Completion {
        key,
        generation,
        seq,
        result,
      });
    });
  }

  fn apply(&mut self, completion: Completion) -> bool {
    let Completion {
      key,
      generation,
      seq,
      result,
    } = completion;
    if generation != self.generation {
      return false;
    }
    let Some(entry) = self.entries.get_mut(&key) else {
      return false;
    };

    if entry.in_flight == Some(seq) {
      entry.in_flight = None;
    }
    if seq <= entry.accepted_seq {
      debug!(%key, seq, accepted = entry.accepted_seq, "discarding out-of-order response");
      return false;
    }

    entry.accepted_seq = seq;
    entry.settled_at = Some(Instant::now());
    let predates_invalidation = entry.invalidated_after.is_some_and(|after| seq <= after);
    if predates_invalidation {
      debug!(%key, seq, "response predates invalidation, entry stays stale");
    } else {
      entry.invalidated = false;
      entry.invalidated_after = None;
    }
    match result {
      Ok(payload) => {
        debug!(%key, seq, "fetch accepted");
        entry.data = Some(payload);
        entry.error = None;
      }
      Err(error) => {
        debug!(%key, seq, %error, "fetch failed, keeping previous data");
        entry.error = Some(error);
      }
    }
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ListParams;
  use std::sync::atomic::{AtomicU32, Ordering};
  use tokio::sync::oneshot;

  fn incomes() -> QueryKey {
    QueryKey::all(ResourceKind::Incomes)
  }

  /// Let spawned loaders run to completion under the paused clock.
  async fn settle() {
    for _ in 0..5 {
      tokio::time::sleep(Duration::from_millis(1)).await;
    }
  }

  fn counting_loader(
    calls: &Arc<AtomicU32>,
    value: u32,
  ) -> impl FnOnce() -> futures::future::BoxFuture<'static, Result<u32, ApiError>> {
    let calls = calls.clone();
    move || {
      calls.fetch_add(1, Ordering::SeqCst);
      Box::pin(async move { Ok(value) })
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_first_read_loads_then_serves_data() {
    let mut cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    let snap = cache.fetch(&incomes(), counting_loader(&calls, 7));
    assert!(snap.is_loading);
    assert!(snap.data.is_none());

    settle().await;
    assert!(cache.poll());

    let snap: QuerySnapshot<u32> = cache.fetch(&incomes(), counting_loader(&calls, 8));
    assert_eq!(snap.data.as_deref(), Some(&7));
    assert!(!snap.is_loading);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_then_many_reads_issue_one_request() {
    let mut cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));
    cache.fetch(&incomes(), counting_loader(&calls, 1));
    settle().await;
    cache.poll();

    cache.invalidate(&incomes());
    cache.invalidate(&incomes());
    for _ in 0..10 {
      let snap = cache.fetch(&incomes(), counting_loader(&calls, 2));
      // Old data stays visible while the refetch runs
      assert_eq!(snap.data.as_deref(), Some(&1));
      assert!(snap.is_fetching);
      cache.invalidate(&incomes());
    }
    settle().await;
    cache.poll();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let snap: QuerySnapshot<u32> = cache.peek(&incomes());
    assert_eq!(snap.data.as_deref(), Some(&2));
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_during_fetch_forces_one_refetch() {
    let mut cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));
    cache.fetch(&incomes(), counting_loader(&calls, 1));
    settle().await;
    cache.poll();

    cache.invalidate(&incomes());
    let (tx, rx) = oneshot::channel::<u32>();
    cache.fetch(&incomes(), move || async move {
      rx.await.map_err(|e| ApiError::Transport(e.to_string()))
    });
    // A record is created while the list request is still out
    cache.invalidate(&incomes());
    cache.invalidate(&incomes());

    tx.send(2).unwrap();
    settle().await;
    assert!(cache.poll());
    let snap: QuerySnapshot<u32> = cache.peek(&incomes());
    assert_eq!(snap.data.as_deref(), Some(&2));

    for _ in 0..3 {
      cache.fetch(&incomes(), counting_loader(&calls, 3));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    settle().await;
    cache.poll();

    // The response issued after the invalidation is fresh again
    cache.fetch(&incomes(), counting_loader(&calls, 4));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let snap: QuerySnapshot<u32> = cache.peek(&incomes());
    assert_eq!(snap.data.as_deref(), Some(&3));
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_response_does_not_overwrite_newer() {
    let mut cache = QueryCache::new();
    let (first_tx, first_rx) = oneshot::channel::<u32>();
    let (second_tx, second_rx) = oneshot::channel::<u32>();

    cache.fetch(&incomes(), move || async move {
      first_rx.await.map_err(|e| ApiError::Transport(e.to_string()))
    });
    cache.refetch(&incomes(), move || async move {
      second_rx.await.map_err(|e| ApiError::Transport(e.to_string()))
    });

    second_tx.send(2).unwrap();
    settle().await;
    cache.poll();

    first_tx.send(1).unwrap();
    settle().await;
    assert!(!cache.poll());

    let snap: QuerySnapshot<u32> = cache.peek(&incomes());
    assert_eq!(snap.data.as_deref(), Some(&2));
    assert!(!snap.is_fetching);
  }

  #[tokio::test(start_paused = true)]
  async fn test_error_keeps_previous_data() {
    let mut cache = QueryCache::new();
    cache.fetch(&incomes(), || async { Ok::<_, ApiError>(vec![1u32, 2]) });
    settle().await;
    cache.poll();

    cache.invalidate(&incomes());
    cache.fetch(&incomes(), || async {
      Err::<Vec<u32>, _>(ApiError::Server {
        status: 503,
        message: None,
      })
    });
    settle().await;
    cache.poll();

    let snap: QuerySnapshot<Vec<u32>> = cache.peek(&incomes());
    assert_eq!(snap.data.as_deref(), Some(&vec![1, 2]));
    assert!(matches!(snap.error, Some(ApiError::Server { status: 503, .. })));
  }

  #[tokio::test(start_paused = true)]
  async fn test_never_resolving_request_stays_loading() {
    let mut cache = QueryCache::new();
    cache.fetch(&incomes(), || futures::future::pending::<Result<u32, ApiError>>());

    tokio::time::advance(Duration::from_secs(600)).await;
    cache.poll();

    let calls = Arc::new(AtomicU32::new(0));
    let snap = cache.fetch(&incomes(), counting_loader(&calls, 1));
    assert!(snap.is_loading);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_refetch_after_stale_time() {
    let mut cache = QueryCache::new().with_stale_time(Duration::from_secs(60));
    let calls = Arc::new(AtomicU32::new(0));
    cache.fetch(&incomes(), counting_loader(&calls, 1));
    settle().await;
    cache.poll();

    tokio::time::advance(Duration::from_secs(30)).await;
    cache.fetch(&incomes(), counting_loader(&calls, 2));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(31)).await;
    cache.fetch(&incomes(), counting_loader(&calls, 3));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_resource_spans_params() {
    let mut cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));
    let filtered = QueryKey::new(
      ResourceKind::Incomes,
      &ListParams::new().with("department", "1"),
    );
    let budgets = QueryKey::all(ResourceKind::Budgets);
    for key in [&incomes(), &filtered, &budgets] {
      cache.fetch(key, counting_loader(&calls, 1));
    }
    settle().await;
    cache.poll();

    cache.invalidate_resource(ResourceKind::Incomes);
    for key in [&incomes(), &filtered, &budgets] {
      cache.fetch(key, counting_loader(&calls, 2));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 5);
  }

  #[tokio::test(start_paused = true)]
  async fn test_clear_drops_late_responses() {
    let mut cache = QueryCache::new();
    let (tx, rx) = oneshot::channel::<u32>();
    cache.fetch(&incomes(), move || async move {
      rx.await.map_err(|e| ApiError::Transport(e.to_string()))
    });

    cache.clear();
    tx.send(9).unwrap();
    settle().await;

    assert!(!cache.poll());
    let snap: QuerySnapshot<u32> = cache.peek(&incomes());
    assert!(snap.data.is_none());
  }
}
