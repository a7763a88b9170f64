//! Generic list controller behind every resource screen.
//!
//! A [`ListController`] owns the screen's cache key, client-side filter,
//! open form and mutation. The view calls [`ListController::sync`] on every
//! tick; that is the only place outcomes of background work are applied.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::api::api_types::ListPage;
use crate::api::types::Record;
use crate::api::{Gateway, ListParams, QueryKey};
use crate::derived::{total, Formatter};
use crate::form::{FieldKind, FormState, OptionSource};
use crate::mutation::{Mutation, MutationState, Settled};
use crate::notify::Notifications;
use crate::query::{QueryCache, QuerySnapshot};
use crate::resources::{lookup_options, Resource, RowAction};

fn local_today() -> NaiveDate {
  chrono::Local::now().date_naive()
}

/// Shared state every screen works against.
pub struct Context {
  pub cache: QueryCache,
  pub gateway: Gateway,
  pub notifications: Notifications,
  pub formatter: Formatter,
  /// Clock used for form defaults
  pub today: fn() -> NaiveDate,
}

impl Context {
  pub fn new(gateway: Gateway, formatter: Formatter, stale_time: Duration) -> Self {
    Self {
      cache: QueryCache::new().with_stale_time(stale_time),
      gateway,
      notifications: Notifications::new(),
      formatter,
      today: local_today,
    }
  }

  pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
    self.today = today;
    self
  }

  pub fn today(&self) -> NaiveDate {
    (self.today)()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
  Loading,
  Ready,
  Empty,
  Failed(String),
}

pub struct ListController<R: Resource> {
  key: QueryKey,
  params: ListParams,
  snapshot: QuerySnapshot<ListPage<R::Record>>,
  filter: String,
  form: Option<FormState>,
  mutation: Mutation<Value>,
  alive: bool,
}

impl<R: Resource> ListController<R> {
  pub fn new(params: ListParams) -> Self {
    Self {
      key: QueryKey::new(R::KIND, &params),
      params,
      snapshot: QuerySnapshot::default(),
      filter: String::new(),
      form: None,
      mutation: Mutation::new(),
      alive: true,
    }
  }

  /// Stop applying anything to this controller. A pending mutation is
  /// forgotten; its request still reaches the server.
  pub fn unmount(&mut self) {
    debug!(resource = %R::KIND, "list unmounted");
    self.alive = false;
    self.mutation.cancel();
  }

  /// Observe settled work and (re)read the screen's collections.
  pub fn sync(&mut self, ctx: &mut Context) {
    if !self.alive {
      return;
    }

    if let Some(settled) = self.mutation.poll(&mut ctx.cache, &mut ctx.notifications) {
      match settled {
        Settled::Success(_) => {
          self.form = None;
          self.mutation.reset();
        }
        // Form stays open with its values for correction
        Settled::Error(_) => {}
      }
    }

    let gateway = ctx.gateway.clone();
    let params = self.params.clone();
    self.snapshot = ctx.cache.fetch(&self.key, move || async move {
      gateway.list::<R::Record>(R::KIND, &params).await
    });

    self.load_lookups(ctx);
  }

  /// Fetch every lookup collection the form needs and hand loaded options to
  /// the open form.
  fn load_lookups(&mut self, ctx: &mut Context) {
    for field in R::form().fields {
      let FieldKind::Select(OptionSource::Lookup(kind)) = field.kind else {
        continue;
      };
      let Some(options) = lookup_options(kind, ctx) else {
        continue;
      };
      if let Some(form) = self.form.as_mut() {
        if form.options(field.name) != options {
          form.set_options(field.name, options);
        }
      }
    }
  }

  pub fn phase(&self) -> Phase {
    match (&self.snapshot.data, &self.snapshot.error) {
      (Some(page), _) if page.is_empty() => Phase::Empty,
      (Some(_), _) => Phase::Ready,
      (None, Some(error)) if !self.snapshot.is_fetching => Phase::Failed(
        error.user_message(&format!("Failed to load {}", R::NOUN)),
      ),
      _ => Phase::Loading,
    }
  }

  /// Last fetch error, shown alongside stale rows.
  pub fn error(&self) -> Option<String> {
    self.snapshot.error.as_ref().map(|e| e.to_string())
  }

  pub fn is_fetching(&self) -> bool {
    self.snapshot.is_fetching
  }

  fn page(&self) -> Option<&Arc<ListPage<R::Record>>> {
    self.snapshot.data.as_ref()
  }

  /// Cached rows matching the filter, case-insensitively.
  pub fn rows(&self) -> Vec<&R::Record> {
    let needle = self.filter.trim().to_lowercase();
    self
      .page()
      .map(|page| {
        page
          .items
          .iter()
          .filter(|r| needle.is_empty() || R::search_text(r).to_lowercase().contains(&needle))
          .collect()
      })
      .unwrap_or_default()
  }

  /// Sum of the visible rows' amounts, for amount-bearing resources.
  pub fn total(&self) -> Option<Decimal> {
    let amounts: Vec<Decimal> = self.rows().into_iter().filter_map(R::amount).collect();
    if amounts.is_empty() {
      None
    } else {
      Some(total(amounts))
    }
  }

  pub fn filter(&self) -> &str {
    &self.filter
  }

  pub fn set_filter(&mut self, filter: impl Into<String>) {
    self.filter = filter.into();
  }

  pub fn form(&self) -> Option<&FormState> {
    self.form.as_ref()
  }

  pub fn form_mut(&mut self) -> Option<&mut FormState> {
    if self.mutation.is_pending() {
      return None;
    }
    self.form.as_mut()
  }

  /// Open a blank form at its defaults.
  pub fn open_create(&mut self, ctx: &mut Context) {
    self.mutation.reset();
    self.form = Some(FormState::new(R::form(), ctx.today()));
    self.load_lookups(ctx);
  }

  /// Open the form seeded from cached record `id`. Returns `false` when the
  /// record is not in the cached page.
  pub fn open_edit(&mut self, ctx: &mut Context, id: u64) -> bool {
    let Some(record) = self
      .page()
      .and_then(|page| page.items.iter().find(|r| r.id() == id))
    else {
      return false;
    };
    let seed = R::form_values(record);
    self.mutation.reset();
    self.form = Some(FormState::for_edit(R::form(), ctx.today(), id, seed));
    self.load_lookups(ctx);
    true
  }

  /// Discard the open form. Refused while its submission is pending.
  pub fn close_form(&mut self) -> bool {
    if self.mutation.is_pending() {
      return false;
    }
    self.form = None;
    self.mutation.reset();
    true
  }

  pub fn is_submitting(&self) -> bool {
    self.mutation.is_pending()
  }

  /// Last submission error, while the form is still open.
  pub fn submit_error(&self) -> Option<&str> {
    match self.mutation.state() {
      MutationState::Error(message) => Some(message),
      _ => None,
    }
  }

  /// Validate the open form and hand it to the mutation pipeline. Returns
  /// `true` if a request was issued.
  pub fn submit(&mut self, ctx: &mut Context) -> bool {
    if self.mutation.is_pending() {
      return false;
    }
    let Some(form) = self.form.as_mut() else {
      return false;
    };
    if !form.validate() {
      debug!(resource = %R::KIND, errors = form.errors().len(), "form invalid");
      return false;
    }

    let payload = form.to_payload();
    let editing = form.editing();
    let copy = match editing {
      Some(_) => R::COPY.update,
      None => R::COPY.create,
    };
    let gateway = ctx.gateway.clone();
    self.mutation.submit(R::KIND, copy, async move {
      match editing {
        Some(id) => gateway.update::<Value>(R::KIND, id, &payload).await,
        None => gateway.create::<Value>(R::KIND, &payload).await,
      }
    })
  }

  /// Run a row action such as `approve` on record `id`.
  pub fn run_action(&mut self, ctx: &mut Context, action: &RowAction, id: u64) -> bool {
    if self.mutation.is_pending() {
      return false;
    }
    let gateway = ctx.gateway.clone();
    let name = action.name;
    self.mutation.submit(R::KIND, action.copy, async move {
      gateway.action::<Value>(R::KIND, id, name).await
    })
  }

  /// Delete record `id`. Returns `false` for kinds that cannot be deleted.
  pub fn delete(&mut self, ctx: &mut Context, id: u64) -> bool {
    let Some(copy) = R::COPY.delete else {
      return false;
    };
    if self.mutation.is_pending() {
      return false;
    }
    let gateway = ctx.gateway.clone();
    self.mutation.submit(R::KIND, copy, async move {
      gateway.delete(R::KIND, id).await.map(|()| Value::Null)
    })
  }

  /// Refetch the screen's collection now, even if a request is in flight.
  pub fn refresh(&mut self, ctx: &mut Context) {
    let gateway = ctx.gateway.clone();
    let params = self.params.clone();
    self.snapshot = ctx.cache.refetch(&self.key, move || async move {
      gateway.list::<R::Record>(R::KIND, &params).await
    });
  }
}
