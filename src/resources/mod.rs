//! Resource descriptors. Each screen variant is one [`Resource`] impl that
//! tells the generic list controller which endpoint to read, how to render
//! rows, and which form to open.

mod budget;
mod department;
mod expense;
mod income;
mod salary;

pub use budget::Budgets;
pub use department::Departments;
pub use expense::Expenses;
pub use income::Incomes;
pub use salary::Salaries;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use crate::api::types::{Department, Employee, ExpenseCategory, IncomeSource, Record, User};
use crate::api::{ListParams, QueryKey, ResourceKind};
use crate::controller::Context;
use crate::derived::{Formatter, Tone};
use crate::form::{FormSchema, SelectOption};
use crate::mutation::MutationCopy;

pub const PAYMENT_MODES: &[(&str, &str)] = &[
  ("CASH", "Cash"),
  ("UPI", "UPI"),
  ("BANK", "Bank Transfer"),
  ("CHEQUE", "Cheque"),
  ("CARD", "Card"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
  pub header: &'static str,
  /// Share of the table width, in percent
  pub width: u16,
}

impl Column {
  pub const fn new(header: &'static str, width: u16) -> Self {
    Self { header, width }
  }
}

/// One rendered table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
  pub text: String,
  pub tone: Option<Tone>,
}

impl Cell {
  pub fn plain(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      tone: None,
    }
  }

  pub fn toned(text: impl Into<String>, tone: Tone) -> Self {
    Self {
      text: text.into(),
      tone: Some(tone),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceCopy {
  pub create: MutationCopy,
  pub update: MutationCopy,
  /// `None` when records of this kind cannot be deleted
  pub delete: Option<MutationCopy>,
}

/// A server-side action on a single record, bound to a key in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowAction {
  pub key: char,
  /// Action endpoint segment, e.g. `mark_paid`
  pub name: &'static str,
  pub label: &'static str,
  pub copy: MutationCopy,
}

pub trait Resource: 'static {
  type Record: Record + DeserializeOwned;

  const KIND: ResourceKind;
  const TITLE: &'static str;
  /// Plural lowercase name used in messages, `"incomes"`
  const NOUN: &'static str;
  const COPY: ResourceCopy;

  fn columns() -> Vec<Column>;

  fn cells(record: &Self::Record, fmt: &Formatter) -> Vec<Cell>;

  /// Text the client-side filter matches against.
  fn search_text(record: &Self::Record) -> String;

  fn form() -> FormSchema;

  /// Current values of `record` keyed by form field, for the edit form.
  fn form_values(record: &Self::Record) -> Vec<(&'static str, String)>;

  /// Amount contributing to the list total, if the resource has one.
  fn amount(_record: &Self::Record) -> Option<Decimal> {
    None
  }

  fn actions() -> Vec<RowAction> {
    Vec::new()
  }
}

/// Lookup record usable as a form select option.
pub trait Choice: Record + DeserializeOwned {
  fn option(&self) -> SelectOption;
}

impl Choice for Department {
  fn option(&self) -> SelectOption {
    SelectOption::new(self.id.to_string(), self.name.clone())
  }
}

impl Choice for ExpenseCategory {
  fn option(&self) -> SelectOption {
    SelectOption::new(self.id.to_string(), self.name.clone())
  }
}

impl Choice for IncomeSource {
  fn option(&self) -> SelectOption {
    SelectOption::new(self.id.to_string(), self.name.clone())
  }
}

impl Choice for Employee {
  fn option(&self) -> SelectOption {
    SelectOption::new(
      self.id.to_string(),
      format!(
        "{} {} ({})",
        self.first_name, self.last_name, self.employee_id
      ),
    )
    .with_extra(self.base_salary.to_string())
  }
}

impl Choice for User {
  fn option(&self) -> SelectOption {
    SelectOption::new(
      self.id.to_string(),
      format!("{} ({})", self.display_name(), self.email),
    )
  }
}

/// Read (and if needed fetch) the options of a lookup collection. `None`
/// until the collection has loaded, or for kinds that are not lookups.
pub fn lookup_options(kind: ResourceKind, ctx: &mut Context) -> Option<Vec<SelectOption>> {
  match kind {
    ResourceKind::Departments => load_choices::<Department>(kind, ctx),
    ResourceKind::ExpenseCategories => load_choices::<ExpenseCategory>(kind, ctx),
    ResourceKind::IncomeSources => load_choices::<IncomeSource>(kind, ctx),
    ResourceKind::Employees => load_choices::<Employee>(kind, ctx),
    ResourceKind::Users => load_choices::<User>(kind, ctx),
    _ => None,
  }
}

fn load_choices<C: Choice>(kind: ResourceKind, ctx: &mut Context) -> Option<Vec<SelectOption>> {
  let gateway = ctx.gateway.clone();
  let snapshot = ctx.cache.fetch(&QueryKey::all(kind), move || async move {
    gateway.list::<C>(kind, &ListParams::new()).await
  });
  snapshot
    .data
    .map(|page| page.items.iter().map(Choice::option).collect())
}

/// Block bar such as `███░░`, `width` cells wide.
pub(crate) fn bar(ratio: f64, width: usize) -> String {
  let filled = ((ratio.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
  format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
