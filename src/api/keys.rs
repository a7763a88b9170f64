//! Resource kinds, list parameters and the cache keys built from them.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Every collection the client reads from the finance API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
  Incomes,
  IncomeSources,
  Expenses,
  ExpenseCategories,
  Budgets,
  Salaries,
  Employees,
  Departments,
  Users,
  DepartmentSummary,
  IncomeVsExpense,
  MonthlyExpense,
  BudgetVsActual,
}

impl ResourceKind {
  /// Collection path, relative to the API base URL.
  pub fn path(&self) -> &'static str {
    match self {
      Self::Incomes => "finance/incomes/",
      Self::IncomeSources => "finance/income-sources/",
      Self::Expenses => "finance/expenses/",
      Self::ExpenseCategories => "finance/expense-categories/",
      Self::Budgets => "budget/",
      Self::Salaries => "salary/salaries/",
      Self::Employees => "salary/employees/",
      Self::Departments => "departments/",
      Self::Users => "auth/users/",
      Self::DepartmentSummary => "reports/department-summary/",
      Self::IncomeVsExpense => "reports/income-vs-expense/",
      Self::MonthlyExpense => "reports/monthly-expense/",
      Self::BudgetVsActual => "reports/budget-vs-actual/",
    }
  }

  /// Detail path for a single record.
  pub fn detail_path(&self, id: u64) -> String {
    format!("{}{}/", self.path(), id)
  }

  /// Short stable name used in cache keys and logs.
  pub fn name(&self) -> &'static str {
    match self {
      Self::Incomes => "incomes",
      Self::IncomeSources => "income_sources",
      Self::Expenses => "expenses",
      Self::ExpenseCategories => "expense_categories",
      Self::Budgets => "budgets",
      Self::Salaries => "salaries",
      Self::Employees => "employees",
      Self::Departments => "departments",
      Self::Users => "users",
      Self::DepartmentSummary => "department_summary",
      Self::IncomeVsExpense => "income_vs_expense",
      Self::MonthlyExpense => "monthly_expense",
      Self::BudgetVsActual => "budget_vs_actual",
    }
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Query-string filters for a list request. Ordered so the fingerprint is
/// independent of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListParams(BTreeMap<String, String>);

impl ListParams {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.0.insert(key.into(), value.into());
    self
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Canonical `k=v&k=v` form.
  pub fn canonical(&self) -> String {
    self
      .pairs()
      .map(|(k, v)| format!("{}={}", k, v))
      .collect::<Vec<_>>()
      .join("&")
  }

  /// SHA256 of the canonical form, hex encoded. Empty params fingerprint
  /// to the empty string so the common unfiltered key stays readable.
  pub fn fingerprint(&self) -> String {
    if self.is_empty() {
      return String::new();
    }
    let mut hasher = Sha256::new();
    hasher.update(self.canonical().as_bytes());
    hex::encode(hasher.finalize())
  }
}

/// Address of a cache entry: resource type plus parameter fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
  pub kind: ResourceKind,
  pub fingerprint: String,
}

impl QueryKey {
  pub fn new(kind: ResourceKind, params: &ListParams) -> Self {
    Self {
      kind,
      fingerprint: params.fingerprint(),
    }
  }

  /// Key for the unfiltered collection.
  pub fn all(kind: ResourceKind) -> Self {
    Self::new(kind, &ListParams::new())
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.fingerprint.is_empty() {
      write!(f, "{}", self.kind)
    } else {
      write!(f, "{}:{}", self.kind, &self.fingerprint[..12])
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fingerprint_ignores_insertion_order() {
    let a = ListParams::new().with("status", "PAID").with("department", "3");
    let b = ListParams::new().with("department", "3").with("status", "PAID");
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.canonical(), "department=3&status=PAID");
  }

  #[test]
  fn test_fingerprint_distinguishes_params() {
    let a = ListParams::new().with("status", "PAID");
    let b = ListParams::new().with("status", "PENDING");
    assert_ne!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.fingerprint().len(), 64);
  }

  #[test]
  fn test_unfiltered_key() {
    let key = QueryKey::all(ResourceKind::Incomes);
    assert_eq!(key.fingerprint, "");
    assert_eq!(key.to_string(), "incomes");
  }

  #[test]
  fn test_detail_path() {
    assert_eq!(ResourceKind::Expenses.detail_path(7), "finance/expenses/7/");
    assert_eq!(ResourceKind::Budgets.detail_path(12), "budget/12/");
  }
}
