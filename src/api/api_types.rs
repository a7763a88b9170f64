//! Response shapes of the finance API and the normalization applied to them.
//!
//! List endpoints are inconsistent about pagination: some return a bare
//! array, others a `{"count": .., "results": [..]}` envelope. Both are folded
//! into [`ListPage`].

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::types::de_amount;

/// Normalized list response.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
  pub items: Vec<T>,
  /// Server-reported total when the response was paginated
  pub total: Option<u64>,
}

impl<T> Default for ListPage<T> {
  fn default() -> Self {
    Self {
      items: Vec::new(),
      total: None,
    }
  }
}

impl<T> ListPage<T> {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

/// Unwrap a list body into a page of typed items.
///
/// Unexpected shapes degrade to an empty page and items that fail to decode
/// are dropped, so a bad payload never takes the screen down.
pub fn normalize_list<T: DeserializeOwned>(context: &str, body: Value) -> ListPage<T> {
  let (raw, total) = match body {
    Value::Array(items) => (items, None),
    Value::Object(mut obj) => {
      let total = obj.get("count").and_then(|c| c.as_u64());
      match obj.remove("results") {
        Some(Value::Array(items)) => (items, total),
        _ => {
          warn!(context, "list response has no results array");
          (Vec::new(), None)
        }
      }
    }
    other => {
      warn!(context, kind = json_kind(&other), "list response is not a collection");
      (Vec::new(), None)
    }
  };

  let items = raw
    .into_iter()
    .filter_map(|item| match serde_json::from_value::<T>(item) {
      Ok(v) => Some(v),
      Err(e) => {
        warn!(context, error = %e, "skipping undecodable list item");
        None
      }
    })
    .collect();

  ListPage { items, total }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
  #[serde(default)]
  pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
  pub access: String,
  pub refresh: Option<String>,
  pub user: Option<SessionUser>,
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DepartmentFinance {
  pub department: String,
  #[serde(deserialize_with = "de_amount")]
  pub income: Decimal,
  #[serde(deserialize_with = "de_amount")]
  pub expenses: Decimal,
  #[serde(deserialize_with = "de_amount")]
  pub net: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DepartmentSummaryReport {
  pub departments: Vec<DepartmentFinance>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IncomeExpenseTotals {
  #[serde(deserialize_with = "de_amount")]
  pub total_income: Decimal,
  #[serde(deserialize_with = "de_amount")]
  pub total_expenses: Decimal,
  #[serde(deserialize_with = "de_amount")]
  pub balance: Decimal,
  pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IncomeVsExpenseReport {
  pub summary: IncomeExpenseTotals,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BreakdownLine {
  #[serde(rename = "department__name")]
  pub department: Option<String>,
  #[serde(rename = "category__name")]
  pub category: Option<String>,
  #[serde(deserialize_with = "de_amount")]
  pub total: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MonthlyExpenseReport {
  #[serde(deserialize_with = "de_amount")]
  pub total_expenses: Decimal,
  pub department_breakdown: Vec<BreakdownLine>,
  pub category_breakdown: Vec<BreakdownLine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BudgetVariance {
  pub department: String,
  pub period: String,
  #[serde(deserialize_with = "de_amount")]
  pub allocated_budget: Decimal,
  #[serde(deserialize_with = "de_amount")]
  pub actual_spent: Decimal,
  #[serde(deserialize_with = "de_amount")]
  pub variance: Decimal,
  pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BudgetVsActualReport {
  pub financial_year: String,
  pub budgets: Vec<BudgetVariance>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Department;
  use serde_json::json;

  #[test]
  fn test_bare_array() {
    let page: ListPage<Department> = normalize_list(
      "departments",
      json!([{"id": 1, "name": "Science"}, {"id": 2, "name": "Arts"}]),
    );
    assert_eq!(page.len(), 2);
    assert_eq!(page.total, None);
  }

  #[test]
  fn test_paginated_envelope() {
    let page: ListPage<Department> = normalize_list(
      "departments",
      json!({"count": 40, "next": "http://x/?page=2", "results": [{"id": 1, "name": "Science"}]}),
    );
    assert_eq!(page.len(), 1);
    assert_eq!(page.total, Some(40));
    assert_eq!(page.items[0].name, "Science");
  }

  #[test]
  fn test_unexpected_shape_is_empty() {
    let page: ListPage<Department> = normalize_list("departments", json!({"detail": "ok"}));
    assert!(page.is_empty());

    let page: ListPage<Department> = normalize_list("departments", json!("nope"));
    assert!(page.is_empty());
  }

  #[test]
  fn test_undecodable_items_are_dropped() {
    let page: ListPage<Department> =
      normalize_list("departments", json!([{"id": 1, "name": "Science"}, 42, "x"]));
    assert_eq!(page.len(), 1);
  }

  #[test]
  fn test_department_summary_decodes_floats() {
    let report: DepartmentSummaryReport = serde_json::from_value(json!({
      "period": {"start_date": "2024-01-01", "end_date": "2024-12-31"},
      "departments": [{"department": "Science", "income": 1200.5, "expenses": 200, "net": 1000.5}]
    }))
    .unwrap();
    assert_eq!(report.departments[0].net, Decimal::new(10005, 1));
  }
}
