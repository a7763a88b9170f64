//! Records mirrored from the finance API.
//!
//! Every record is a read-only snapshot of what the server returned. Decoding
//! is lenient: missing fields fall back to defaults and amounts that are
//! missing, null or unparseable read as zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A record addressable by its server id.
pub trait Record: Clone + Send + Sync + 'static {
  fn id(&self) -> u64;
}

/// Decode an amount sent either as a decimal string (`"1500.50"`) or a JSON
/// number (`1500.5`).
pub fn amount_from_value(value: &Value) -> Decimal {
  match value {
    Value::String(s) => s.trim().parse().unwrap_or(Decimal::ZERO),
    Value::Number(n) => {
      let s = n.to_string();
      s.parse()
        .or_else(|_| Decimal::from_scientific(&s))
        .unwrap_or(Decimal::ZERO)
    }
    _ => Decimal::ZERO,
  }
}

pub(crate) fn de_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(value.as_ref().map(amount_from_value).unwrap_or_default())
}

fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Statuses
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseStatus {
  #[default]
  Pending,
  Approved,
  Paid,
  Rejected,
  #[serde(other)]
  Other,
}

impl ExpenseStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "PENDING",
      Self::Approved => "APPROVED",
      Self::Paid => "PAID",
      Self::Rejected => "REJECTED",
      Self::Other => "UNKNOWN",
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetStatus {
  #[default]
  Draft,
  Pending,
  Approved,
  Rejected,
  Locked,
  #[serde(other)]
  Other,
}

impl BudgetStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Draft => "DRAFT",
      Self::Pending => "PENDING",
      Self::Approved => "APPROVED",
      Self::Rejected => "REJECTED",
      Self::Locked => "LOCKED",
      Self::Other => "UNKNOWN",
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalaryStatus {
  #[default]
  Pending,
  Paid,
  Cancelled,
  #[serde(other)]
  Other,
}

impl SalaryStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "PENDING",
      Self::Paid => "PAID",
      Self::Cancelled => "CANCELLED",
      Self::Other => "UNKNOWN",
    }
  }
}

// ============================================================================
// Screen records
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IncomeRecord {
  pub id: u64,
  pub income_source: Option<u64>,
  #[serde(deserialize_with = "de_text")]
  pub source_name: String,
  #[serde(deserialize_with = "de_amount")]
  pub amount: Decimal,
  pub date: Option<String>,
  #[serde(deserialize_with = "de_text")]
  pub payment_mode: String,
  pub department: Option<u64>,
  pub department_name: Option<String>,
  pub reference_id: Option<String>,
  pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExpenseRecord {
  pub id: u64,
  #[serde(deserialize_with = "de_text")]
  pub description: String,
  pub category: Option<u64>,
  #[serde(deserialize_with = "de_text")]
  pub category_name: String,
  pub department: Option<u64>,
  #[serde(deserialize_with = "de_text")]
  pub department_name: String,
  #[serde(deserialize_with = "de_amount")]
  pub amount: Decimal,
  pub date: Option<String>,
  pub payment_mode: Option<String>,
  pub status: ExpenseStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BudgetPlan {
  pub id: u64,
  pub department: Option<u64>,
  #[serde(deserialize_with = "de_text")]
  pub department_name: String,
  #[serde(deserialize_with = "de_text")]
  pub financial_year: String,
  pub month: Option<u32>,
  #[serde(deserialize_with = "de_amount")]
  pub allocated_amount: Decimal,
  #[serde(deserialize_with = "de_amount")]
  pub spent_amount: Decimal,
  pub status: BudgetStatus,
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SalaryRecord {
  pub id: u64,
  pub employee: Option<u64>,
  #[serde(deserialize_with = "de_text")]
  pub employee_name: String,
  pub department_name: Option<String>,
  pub month: u32,
  pub year: i32,
  #[serde(deserialize_with = "de_amount")]
  pub base_amount: Decimal,
  #[serde(deserialize_with = "de_amount")]
  pub allowances: Decimal,
  #[serde(deserialize_with = "de_amount")]
  pub deductions: Decimal,
  #[serde(deserialize_with = "de_amount")]
  pub net_amount: Decimal,
  pub status: SalaryStatus,
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Department {
  pub id: u64,
  #[serde(deserialize_with = "de_text")]
  pub name: String,
  #[serde(deserialize_with = "de_text")]
  pub code: String,
  pub description: Option<String>,
  pub head: Option<u64>,
  pub head_name: Option<String>,
  pub is_active: bool,
  pub created_at: Option<String>,
}

// ============================================================================
// Lookup records (form selectors)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IncomeSource {
  pub id: u64,
  #[serde(deserialize_with = "de_text")]
  pub name: String,
  #[serde(deserialize_with = "de_text")]
  pub code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExpenseCategory {
  pub id: u64,
  #[serde(deserialize_with = "de_text")]
  pub name: String,
  #[serde(deserialize_with = "de_text")]
  pub code: String,
  #[serde(deserialize_with = "de_text")]
  pub category_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Employee {
  pub id: u64,
  #[serde(deserialize_with = "de_text")]
  pub employee_id: String,
  #[serde(deserialize_with = "de_text")]
  pub first_name: String,
  #[serde(deserialize_with = "de_text")]
  pub last_name: String,
  #[serde(deserialize_with = "de_amount")]
  pub base_salary: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct User {
  pub id: u64,
  #[serde(deserialize_with = "de_text")]
  pub email: String,
  #[serde(deserialize_with = "de_text")]
  pub first_name: String,
  #[serde(deserialize_with = "de_text")]
  pub last_name: String,
}

impl User {
  pub fn display_name(&self) -> String {
    let full = format!("{} {}", self.first_name, self.last_name);
    let full = full.trim();
    if full.is_empty() {
      self.email.clone()
    } else {
      full.to_string()
    }
  }
}

macro_rules! impl_record {
  ($($ty:ty),* $(,)?) => {
    $(impl Record for $ty {
      fn id(&self) -> u64 {
        self.id
      }
    })*
  };
}

impl_record!(
  IncomeRecord,
  ExpenseRecord,
  BudgetPlan,
  SalaryRecord,
  Department,
  IncomeSource,
  ExpenseCategory,
  Employee,
  User,
);
