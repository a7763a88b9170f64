use rust_decimal::Decimal;

use super::{Cell, Column, Resource, ResourceCopy, RowAction, PAYMENT_MODES};
use crate::api::types::ExpenseRecord;
use crate::api::ResourceKind;
use crate::derived::{expense_tone, format_date, Formatter};
use crate::form::{DefaultValue, FieldKind, FieldSpec, FormSchema, OptionSource};
use crate::mutation::MutationCopy;

pub struct Expenses;

const INITIAL_STATUS: &[(&str, &str)] = &[
  ("PENDING", "Pending Approval"),
  ("APPROVED", "Already Approved"),
  ("PAID", "Mark as Paid"),
];

impl Resource for Expenses {
  type Record = ExpenseRecord;

  const KIND: ResourceKind = ResourceKind::Expenses;
  const TITLE: &'static str = "Expense Management";
  const NOUN: &'static str = "expenses";
  const COPY: ResourceCopy = ResourceCopy {
    create: MutationCopy {
      success: "Expense recorded successfully!",
      failure: "Failed to record expense",
    },
    update: MutationCopy {
      success: "Expense updated successfully!",
      failure: "Failed to update expense",
    },
    delete: Some(MutationCopy {
      success: "Expense deleted",
      failure: "Failed to delete expense",
    }),
  };

  fn columns() -> Vec<Column> {
    vec![
      Column::new("Description", 30),
      Column::new("Category", 26),
      Column::new("Amount", 16),
      Column::new("Date", 14),
      Column::new("Status", 14),
    ]
  }

  fn cells(record: &ExpenseRecord, fmt: &Formatter) -> Vec<Cell> {
    let category = if record.department_name.is_empty() {
      record.category_name.clone()
    } else {
      format!("{} · {}", record.category_name, record.department_name)
    };
    vec![
      Cell::plain(record.description.clone()),
      Cell::plain(category),
      Cell::plain(fmt.amount(record.amount)),
      Cell::plain(format_date(record.date.as_deref())),
      Cell::toned(record.status.as_str(), expense_tone(record.status)),
    ]
  }

  fn search_text(record: &ExpenseRecord) -> String {
    format!(
      "{} {} {} {}",
      record.description,
      record.category_name,
      record.department_name,
      record.status.as_str()
    )
  }

  fn form() -> FormSchema {
    FormSchema {
      title: "Record Expense",
      fields: vec![
        FieldSpec::new("description", "Description", FieldKind::Text).required(),
        FieldSpec::new(
          "category",
          "Category",
          FieldKind::Select(OptionSource::Lookup(ResourceKind::ExpenseCategories)),
        )
        .required(),
        FieldSpec::new(
          "department",
          "Department",
          FieldKind::Select(OptionSource::Lookup(ResourceKind::Departments)),
        )
        .required(),
        FieldSpec::new("amount", "Amount", FieldKind::Amount).required(),
        FieldSpec::new("date", "Date", FieldKind::Date)
          .required()
          .default(DefaultValue::Today),
        FieldSpec::new(
          "payment_mode",
          "Payment Mode",
          FieldKind::Select(OptionSource::Fixed(PAYMENT_MODES)),
        )
        .default(DefaultValue::Literal("CASH")),
        FieldSpec::new(
          "status",
          "Status",
          FieldKind::Select(OptionSource::Fixed(INITIAL_STATUS)),
        )
        .default(DefaultValue::Literal("PENDING")),
      ],
      derivations: Vec::new(),
    }
  }

  fn form_values(record: &ExpenseRecord) -> Vec<(&'static str, String)> {
    let id = |v: Option<u64>| v.map(|v| v.to_string()).unwrap_or_default();
    vec![
      ("description", record.description.clone()),
      ("category", id(record.category)),
      ("department", id(record.department)),
      ("amount", record.amount.to_string()),
      ("date", record.date.clone().unwrap_or_default()),
      (
        "payment_mode",
        record.payment_mode.clone().unwrap_or_else(|| "CASH".into()),
      ),
      ("status", record.status.as_str().to_string()),
    ]
  }

  fn amount(record: &ExpenseRecord) -> Option<Decimal> {
    Some(record.amount)
  }

  /// Status transitions. The server decides which are allowed from the
  /// current status and rejects the rest with a reason.
  fn actions() -> Vec<RowAction> {
    vec![
      RowAction {
        key: 'a',
        name: "approve",
        label: "approve",
        copy: MutationCopy {
          success: "Expense approved",
          failure: "Failed to approve expense",
        },
      },
      RowAction {
        key: 'x',
        name: "reject",
        label: "reject",
        copy: MutationCopy {
          success: "Expense rejected",
          failure: "Failed to reject expense",
        },
      },
      RowAction {
        key: 'p',
        name: "mark_paid",
        label: "mark paid",
        copy: MutationCopy {
          success: "Expense marked as paid",
          failure: "Failed to mark expense as paid",
        },
      },
    ]
  }
}
