use rust_decimal::Decimal;

use super::{Cell, Column, Resource, ResourceCopy, PAYMENT_MODES};
use crate::api::types::IncomeRecord;
use crate::api::ResourceKind;
use crate::derived::{format_date, Formatter, Tone};
use crate::form::{DefaultValue, FieldKind, FieldSpec, FormSchema, OptionSource};
use crate::mutation::MutationCopy;

pub struct Incomes;

fn mode_label(code: &str) -> &str {
  if code.is_empty() {
    return "Cash";
  }
  PAYMENT_MODES
    .iter()
    .find(|(value, _)| *value == code)
    .map(|(_, label)| *label)
    .unwrap_or(code)
}

impl Resource for Incomes {
  type Record = IncomeRecord;

  const KIND: ResourceKind = ResourceKind::Incomes;
  const TITLE: &'static str = "Income Management";
  const NOUN: &'static str = "incomes";
  const COPY: ResourceCopy = ResourceCopy {
    create: MutationCopy {
      success: "Income record added successfully!",
      failure: "Failed to add income record",
    },
    update: MutationCopy {
      success: "Income record updated successfully!",
      failure: "Failed to update income record",
    },
    delete: Some(MutationCopy {
      success: "Income deleted",
      failure: "Failed to delete income",
    }),
  };

  fn columns() -> Vec<Column> {
    vec![
      Column::new("Source", 28),
      Column::new("Amount", 18),
      Column::new("Date", 16),
      Column::new("Department", 22),
      Column::new("Payment Mode", 16),
    ]
  }

  fn cells(record: &IncomeRecord, fmt: &Formatter) -> Vec<Cell> {
    vec![
      Cell::plain(record.source_name.clone()),
      Cell::plain(fmt.amount(record.amount)),
      Cell::plain(format_date(record.date.as_deref())),
      Cell::plain(
        record
          .department_name
          .clone()
          .unwrap_or_else(|| "General".to_string()),
      ),
      Cell::toned(mode_label(&record.payment_mode), Tone::Info),
    ]
  }

  fn search_text(record: &IncomeRecord) -> String {
    format!(
      "{} {} {}",
      record.source_name,
      record.department_name.as_deref().unwrap_or(""),
      record.description.as_deref().unwrap_or("")
    )
  }

  fn form() -> FormSchema {
    FormSchema {
      title: "Record Income",
      fields: vec![
        FieldSpec::new(
          "income_source",
          "Income Source",
          FieldKind::Select(OptionSource::Lookup(ResourceKind::IncomeSources)),
        )
        .required(),
        FieldSpec::new("amount", "Amount", FieldKind::Amount).required(),
        FieldSpec::new("date", "Date", FieldKind::Date)
          .required()
          .default(DefaultValue::Today),
        FieldSpec::new(
          "department",
          "Department",
          FieldKind::Select(OptionSource::Lookup(ResourceKind::Departments)),
        ),
        FieldSpec::new(
          "payment_mode",
          "Payment Mode",
          FieldKind::Select(OptionSource::Fixed(PAYMENT_MODES)),
        )
        .default(DefaultValue::Literal("CASH")),
        FieldSpec::new("reference_id", "Reference", FieldKind::Text),
        FieldSpec::new("description", "Description", FieldKind::Text),
      ],
      derivations: Vec::new(),
    }
  }

  fn form_values(record: &IncomeRecord) -> Vec<(&'static str, String)> {
    let id = |v: Option<u64>| v.map(|v| v.to_string()).unwrap_or_default();
    vec![
      ("income_source", id(record.income_source)),
      ("amount", record.amount.to_string()),
      ("date", record.date.clone().unwrap_or_default()),
      ("department", id(record.department)),
      ("payment_mode", record.payment_mode.clone()),
      ("reference_id", record.reference_id.clone().unwrap_or_default()),
      ("description", record.description.clone().unwrap_or_default()),
    ]
  }

  fn amount(record: &IncomeRecord) -> Option<Decimal> {
    Some(record.amount)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_payment_mode_reads_cash() {
    let record = IncomeRecord {
      source_name: "Tuition Fees".into(),
      amount: Decimal::new(250000, 2),
      ..Default::default()
    };
    let cells = Incomes::cells(&record, &Formatter::default());
    assert_eq!(cells[1].text, "₹2,500.00");
    assert_eq!(cells[2].text, "N/A");
    assert_eq!(cells[3].text, "General");
    assert_eq!(cells[4], Cell::toned("Cash", Tone::Info));
  }

  #[test]
  fn test_payment_mode_label() {
    assert_eq!(mode_label("BANK"), "Bank Transfer");
    assert_eq!(mode_label("CRYPTO"), "CRYPTO");
  }
}
