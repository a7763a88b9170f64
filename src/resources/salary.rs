use rust_decimal::Decimal;

use super::{Cell, Column, Resource, ResourceCopy};
use crate::api::types::SalaryRecord;
use crate::api::ResourceKind;
use crate::derived::{net_pay, parse_amount, salary_tone, Formatter};
use crate::form::{Derivation, DefaultValue, FieldKind, FieldSpec, FormSchema, OptionSource};
use crate::mutation::MutationCopy;

pub struct Salaries;

const MONTHS: &[(&str, &str)] = &[
  ("1", "January"),
  ("2", "February"),
  ("3", "March"),
  ("4", "April"),
  ("5", "May"),
  ("6", "June"),
  ("7", "July"),
  ("8", "August"),
  ("9", "September"),
  ("10", "October"),
  ("11", "November"),
  ("12", "December"),
];

const STATUSES: &[(&str, &str)] = &[("PENDING", "Pending"), ("PAID", "Paid")];

/// Inputs: base, allowances, deductions.
fn net_amount(inputs: &[&str]) -> String {
  let amount = |i: usize| parse_amount(inputs.get(i).copied().unwrap_or(""));
  let mut net = net_pay(amount(0), amount(1), amount(2));
  net.rescale(2);
  net.to_string()
}

impl Resource for Salaries {
  type Record = SalaryRecord;

  const KIND: ResourceKind = ResourceKind::Salaries;
  const TITLE: &'static str = "Payroll Management";
  const NOUN: &'static str = "payroll records";
  const COPY: ResourceCopy = ResourceCopy {
    create: MutationCopy {
      success: "Payroll processed successfully!",
      failure: "Failed to process payroll",
    },
    update: MutationCopy {
      success: "Payroll record updated successfully!",
      failure: "Failed to update payroll record",
    },
    delete: None,
  };

  fn columns() -> Vec<Column> {
    vec![
      Column::new("Employee", 32),
      Column::new("Period", 12),
      Column::new("Base Salary", 20),
      Column::new("Net Payable", 20),
      Column::new("Status", 16),
    ]
  }

  fn cells(record: &SalaryRecord, fmt: &Formatter) -> Vec<Cell> {
    vec![
      Cell::plain(record.employee_name.clone()),
      Cell::plain(format!("{}/{}", record.month, record.year)),
      Cell::plain(fmt.amount(record.base_amount)),
      Cell::plain(fmt.amount(record.net_amount)),
      Cell::toned(record.status.as_str(), salary_tone(record.status)),
    ]
  }

  fn search_text(record: &SalaryRecord) -> String {
    format!(
      "{} {} {}/{}",
      record.employee_name,
      record.department_name.as_deref().unwrap_or(""),
      record.month,
      record.year
    )
  }

  fn form() -> FormSchema {
    FormSchema {
      title: "Process Monthly Salary",
      fields: vec![
        FieldSpec::new(
          "employee",
          "Employee",
          FieldKind::Select(OptionSource::Lookup(ResourceKind::Employees)),
        )
        .required()
        .prefills("base_amount"),
        FieldSpec::new("month", "Month", FieldKind::Select(OptionSource::Fixed(MONTHS)))
          .required()
          .default(DefaultValue::CurrentMonth),
        FieldSpec::new("year", "Year", FieldKind::Number { min: 2000, max: 2100 })
          .required()
          .default(DefaultValue::CurrentYear),
        FieldSpec::new("base_amount", "Base Amount", FieldKind::Amount).required(),
        FieldSpec::new("allowances", "Allowances", FieldKind::Amount)
          .default(DefaultValue::Literal("0")),
        FieldSpec::new("deductions", "Deductions", FieldKind::Amount)
          .default(DefaultValue::Literal("0")),
        FieldSpec::new("net_amount", "Net Payable", FieldKind::Computed),
        FieldSpec::new("status", "Status", FieldKind::Select(OptionSource::Fixed(STATUSES)))
          .default(DefaultValue::Literal("PENDING")),
        FieldSpec::new("notes", "Notes", FieldKind::Text),
      ],
      derivations: vec![Derivation {
        target: "net_amount",
        inputs: &["base_amount", "allowances", "deductions"],
        compute: net_amount,
      }],
    }
  }

  fn form_values(record: &SalaryRecord) -> Vec<(&'static str, String)> {
    vec![
      (
        "employee",
        record.employee.map(|e| e.to_string()).unwrap_or_default(),
      ),
      ("month", record.month.to_string()),
      ("year", record.year.to_string()),
      ("base_amount", record.base_amount.to_string()),
      ("allowances", record.allowances.to_string()),
      ("deductions", record.deductions.to_string()),
      ("status", record.status.as_str().to_string()),
      ("notes", record.notes.clone().unwrap_or_default()),
    ]
  }

  fn amount(record: &SalaryRecord) -> Option<Decimal> {
    Some(record.net_amount)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::form::{FormState, SelectOption};
  use chrono::NaiveDate;
  use serde_json::json;

  #[test]
  fn test_net_amount_derivation() {
    assert_eq!(net_amount(&["30000", "2500.50", "1200.25"]), "31300.25");
    assert_eq!(net_amount(&["", "", ""]), "0.00");
    assert_eq!(net_amount(&["100", "0", "250"]), "-150.00");
  }

  #[test]
  fn test_payroll_form_payload() {
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let mut form = FormState::new(Salaries::form(), today);
    form.set_options(
      "employee",
      vec![SelectOption::new("7", "Ravi Kumar (E-007)").with_extra("28000.00")],
    );
    form.set_value("employee", "7");
    form.set_value("allowances", "1500");
    assert!(form.validate());

    let payload = form.to_payload();
    assert_eq!(payload["employee"], json!(7));
    assert_eq!(payload["month"], json!(10));
    assert_eq!(payload["year"], json!(2026));
    assert_eq!(payload["base_amount"], json!("28000.00"));
    assert_eq!(payload["net_amount"], json!("29500.00"));
    assert_eq!(payload["status"], json!("PENDING"));
  }

  #[test]
  fn test_period_cell() {
    let record = SalaryRecord {
      employee_name: "Ravi Kumar".into(),
      month: 3,
      year: 2026,
      ..Default::default()
    };
    let cells = Salaries::cells(&record, &Formatter::default());
    assert_eq!(cells[1].text, "3/2026");
  }
}
