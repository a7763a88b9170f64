use super::{bar, Cell, Column, Resource, ResourceCopy};
use crate::api::types::{BudgetPlan, BudgetStatus};
use crate::api::ResourceKind;
use crate::derived::{budget_tone, utilization, Formatter, Tier, Tone};
use crate::form::{DefaultValue, FieldKind, FieldSpec, FormSchema, OptionSource};
use crate::mutation::MutationCopy;

pub struct Budgets;

const STATUSES: &[(&str, &str)] = &[
  ("DRAFT", "Draft"),
  ("PENDING", "Pending Approval"),
  ("APPROVED", "Approved"),
];

const BAR_WIDTH: usize = 10;

fn tier_tone(tier: Tier) -> Tone {
  match tier {
    Tier::Healthy => Tone::Success,
    Tier::Warning => Tone::Warning,
    Tier::Critical => Tone::Danger,
  }
}

impl Resource for Budgets {
  type Record = BudgetPlan;

  const KIND: ResourceKind = ResourceKind::Budgets;
  const TITLE: &'static str = "Budget Planning";
  const NOUN: &'static str = "budgets";
  const COPY: ResourceCopy = ResourceCopy {
    create: MutationCopy {
      success: "Budget plan created successfully!",
      failure: "Failed to create budget plan",
    },
    update: MutationCopy {
      success: "Budget plan updated successfully!",
      failure: "Failed to update budget plan",
    },
    delete: Some(MutationCopy {
      success: "Budget deleted",
      failure: "Failed to delete budget",
    }),
  };

  fn columns() -> Vec<Column> {
    vec![
      Column::new("Department", 22),
      Column::new("Financial Year", 12),
      Column::new("Allocated", 16),
      Column::new("Spent", 16),
      Column::new("Utilization", 22),
      Column::new("Status", 12),
    ]
  }

  fn cells(record: &BudgetPlan, fmt: &Formatter) -> Vec<Cell> {
    let usage = utilization(record.spent_amount, record.allocated_amount);
    vec![
      Cell::plain(record.department_name.clone()),
      Cell::plain(record.financial_year.clone()),
      Cell::plain(fmt.amount(record.allocated_amount)),
      Cell::plain(fmt.amount(record.spent_amount)),
      Cell::toned(
        format!("{} {}", bar(usage.ratio(), BAR_WIDTH), usage.label()),
        tier_tone(usage.tier),
      ),
      Cell::toned(record.status.as_str(), budget_tone(record.status)),
    ]
  }

  fn search_text(record: &BudgetPlan) -> String {
    format!(
      "{} {} {}",
      record.department_name,
      record.financial_year,
      record.status.as_str()
    )
  }

  fn form() -> FormSchema {
    FormSchema {
      title: "New Budget Plan",
      fields: vec![
        FieldSpec::new(
          "department",
          "Department",
          FieldKind::Select(OptionSource::Lookup(ResourceKind::Departments)),
        )
        .required(),
        FieldSpec::new("financial_year", "Financial Year", FieldKind::Text)
          .required()
          .default(DefaultValue::FinancialYear),
        FieldSpec::new("allocated_amount", "Allocated Amount", FieldKind::Amount).required(),
        FieldSpec::new("status", "Status", FieldKind::Select(OptionSource::Fixed(STATUSES)))
          .default(DefaultValue::Literal("DRAFT")),
        FieldSpec::new("notes", "Notes", FieldKind::Text),
      ],
      derivations: Vec::new(),
    }
  }

  fn form_values(record: &BudgetPlan) -> Vec<(&'static str, String)> {
    let status = match record.status {
      BudgetStatus::Pending | BudgetStatus::Approved => record.status.as_str(),
      _ => "DRAFT",
    };
    vec![
      (
        "department",
        record.department.map(|d| d.to_string()).unwrap_or_default(),
      ),
      ("financial_year", record.financial_year.clone()),
      ("allocated_amount", record.allocated_amount.to_string()),
      ("status", status.to_string()),
      ("notes", record.notes.clone().unwrap_or_default()),
    ]
  }
}
