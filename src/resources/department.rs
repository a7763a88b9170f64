use super::{Cell, Column, Resource, ResourceCopy};
use crate::api::types::Department;
use crate::api::ResourceKind;
use crate::derived::{active_tone, format_date, Formatter};
use crate::form::{DefaultValue, FieldKind, FieldSpec, FormSchema, OptionSource};
use crate::mutation::MutationCopy;

pub struct Departments;

impl Resource for Departments {
  type Record = Department;

  const KIND: ResourceKind = ResourceKind::Departments;
  const TITLE: &'static str = "Departments";
  const NOUN: &'static str = "departments";
  const COPY: ResourceCopy = ResourceCopy {
    create: MutationCopy {
      success: "Department created successfully!",
      failure: "Failed to create department",
    },
    update: MutationCopy {
      success: "Department updated successfully!",
      failure: "Failed to update department",
    },
    delete: Some(MutationCopy {
      success: "Department deleted",
      failure: "Failed to delete department",
    }),
  };

  fn columns() -> Vec<Column> {
    vec![
      Column::new("Department Name", 30),
      Column::new("Code", 12),
      Column::new("HOD", 24),
      Column::new("Status", 14),
      Column::new("Created At", 20),
    ]
  }

  fn cells(record: &Department, _fmt: &Formatter) -> Vec<Cell> {
    let status = if record.is_active { "Active" } else { "Inactive" };
    vec![
      Cell::plain(record.name.clone()),
      Cell::plain(record.code.clone()),
      Cell::plain(
        record
          .head_name
          .clone()
          .unwrap_or_else(|| "Not Assigned".to_string()),
      ),
      Cell::toned(status, active_tone(record.is_active)),
      Cell::plain(format_date(record.created_at.as_deref())),
    ]
  }

  fn search_text(record: &Department) -> String {
    format!(
      "{} {} {}",
      record.name,
      record.code,
      record.head_name.as_deref().unwrap_or("")
    )
  }

  fn form() -> FormSchema {
    FormSchema {
      title: "New Department",
      fields: vec![
        FieldSpec::new("name", "Department Name", FieldKind::Text).required(),
        FieldSpec::new("code", "Code", FieldKind::Text).required(),
        FieldSpec::new(
          "head",
          "Head of Department",
          FieldKind::Select(OptionSource::Lookup(ResourceKind::Users)),
        ),
        FieldSpec::new("description", "Description", FieldKind::Text),
        FieldSpec::new("is_active", "Active", FieldKind::Toggle)
          .default(DefaultValue::Literal("true")),
      ],
      derivations: Vec::new(),
    }
  }

  fn form_values(record: &Department) -> Vec<(&'static str, String)> {
    vec![
      ("name", record.name.clone()),
      ("code", record.code.clone()),
      ("head", record.head.map(|h| h.to_string()).unwrap_or_default()),
      ("description", record.description.clone().unwrap_or_default()),
      ("is_active", record.is_active.to_string()),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::derived::Tone;
  use crate::form::FormState;
  use chrono::NaiveDate;
  use serde_json::json;

  #[test]
  fn test_unassigned_head_is_null_in_payload() {
    let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
    let mut form = FormState::new(Departments::form(), today);
    form.set_value("name", "Science");
    form.set_value("code", "SCI");
    assert!(form.validate());
    assert_eq!(
      form.to_payload(),
      json!({
        "name": "Science",
        "code": "SCI",
        "head": null,
        "description": null,
        "is_active": true
      })
    );
  }

  #[test]
  fn test_inactive_cell() {
    let record = Department {
      name: "Arts".into(),
      is_active: false,
      ..Default::default()
    };
    let cells = Departments::cells(&record, &Formatter::default());
    assert_eq!(cells[2].text, "Not Assigned");
    assert_eq!(cells[3], Cell::toned("Inactive", Tone::Neutral));
  }
}
