//! Form schema and editable form state for create/edit overlays.
//!
//! A [`FormSchema`] describes the fields of one resource form. [`FormState`]
//! holds the typed-in values, runs derivations whenever one of their inputs
//! changes, validates before submission and builds the JSON payload.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::api::ResourceKind;
use crate::derived::{financial_year, MAX_AMOUNT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
  pub value: String,
  pub label: String,
  /// Value copied into the field's prefill target when selected
  pub extra: Option<String>,
}

impl SelectOption {
  pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      value: value.into(),
      label: label.into(),
      extra: None,
    }
  }

  pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
    self.extra = Some(extra.into());
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
  /// Options come from a lookup collection loaded by the controller
  Lookup(ResourceKind),
  /// `(value, label)` pairs known up front
  Fixed(&'static [(&'static str, &'static str)]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  Amount,
  Date,
  Number { min: i64, max: i64 },
  Select(OptionSource),
  Toggle,
  /// Read-only, written by a derivation
  Computed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
  Empty,
  Literal(&'static str),
  Today,
  CurrentMonth,
  CurrentYear,
  /// `"YY-YY"`, e.g. `"26-27"` during 2026
  FinancialYear,
  FirstOption,
}

impl DefaultValue {
  fn resolve(self, today: NaiveDate) -> String {
    match self {
      DefaultValue::Empty | DefaultValue::FirstOption => String::new(),
      DefaultValue::Literal(s) => s.to_string(),
      DefaultValue::Today => today.format("%Y-%m-%d").to_string(),
      DefaultValue::CurrentMonth => today.month().to_string(),
      DefaultValue::CurrentYear => today.year().to_string(),
      DefaultValue::FinancialYear => financial_year(today),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
  pub name: &'static str,
  pub label: &'static str,
  pub kind: FieldKind,
  pub required: bool,
  pub default: DefaultValue,
  /// Field overwritten with the selected option's `extra` value
  pub prefills: Option<&'static str>,
}

impl FieldSpec {
  pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
    Self {
      name,
      label,
      kind,
      required: false,
      default: DefaultValue::Empty,
      prefills: None,
    }
  }

  pub const fn required(mut self) -> Self {
    self.required = true;
    self
  }

  pub const fn default(mut self, default: DefaultValue) -> Self {
    self.default = default;
    self
  }

  pub const fn prefills(mut self, target: &'static str) -> Self {
    self.prefills = Some(target);
    self
  }

  pub fn is_computed(&self) -> bool {
    self.kind == FieldKind::Computed
  }
}

/// Recomputes `target` whenever any of `inputs` changes. `compute` receives
/// the input values in declaration order.
#[derive(Clone, Copy)]
pub struct Derivation {
  pub target: &'static str,
  pub inputs: &'static [&'static str],
  pub compute: fn(&[&str]) -> String,
}

impl std::fmt::Debug for Derivation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Derivation")
      .field("target", &self.target)
      .field("inputs", &self.inputs)
      .finish_non_exhaustive()
  }
}

#[derive(Debug, Clone)]
pub struct FormSchema {
  pub title: &'static str,
  pub fields: Vec<FieldSpec>,
  pub derivations: Vec<Derivation>,
}

impl FormSchema {
  pub fn field(&self, name: &str) -> Option<&FieldSpec> {
    self.fields.iter().find(|f| f.name == name)
  }
}

#[derive(Debug, Clone)]
pub struct FormState {
  schema: FormSchema,
  today: NaiveDate,
  values: HashMap<&'static str, String>,
  options: HashMap<&'static str, Vec<SelectOption>>,
  errors: BTreeMap<&'static str, String>,
  focus: usize,
  editing: Option<u64>,
}

impl FormState {
  /// Fresh form with every field at its default.
  pub fn new(schema: FormSchema, today: NaiveDate) -> Self {
    let mut state = Self {
      schema,
      today,
      values: HashMap::new(),
      options: HashMap::new(),
      errors: BTreeMap::new(),
      focus: 0,
      editing: None,
    };
    state.apply_defaults();
    state.focus = state.first_editable();
    state
  }

  /// Form for editing record `id`, seeded with its current values.
  pub fn for_edit(
    schema: FormSchema,
    today: NaiveDate,
    id: u64,
    seed: Vec<(&'static str, String)>,
  ) -> Self {
    let mut state = Self::new(schema, today);
    state.editing = Some(id);
    for (name, value) in seed {
      if state.schema.field(name).is_some() {
        state.values.insert(name, value);
      }
    }
    state.run_all_derivations();
    state
  }

  pub fn schema(&self) -> &FormSchema {
    &self.schema
  }

  pub fn title(&self) -> &'static str {
    self.schema.title
  }

  pub fn editing(&self) -> Option<u64> {
    self.editing
  }

  /// Back to defaults, keeping loaded options.
  pub fn reset(&mut self) {
    self.values.clear();
    self.errors.clear();
    self.editing = None;
    self.apply_defaults();
    self.focus = self.first_editable();
  }

  fn apply_defaults(&mut self) {
    for field in &self.schema.fields {
      let value = match (field.default, field.kind) {
        (DefaultValue::FirstOption, FieldKind::Select(source)) => self
          .options_for(field.name, source)
          .first()
          .map(|o| o.value.clone())
          .unwrap_or_default(),
        (default, _) => default.resolve(self.today),
      };
      self.values.insert(field.name, value);
    }
    self.run_all_derivations();
  }

  fn options_for(&self, name: &str, source: OptionSource) -> Vec<SelectOption> {
    match source {
      OptionSource::Fixed(pairs) => pairs
        .iter()
        .map(|(value, label)| SelectOption::new(*value, *label))
        .collect(),
      OptionSource::Lookup(_) => self.options.get(name).cloned().unwrap_or_default(),
    }
  }

  /// Options currently selectable for `name`.
  pub fn options(&self, name: &str) -> Vec<SelectOption> {
    match self.schema.field(name).map(|f| f.kind) {
      Some(FieldKind::Select(source)) => self.options_for(name, source),
      _ => Vec::new(),
    }
  }

  /// Install lookup options for a select. A `FirstOption` field that is
  /// still empty picks the first one.
  pub fn set_options(&mut self, name: &'static str, options: Vec<SelectOption>) {
    let Some(field) = self.schema.field(name).cloned() else {
      return;
    };
    let first = options.first().map(|o| o.value.clone());
    self.options.insert(name, options);
    if field.default == DefaultValue::FirstOption && self.value(name).is_empty() {
      if let Some(first) = first {
        self.set_value(name, first);
      }
    }
  }

  pub fn value(&self, name: &str) -> &str {
    self.values.get(name).map(String::as_str).unwrap_or("")
  }

  /// What to show for `name`: the option label for selects, the raw value
  /// otherwise.
  pub fn display_value(&self, name: &str) -> String {
    let value = self.value(name);
    if let Some(FieldKind::Select(_)) = self.schema.field(name).map(|f| f.kind) {
      if let Some(option) = self.options(name).into_iter().find(|o| o.value == value) {
        return option.label;
      }
    }
    value.to_string()
  }

  /// Set a field and synchronously re-run every derivation watching it.
  /// Computed fields refuse direct writes; returns `false` when refused.
  pub fn set_value(&mut self, name: &str, value: impl Into<String>) -> bool {
    let Some(field) = self.schema.field(name).cloned() else {
      return false;
    };
    if field.is_computed() {
      return false;
    }
    let value = value.into();

    let prefill = match (field.kind, field.prefills) {
      (FieldKind::Select(_), Some(target)) => self
        .options(name)
        .into_iter()
        .find(|o| o.value == value)
        .and_then(|o| o.extra)
        .map(|extra| (target, extra)),
      _ => None,
    };

    self.values.insert(field.name, value);
    self.errors.remove(field.name);
    self.run_derivations_for(field.name);

    if let Some((target, extra)) = prefill {
      self.set_value(target, extra);
    }
    true
  }

  fn run_derivations_for(&mut self, changed: &str) {
    let derivations: Vec<Derivation> = self
      .schema
      .derivations
      .iter()
      .filter(|d| d.inputs.iter().any(|input| *input == changed))
      .copied()
      .collect();
    for derivation in derivations {
      self.run_derivation(&derivation);
    }
  }

  fn run_all_derivations(&mut self) {
    let derivations = self.schema.derivations.clone();
    for derivation in &derivations {
      self.run_derivation(derivation);
    }
  }

  fn run_derivation(&mut self, derivation: &Derivation) {
    let inputs: Vec<&str> = derivation.inputs.iter().map(|n| self.value(n)).collect();
    let computed = (derivation.compute)(&inputs);
    self.values.insert(derivation.target, computed);
  }

  // ==========================================================================
  // Focus and keyboard editing
  // ==========================================================================

  fn editable(&self, index: usize) -> bool {
    self
      .schema
      .fields
      .get(index)
      .map(|f| !f.is_computed())
      .unwrap_or(false)
  }

  fn first_editable(&self) -> usize {
    (0..self.schema.fields.len())
      .find(|i| self.editable(*i))
      .unwrap_or(0)
  }

  pub fn focus_index(&self) -> usize {
    self.focus
  }

  pub fn focused(&self) -> Option<&FieldSpec> {
    self.schema.fields.get(self.focus)
  }

  pub fn focus_next(&mut self) {
    self.step_focus(1);
  }

  pub fn focus_prev(&mut self) {
    self.step_focus(-1);
  }

  fn step_focus(&mut self, delta: isize) {
    let len = self.schema.fields.len() as isize;
    if len == 0 {
      return;
    }
    let mut index = self.focus as isize;
    for _ in 0..len {
      index = (index + delta).rem_euclid(len);
      if self.editable(index as usize) {
        self.focus = index as usize;
        return;
      }
    }
  }

  /// Type a character into the focused text-like field.
  pub fn push_char(&mut self, c: char) {
    let Some(field) = self.focused().cloned() else {
      return;
    };
    if matches!(
      field.kind,
      FieldKind::Select(_) | FieldKind::Toggle | FieldKind::Computed
    ) {
      return;
    }
    let mut value = self.value(field.name).to_string();
    value.push(c);
    self.set_value(field.name, value);
  }

  pub fn pop_char(&mut self) {
    let Some(field) = self.focused().cloned() else {
      return;
    };
    if matches!(field.kind, FieldKind::Select(_) | FieldKind::Toggle) {
      return;
    }
    let mut value = self.value(field.name).to_string();
    value.pop();
    self.set_value(field.name, value);
  }

  /// Move the focused select to the next/previous option, or flip a toggle.
  pub fn cycle(&mut self, delta: isize) {
    let Some(field) = self.focused().cloned() else {
      return;
    };
    match field.kind {
      FieldKind::Select(_) => {
        let options = self.options(field.name);
        if options.is_empty() {
          return;
        }
        let len = options.len() as isize;
        let current = options
          .iter()
          .position(|o| o.value == self.value(field.name));
        let next = match current {
          Some(i) => (i as isize + delta).rem_euclid(len),
          None if delta >= 0 => 0,
          None => len - 1,
        };
        self.set_value(field.name, options[next as usize].value.clone());
      }
      FieldKind::Toggle => self.toggle(field.name),
      _ => {}
    }
  }

  pub fn toggle(&mut self, name: &str) {
    let flipped = if self.value(name) == "true" {
      "false"
    } else {
      "true"
    };
    self.set_value(name, flipped);
  }

  // ==========================================================================
  // Validation and payload
  // ==========================================================================

  pub fn errors(&self) -> &BTreeMap<&'static str, String> {
    &self.errors
  }

  pub fn error(&self, name: &str) -> Option<&str> {
    self.errors.get(name).map(String::as_str)
  }

  /// Check every field, storing messages per field. Returns `true` when the
  /// form may be submitted.
  pub fn validate(&mut self) -> bool {
    let mut errors = BTreeMap::new();
    for field in &self.schema.fields {
      if let Some(message) = self.check(field) {
        errors.insert(field.name, message);
      }
    }
    self.errors = errors;
    self.errors.is_empty()
  }

  fn check(&self, field: &FieldSpec) -> Option<String> {
    let raw = self.value(field.name).trim();
    if raw.is_empty() {
      return field
        .required
        .then(|| format!("{} is required", field.label));
    }
    match field.kind {
      FieldKind::Amount => match raw.parse::<Decimal>() {
        Ok(v) if v.is_sign_negative() && !v.is_zero() => {
          Some(format!("{} must not be negative", field.label))
        }
        Ok(v) if v > MAX_AMOUNT => Some(format!("{} is too large", field.label)),
        Ok(_) => None,
        Err(_) => Some(format!("{} must be a number", field.label)),
      },
      FieldKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .err()
        .map(|_| format!("{} must be a date (YYYY-MM-DD)", field.label)),
      FieldKind::Number { min, max } => match raw.parse::<i64>() {
        Ok(v) if (min..=max).contains(&v) => None,
        Ok(_) => Some(format!("{} must be between {} and {}", field.label, min, max)),
        Err(_) => Some(format!("{} must be a whole number", field.label)),
      },
      FieldKind::Select(_) => {
        let known = self.options(field.name).iter().any(|o| o.value == raw);
        (!known).then(|| format!("{} has an unknown value", field.label))
      }
      FieldKind::Text | FieldKind::Toggle | FieldKind::Computed => None,
    }
  }

  /// JSON body for create/update. Amounts are decimal strings, ids and
  /// numbers are JSON numbers, empty optional fields are `null`.
  pub fn to_payload(&self) -> Value {
    let mut body = Map::new();
    for field in &self.schema.fields {
      let raw = self.value(field.name).trim();
      let value = match field.kind {
        FieldKind::Toggle => Value::Bool(raw == "true"),
        _ if raw.is_empty() => Value::Null,
        FieldKind::Amount | FieldKind::Computed => raw
          .parse::<Decimal>()
          .map(|d| Value::String(d.to_string()))
          .unwrap_or(Value::Null),
        FieldKind::Number { .. } => raw
          .parse::<i64>()
          .map(Value::from)
          .unwrap_or(Value::Null),
        FieldKind::Select(_) => raw
          .parse::<u64>()
          .map(Value::from)
          .unwrap_or_else(|_| Value::String(raw.to_string())),
        FieldKind::Text | FieldKind::Date => Value::String(raw.to_string()),
      };
      body.insert(field.name.to_string(), value);
    }
    Value::Object(body)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::derived::{net_pay, parse_amount};
  use serde_json::json;

  const MODES: &[(&str, &str)] = &[("CASH", "Cash"), ("UPI", "UPI")];

  fn net(inputs: &[&str]) -> String {
    let mut value = net_pay(
      parse_amount(inputs[0]),
      parse_amount(inputs[1]),
      parse_amount(inputs[2]),
    );
    value.rescale(2);
    value.to_string()
  }

  fn payroll_schema() -> FormSchema {
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
        FieldSpec::new("month", "Month", FieldKind::Number { min: 1, max: 12 })
          .default(DefaultValue::CurrentMonth),
        FieldSpec::new("base_amount", "Base Amount", FieldKind::Amount).required(),
        FieldSpec::new("allowances", "Allowances", FieldKind::Amount)
          .default(DefaultValue::Literal("0")),
        FieldSpec::new("deductions", "Deductions", FieldKind::Amount)
          .default(DefaultValue::Literal("0")),
        FieldSpec::new("net_amount", "Net Payable", FieldKind::Computed),
        FieldSpec::new("payment_mode", "Mode", FieldKind::Select(OptionSource::Fixed(MODES)))
          .default(DefaultValue::FirstOption),
        FieldSpec::new("notes", "Notes", FieldKind::Text),
      ],
      derivations: vec![Derivation {
        target: "net_amount",
        inputs: &["base_amount", "allowances", "deductions"],
        compute: net,
      }],
    }
  }

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
  }

  #[test]
  fn test_defaults() {
    let form = FormState::new(payroll_schema(), today());
    assert_eq!(form.value("month"), "3");
    assert_eq!(form.value("allowances"), "0");
    assert_eq!(form.value("net_amount"), "0.00");
    assert_eq!(form.value("payment_mode"), "CASH");
    assert_eq!(form.focused().map(|f| f.name), Some("employee"));
  }

  #[test]
  fn test_default_value_rules() {
    assert_eq!(DefaultValue::Today.resolve(today()), "2026-03-15");
    assert_eq!(DefaultValue::CurrentYear.resolve(today()), "2026");
    assert_eq!(DefaultValue::FinancialYear.resolve(today()), "26-27");
    let eve = NaiveDate::from_ymd_opt(2099, 1, 1).unwrap();
    assert_eq!(DefaultValue::FinancialYear.resolve(eve), "99-00");
  }

  #[test]
  fn test_net_pay_follows_every_input_change() {
    let mut form = FormState::new(payroll_schema(), today());
    form.set_value("base_amount", "30000");
    assert_eq!(form.value("net_amount"), "30000.00");
    form.set_value("allowances", "2500.50");
    assert_eq!(form.value("net_amount"), "32500.50");
    form.set_value("deductions", "1200.25");
    assert_eq!(form.value("net_amount"), "31300.25");
    form.set_value("deductions", "oops");
    assert_eq!(form.value("net_amount"), "32500.50");
  }

  #[test]
  fn test_oversized_amount_does_not_break_net_pay() {
    let mut form = FormState::new(payroll_schema(), today());
    form.set_value("allowances", "1");
    form.set_value("base_amount", "79228162514264337593543950335");
    assert_eq!(form.value("net_amount"), "0.00");
    assert!(!form.validate());
    assert_eq!(form.error("base_amount"), Some("Base Amount is too large"));

    form.set_value("base_amount", "9999999999999.99");
    form.validate();
    assert_eq!(form.error("base_amount"), None);
  }

  #[test]
  fn test_computed_field_refuses_writes() {
    let mut form = FormState::new(payroll_schema(), today());
    form.set_value("base_amount", "100");
    assert!(!form.set_value("net_amount", "999999"));
    assert_eq!(form.value("net_amount"), "100.00");
  }

  #[test]
  fn test_focus_skips_computed() {
    let mut form = FormState::new(payroll_schema(), today());
    for _ in 0..5 {
      form.focus_next();
      assert_ne!(form.focused().map(|f| f.name), Some("net_amount"));
    }
  }

  #[test]
  fn test_selecting_employee_prefills_base() {
    let mut form = FormState::new(payroll_schema(), today());
    form.set_options(
      "employee",
      vec![SelectOption::new("4", "Asha Rao (E-004)").with_extra("42000.00")],
    );
    form.set_value("employee", "4");
    assert_eq!(form.value("base_amount"), "42000.00");
    assert_eq!(form.value("net_amount"), "42000.00");
    assert_eq!(form.display_value("employee"), "Asha Rao (E-004)");
  }

  #[test]
  fn test_validation_messages() {
    let mut form = FormState::new(payroll_schema(), today());
    form.set_value("month", "13");
    form.set_value("allowances", "-5");
    assert!(!form.validate());
    assert_eq!(form.error("employee"), Some("Employee is required"));
    assert_eq!(form.error("base_amount"), Some("Base Amount is required"));
    assert_eq!(form.error("month"), Some("Month must be between 1 and 12"));
    assert_eq!(form.error("allowances"), Some("Allowances must not be negative"));

    // Editing a field clears its error
    form.set_value("month", "12");
    assert_eq!(form.error("month"), None);
  }

  #[test]
  fn test_unknown_select_value_is_rejected() {
    let mut form = FormState::new(payroll_schema(), today());
    form.set_value("employee", "77");
    form.set_value("base_amount", "10");
    assert!(!form.validate());
    assert_eq!(form.error("employee"), Some("Employee has an unknown value"));
  }

  #[test]
  fn test_payload_types() {
    let mut form = FormState::new(payroll_schema(), today());
    form.set_options("employee", vec![SelectOption::new("4", "Asha").with_extra("100")]);
    form.set_value("employee", "4");
    assert!(form.validate());

    assert_eq!(
      form.to_payload(),
      json!({
        "employee": 4,
        "month": 3,
        "base_amount": "100",
        "allowances": "0",
        "deductions": "0",
        "net_amount": "100.00",
        "payment_mode": "CASH",
        "notes": null
      })
    );
  }

  #[test]
  fn test_cycle_and_reset() {
    let mut form = FormState::new(payroll_schema(), today());
    while form.focused().map(|f| f.name) != Some("payment_mode") {
      form.focus_next();
    }
    form.cycle(1);
    assert_eq!(form.value("payment_mode"), "UPI");
    form.cycle(1);
    assert_eq!(form.value("payment_mode"), "CASH");

    form.set_value("notes", "March run");
    form.reset();
    assert_eq!(form.value("notes"), "");
    assert_eq!(form.value("payment_mode"), "CASH");
  }

  #[test]
  fn test_edit_seeding() {
    let form = FormState::for_edit(
      payroll_schema(),
      today(),
      9,
      vec![("base_amount", "5000".into()), ("deductions", "250".into())],
    );
    assert_eq!(form.editing(), Some(9));
    assert_eq!(form.value("net_amount"), "4750.00");
  }
}
