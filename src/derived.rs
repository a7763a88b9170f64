//! Display values computed from raw records. Nothing here is persisted or
//! sent back to the server.

use chrono::{DateTime, Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use crate::api::types::{BudgetStatus, ExpenseStatus, SalaryStatus};

/// How the integer part of an amount is split into groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
  /// 12,34,567.00
  #[default]
  Indian,
  /// 1,234,567.00
  Western,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatter {
  symbol: String,
  grouping: Grouping,
}

impl Default for Formatter {
  fn default() -> Self {
    Self::new("₹", Grouping::Indian)
  }
}

impl Formatter {
  pub fn new(symbol: impl Into<String>, grouping: Grouping) -> Self {
    Self {
      symbol: symbol.into(),
      grouping,
    }
  }

  /// Symbol-prefixed amount with exactly two decimals. A missing amount
  /// formats as zero.
  pub fn currency(&self, amount: Option<Decimal>) -> String {
    let mut value = amount
      .unwrap_or(Decimal::ZERO)
      .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(2);

    let negative = value.is_sign_negative() && !value.is_zero();
    let digits = value.abs().to_string();
    let (whole, frac) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
    let sign = if negative { "-" } else { "" };
    format!(
      "{}{}{}.{}",
      sign,
      self.symbol,
      group_digits(whole, self.grouping),
      frac
    )
  }

  pub fn amount(&self, amount: Decimal) -> String {
    self.currency(Some(amount))
  }
}

fn group_digits(whole: &str, grouping: Grouping) -> String {
  if whole.len() <= 3 {
    return whole.to_string();
  }
  let (head, tail) = whole.split_at(whole.len() - 3);
  let step = match grouping {
    Grouping::Indian => 2,
    Grouping::Western => 3,
  };

  let mut groups: Vec<&str> = Vec::new();
  let mut end = head.len();
  while end > 0 {
    let start = end.saturating_sub(step);
    groups.push(&head[start..end]);
    end = start;
  }
  groups.reverse();
  format!("{},{}", groups.join(","), tail)
}

/// `2024-03-01` or an RFC 3339 timestamp → `01 Mar 2024`; anything else → `N/A`.
pub fn format_date(value: Option<&str>) -> String {
  value
    .and_then(parse_date_like)
    .map(|d| d.format("%d %b %Y").to_string())
    .unwrap_or_else(|| "N/A".to_string())
}

/// Short financial year label starting in `today`'s year, `"26-27"` during 2026.
pub fn financial_year(today: NaiveDate) -> String {
  let yy = today.year().rem_euclid(100);
  format!("{:02}-{:02}", yy, (yy + 1) % 100)
}

fn parse_date_like(value: &str) -> Option<NaiveDate> {
  let value = value.trim();
  NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .ok()
    .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
  Healthy,
  Warning,
  Critical,
}

impl Tier {
  fn of(percent: Decimal) -> Self {
    if percent > Decimal::from(90) {
      Tier::Critical
    } else if percent > Decimal::from(70) {
      Tier::Warning
    } else {
      Tier::Healthy
    }
  }
}

/// Budget consumption. `percent` is never clamped above, so an overspent
/// budget reads truthfully; `bar_width` stays within the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utilization {
  pub percent: Decimal,
  pub bar_width: Decimal,
  pub tier: Tier,
}

impl Utilization {
  /// `45.5%`
  pub fn label(&self) -> String {
    let mut rounded = self
      .percent
      .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(1);
    format!("{}%", rounded)
  }

  /// Bar fill in `0.0..=1.0`.
  pub fn ratio(&self) -> f64 {
    (self.bar_width / Decimal::ONE_HUNDRED)
      .to_f64()
      .unwrap_or(0.0)
  }
}

/// An overflowing ratio reads as `Decimal::MAX` percent, or zero when the
/// spend is negative.
pub fn utilization(spent: Decimal, allocated: Decimal) -> Utilization {
  let percent = if allocated <= Decimal::ZERO {
    Decimal::ZERO
  } else {
    spent
      .checked_div(allocated)
      .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
      .unwrap_or(if spent.is_sign_negative() {
        Decimal::ZERO
      } else {
        Decimal::MAX
      })
      .max(Decimal::ZERO)
  };
  Utilization {
    percent,
    bar_width: percent.min(Decimal::ONE_HUNDRED),
    tier: Tier::of(percent),
  }
}

/// Largest amount the server stores: 15 digits, two of them decimals.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, 2);

/// `base + allowances - deductions`, to two decimals. Zero if the sum
/// overflows.
pub fn net_pay(base: Decimal, allowances: Decimal, deductions: Decimal) -> Decimal {
  base
    .checked_add(allowances)
    .and_then(|gross| gross.checked_sub(deductions))
    .unwrap_or(Decimal::ZERO)
    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Lenient parse of a typed amount; blanks and garbage read as zero.
pub fn parse_amount(input: &str) -> Decimal {
  input.trim().replace(',', "").parse().unwrap_or(Decimal::ZERO)
}

/// Sum of row amounts, saturating at the `Decimal` bounds.
pub fn total<I: IntoIterator<Item = Decimal>>(amounts: I) -> Decimal {
  amounts
    .into_iter()
    .fold(Decimal::ZERO, |sum, amount| sum.saturating_add(amount))
}

/// Badge colouring for a status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
  Success,
  Info,
  Warning,
  Danger,
  Neutral,
}

pub fn expense_tone(status: ExpenseStatus) -> Tone {
  match status {
    ExpenseStatus::Paid => Tone::Success,
    ExpenseStatus::Approved => Tone::Info,
    ExpenseStatus::Pending => Tone::Warning,
    ExpenseStatus::Rejected => Tone::Danger,
    ExpenseStatus::Other => Tone::Neutral,
  }
}

pub fn budget_tone(status: BudgetStatus) -> Tone {
  match status {
    BudgetStatus::Locked => Tone::Neutral,
    BudgetStatus::Approved => Tone::Success,
    _ => Tone::Warning,
  }
}

pub fn salary_tone(status: SalaryStatus) -> Tone {
  match status {
    SalaryStatus::Paid => Tone::Success,
    _ => Tone::Warning,
  }
}

pub fn active_tone(is_active: bool) -> Tone {
  if is_active {
    Tone::Success
  } else {
    Tone::Neutral
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
  }

  #[test]
  fn test_currency_indian_grouping() {
    let fmt = Formatter::default();
    assert_eq!(fmt.currency(Some(dec("1500.5"))), "₹1,500.50");
    assert_eq!(fmt.currency(Some(dec("1234567"))), "₹12,34,567.00");
    assert_eq!(fmt.currency(Some(dec("999"))), "₹999.00");
    assert_eq!(fmt.currency(Some(dec("-500"))), "-₹500.00");
  }

  #[test]
  fn test_currency_western_grouping() {
    let fmt = Formatter::new("$", Grouping::Western);
    assert_eq!(fmt.currency(Some(dec("1234567.891"))), "$1,234,567.89");
  }

  #[test]
  fn test_currency_missing_is_zero() {
    let fmt = Formatter::default();
    assert_eq!(fmt.currency(None), fmt.currency(Some(Decimal::ZERO)));
    assert_eq!(fmt.currency(None), "₹0.00");
  }

  #[test]
  fn test_currency_rounds_half_away_from_zero() {
    let fmt = Formatter::default();
    assert_eq!(fmt.currency(Some(dec("0.005"))), "₹0.01");
    assert_eq!(fmt.currency(Some(dec("2.675"))), "₹2.68");
  }

  #[test]
  fn test_currency_always_two_decimals() {
    let fmt = Formatter::default();
    for raw in ["0", "1", "10.1", "100000.999", "12345678.5"] {
      let out = fmt.currency(Some(dec(raw)));
      let frac = out.rsplit('.').next().unwrap();
      assert_eq!(frac.len(), 2, "{}", out);
    }
  }

  #[test]
  fn test_financial_year_wraps_century() {
    let d = |y| NaiveDate::from_ymd_opt(y, 6, 1).unwrap();
    assert_eq!(financial_year(d(2026)), "26-27");
    assert_eq!(financial_year(d(2099)), "99-00");
  }

  #[test]
  fn test_format_date() {
    assert_eq!(format_date(Some("2024-03-01")), "01 Mar 2024");
    assert_eq!(format_date(Some("2024-03-01T10:30:00Z")), "01 Mar 2024");
    assert_eq!(format_date(Some("yesterday")), "N/A");
    assert_eq!(format_date(None), "N/A");
  }

  #[test]
  fn test_utilization_tier_boundaries() {
    assert_eq!(utilization(dec("90"), dec("100")).tier, Tier::Warning);
    assert_eq!(utilization(dec("90.01"), dec("100")).tier, Tier::Critical);
    assert_eq!(utilization(dec("70"), dec("100")).tier, Tier::Healthy);
    assert_eq!(utilization(dec("70.01"), dec("100")).tier, Tier::Warning);
  }

  #[test]
  fn test_utilization_overspend_keeps_percent_but_clamps_bar() {
    let u = utilization(dec("150"), dec("100"));
    assert_eq!(u.percent, dec("150"));
    assert_eq!(u.bar_width, dec("100"));
    assert_eq!(u.label(), "150.0%");
    assert_eq!(u.ratio(), 1.0);
    assert_eq!(u.tier, Tier::Critical);
  }

  #[test]
  fn test_utilization_zero_allocation() {
    let u = utilization(dec("10"), Decimal::ZERO);
    assert_eq!(u.percent, Decimal::ZERO);
    assert_eq!(u.label(), "0.0%");
    assert_eq!(u.tier, Tier::Healthy);
  }

  #[test]
  fn test_utilization_label_one_decimal() {
    assert_eq!(utilization(dec("455"), dec("1000")).label(), "45.5%");
    assert_eq!(utilization(dec("1"), dec("3")).label(), "33.3%");
  }

  #[test]
  fn test_utilization_overflow_is_critical() {
    let u = utilization(dec("1000000000000000000000000000"), dec("0.001"));
    assert_eq!(u.percent, Decimal::MAX);
    assert_eq!(u.bar_width, Decimal::ONE_HUNDRED);
    assert_eq!(u.tier, Tier::Critical);

    let u = utilization(-Decimal::MAX, dec("0.001"));
    assert_eq!(u.percent, Decimal::ZERO);
  }

  #[test]
  fn test_net_pay_overflow_is_zero() {
    assert_eq!(net_pay(Decimal::MAX, Decimal::ONE, Decimal::ZERO), Decimal::ZERO);
    assert_eq!(net_pay(Decimal::MIN, Decimal::ZERO, Decimal::ONE), Decimal::ZERO);
  }

  #[test]
  fn test_total_saturates() {
    assert_eq!(total([Decimal::MAX, Decimal::ONE]), Decimal::MAX);
    assert_eq!(total([dec("1.50"), dec("2.25")]), dec("3.75"));
    assert_eq!(total(Vec::new()), Decimal::ZERO);
  }

  #[test]
  fn test_max_amount() {
    assert_eq!(MAX_AMOUNT, dec("9999999999999.99"));
  }

  #[test]
  fn test_net_pay() {
    assert_eq!(net_pay(dec("30000"), dec("2500.50"), dec("1200.25")), dec("31300.25"));
    assert_eq!(net_pay(dec("0"), dec("0"), dec("100")), dec("-100"));
  }

  #[test]
  fn test_parse_amount_lenient() {
    assert_eq!(parse_amount(" 1,500.50 "), dec("1500.50"));
    assert_eq!(parse_amount(""), Decimal::ZERO);
    assert_eq!(parse_amount("abc"), Decimal::ZERO);
  }

  #[test]
  fn test_tones() {
    assert_eq!(expense_tone(ExpenseStatus::Paid), Tone::Success);
    assert_eq!(expense_tone(ExpenseStatus::Rejected), Tone::Danger);
    assert_eq!(budget_tone(BudgetStatus::Locked), Tone::Neutral);
    assert_eq!(budget_tone(BudgetStatus::Draft), Tone::Warning);
    assert_eq!(salary_tone(SalaryStatus::Cancelled), Tone::Warning);
    assert_eq!(active_tone(false), Tone::Neutral);
  }
}
