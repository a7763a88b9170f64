use chrono::{Datelike, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell as TableCell, Paragraph, Row, Table, TableState};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tokio::sync::oneshot;
use tracing::warn;

use crate::api::api_types::{
  BudgetVsActualReport, DepartmentSummaryReport, IncomeVsExpenseReport, MonthlyExpenseReport,
};
use crate::api::{ListParams, QueryKey, ResourceKind};
use crate::controller::Context;
use crate::derived::financial_year;
use crate::export;
use crate::query::QuerySnapshot;
use crate::ui::ensure_valid_selection;
use crate::ui::view::{Shortcut, View, ViewAction};

type ExportResult = color_eyre::Result<PathBuf>;

fn balance_color(amount: Decimal) -> Color {
  if amount.is_sign_negative() && !amount.is_zero() {
    Color::Red
  } else {
    Color::Green
  }
}

fn panel_block(title: String, fetching: bool) -> Block<'static> {
  let title = if fetching {
    format!(" {} (loading...) ", title)
  } else {
    format!(" {} ", title)
  };
  Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue))
}

/// Table shown under the income/expense summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Panel {
  Departments,
  Budgets,
  Categories,
}

impl Panel {
  fn next(self) -> Self {
    match self {
      Panel::Departments => Panel::Budgets,
      Panel::Budgets => Panel::Categories,
      Panel::Categories => Panel::Departments,
    }
  }
}

/// Year-to-date finance overview with CSV audit export.
pub struct ReportsView {
  from: NaiveDate,
  to: NaiveDate,
  month: u32,
  financial_year: String,
  params: ListParams,
  panel: Panel,
  departments: QuerySnapshot<DepartmentSummaryReport>,
  totals: QuerySnapshot<IncomeVsExpenseReport>,
  budgets: QuerySnapshot<BudgetVsActualReport>,
  monthly: QuerySnapshot<MonthlyExpenseReport>,
  table_state: TableState,
  output_dir: PathBuf,
  export: Option<oneshot::Receiver<ExportResult>>,
}

impl ReportsView {
  /// Reports for the calendar year containing `today`
  pub fn new(today: NaiveDate) -> Self {
    let from = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
    let to = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
    let params = ListParams::new()
      .with("start_date", from.format("%Y-%m-%d").to_string())
      .with("end_date", to.format("%Y-%m-%d").to_string());
    Self {
      from,
      to,
      month: today.month(),
      financial_year: financial_year(today),
      params,
      panel: Panel::Departments,
      departments: QuerySnapshot::default(),
      totals: QuerySnapshot::default(),
      budgets: QuerySnapshot::default(),
      monthly: QuerySnapshot::default(),
      table_state: TableState::default(),
      output_dir: PathBuf::from("."),
      export: None,
    }
  }

  /// Directory the audit CSV is written to
  pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.output_dir = dir.into();
    self
  }

  fn departments_key(&self) -> QueryKey {
    QueryKey::new(ResourceKind::DepartmentSummary, &self.params)
  }

  fn totals_key(&self) -> QueryKey {
    QueryKey::new(ResourceKind::IncomeVsExpense, &self.params)
  }

  fn budgets_key(&self) -> QueryKey {
    let params = ListParams::new().with("financial_year", self.financial_year.clone());
    QueryKey::new(ResourceKind::BudgetVsActual, &params)
  }

  fn monthly_key(&self) -> QueryKey {
    let params = ListParams::new()
      .with("month", self.month.to_string())
      .with("year", self.from.year().to_string());
    QueryKey::new(ResourceKind::MonthlyExpense, &params)
  }

  fn period(&self) -> (String, String) {
    (
      self.from.format("%Y-%m-%d").to_string(),
      self.to.format("%Y-%m-%d").to_string(),
    )
  }

  /// Read the summary and the visible panel's report
  fn load(&mut self, ctx: &mut Context, force: bool) {
    let (start, end) = self.period();

    match self.panel {
      Panel::Departments => {
        let gateway = ctx.gateway.clone();
        let (s, e) = (start.clone(), end.clone());
        let loader = move || async move { gateway.department_summary(&s, &e).await };
        let key = self.departments_key();
        self.departments = if force {
          ctx.cache.refetch(&key, loader)
        } else {
          ctx.cache.fetch(&key, loader)
        };
      }
      Panel::Budgets => {
        let gateway = ctx.gateway.clone();
        let fy = self.financial_year.clone();
        let loader = move || async move { gateway.budget_vs_actual(&fy).await };
        let key = self.budgets_key();
        self.budgets = if force {
          ctx.cache.refetch(&key, loader)
        } else {
          ctx.cache.fetch(&key, loader)
        };
      }
      Panel::Categories => {
        let gateway = ctx.gateway.clone();
        let (month, year) = (self.month, self.from.year());
        let loader = move || async move { gateway.monthly_expense(month, year).await };
        let key = self.monthly_key();
        self.monthly = if force {
          ctx.cache.refetch(&key, loader)
        } else {
          ctx.cache.fetch(&key, loader)
        };
      }
    }

    let gateway = ctx.gateway.clone();
    let loader = move || async move { gateway.income_vs_expense(&start, &end).await };
    let key = self.totals_key();
    self.totals = if force {
      ctx.cache.refetch(&key, loader)
    } else {
      ctx.cache.fetch(&key, loader)
    };
  }

  fn start_export(&mut self, ctx: &Context) {
    if self.export.is_some() {
      return;
    }
    let (tx, rx) = oneshot::channel();
    let gateway = ctx.gateway.clone();
    let (from, to) = (self.from, self.to);
    let output = self.output_dir.join(export::default_file_name(from, to));
    tokio::spawn(async move {
      let result = export::export_audit(&gateway, from, to, &output).await;
      // Receiver is gone if the view was left
      let _ = tx.send(result);
    });
    self.export = Some(rx);
  }

  fn poll_export(&mut self, ctx: &mut Context) {
    let Some(rx) = self.export.as_mut() else {
      return;
    };
    match rx.try_recv() {
      Ok(Ok(path)) => {
        ctx
          .notifications
          .success(format!("Audit report saved to {}", path.display()));
        self.export = None;
      }
      Ok(Err(e)) => {
        warn!(error = %e, "audit export failed");
        ctx.notifications.error(e.to_string());
        self.export = None;
      }
      Err(oneshot::error::TryRecvError::Empty) => {}
      Err(oneshot::error::TryRecvError::Closed) => self.export = None,
    }
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect, ctx: &Context) {
    let block = Block::default()
      .title(format!(" Income vs Expense {} ", self.from.year()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let lines = match (&self.totals.data, &self.totals.error) {
      (Some(report), _) => {
        let s = &report.summary;
        vec![
          Line::from(vec![
            Span::styled("Total income    ", Style::default().fg(Color::DarkGray)),
            Span::styled(ctx.formatter.amount(s.total_income), Style::default().fg(Color::Green)),
          ]),
          Line::from(vec![
            Span::styled("Total expenses  ", Style::default().fg(Color::DarkGray)),
            Span::styled(ctx.formatter.amount(s.total_expenses), Style::default().fg(Color::Red)),
          ]),
          Line::from(vec![
            Span::styled("Balance         ", Style::default().fg(Color::DarkGray)),
            Span::styled(
              ctx.formatter.amount(s.balance),
              Style::default().fg(balance_color(s.balance)).bold(),
            ),
            Span::raw("  "),
            Span::styled(s.status.clone(), Style::default().fg(Color::Yellow)),
          ]),
        ]
      }
      (None, Some(error)) if !self.totals.is_fetching => vec![Line::from(Span::styled(
        format!("{}. Press 'r' to retry.", error.user_message("Failed to load summary")),
        Style::default().fg(Color::Red),
      ))],
      _ => vec![Line::from(Span::styled(
        "Loading...",
        Style::default().fg(Color::DarkGray),
      ))],
    };
    frame.render_widget(Paragraph::new(lines).block(block), area);
  }

  fn render_message(frame: &mut Frame, area: Rect, block: Block, text: String) {
    frame.render_widget(
      Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::DarkGray)),
      area,
    );
  }

  fn render_panel(&mut self, frame: &mut Frame, area: Rect, ctx: &Context) {
    let fmt = &ctx.formatter;
    let (block, rows, header, widths): (Block, Vec<Row>, [&str; 4], [u16; 4]) = match self.panel {
      Panel::Departments => {
        let block = panel_block(
          "Department Summary".to_string(),
          self.departments.is_fetching,
        );
        let Some(report) = self.departments.data.clone() else {
          let text = pending_text(&self.departments, "Failed to load department summary");
          return Self::render_message(frame, area, block, text);
        };
        let rows = report
          .departments
          .iter()
          .map(|d| {
            Row::new(vec![
              TableCell::from(d.department.clone()),
              TableCell::from(fmt.amount(d.income)),
              TableCell::from(fmt.amount(d.expenses)),
              TableCell::from(fmt.amount(d.net)).style(Style::default().fg(balance_color(d.net))),
            ])
          })
          .collect();
        (block, rows, ["Department", "Income", "Expenses", "Net"], [40, 20, 20, 20])
      }
      Panel::Budgets => {
        let block = panel_block(
          format!("Budget vs Actual {}", self.financial_year),
          self.budgets.is_fetching,
        );
        let Some(report) = self.budgets.data.clone() else {
          let text = pending_text(&self.budgets, "Failed to load budget comparison");
          return Self::render_message(frame, area, block, text);
        };
        let rows = report
          .budgets
          .iter()
          .map(|b| {
            Row::new(vec![
              TableCell::from(b.department.clone()),
              TableCell::from(fmt.amount(b.allocated_budget)),
              TableCell::from(fmt.amount(b.actual_spent)),
              TableCell::from(format!("{} {}", fmt.amount(b.variance), b.status))
                .style(Style::default().fg(balance_color(b.variance))),
            ])
          })
          .collect();
        (block, rows, ["Department", "Allocated", "Spent", "Variance"], [30, 20, 20, 30])
      }
      Panel::Categories => {
        let block = panel_block(
          format!("Expenses {}/{} by Category", self.month, self.from.year()),
          self.monthly.is_fetching,
        );
        let Some(report) = self.monthly.data.clone() else {
          let text = pending_text(&self.monthly, "Failed to load monthly expenses");
          return Self::render_message(frame, area, block, text);
        };
        let total = report.total_expenses;
        let rows = report
          .category_breakdown
          .iter()
          .map(|line| {
            let share = if total.is_zero() {
              Some(Decimal::ZERO)
            } else {
              line
                .total
                .checked_div(total)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .map(|share| share.round_dp(1))
            };
            let share = share.map_or_else(|| "n/a".to_string(), |share| format!("{}%", share));
            Row::new(vec![
              TableCell::from(line.category.clone().unwrap_or_else(|| "Uncategorised".into())),
              TableCell::from(line.department.clone().unwrap_or_default()),
              TableCell::from(fmt.amount(line.total)),
              TableCell::from(share),
            ])
          })
          .collect();
        (block, rows, ["Category", "Department", "Total", "Share"], [35, 25, 25, 15])
      }
    };

    if rows.is_empty() {
      return Self::render_message(frame, area, block, "No activity for this period.".into());
    }

    ensure_valid_selection(&mut self.table_state, rows.len());
    let header = Row::new(header).style(Style::default().fg(Color::Yellow).bold());
    let table = Table::new(rows, widths.map(Constraint::Percentage))
      .header(header)
      .block(block)
      .row_highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

/// Loading text, or the failure once the request has settled
fn pending_text<T>(snapshot: &QuerySnapshot<T>, fallback: &str) -> String {
  match &snapshot.error {
    Some(error) if !snapshot.is_fetching => {
      format!("{}. Press 'r' to retry.", error.user_message(fallback))
    }
    _ => "Loading...".to_string(),
  }
}

impl View for ReportsView {
  fn handle_key(&mut self, key: KeyEvent, ctx: &mut Context) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Tab => {
        self.panel = self.panel.next();
        self.table_state.select(None);
        self.load(ctx, false);
      }
      KeyCode::Char('r') => self.load(ctx, true),
      KeyCode::Char('x') => self.start_export(ctx),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &Context) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(5), Constraint::Min(3)])
      .split(area);
    self.render_summary(frame, chunks[0], ctx);
    self.render_panel(frame, chunks[1], ctx);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Reports {}", self.from.year())
  }

  fn tick(&mut self, ctx: &mut Context) {
    self.poll_export(ctx);
    self.load(ctx, false);
  }

  fn leave(&mut self) {
    self.export = None;
  }

  fn is_busy(&self) -> bool {
    self.departments.is_fetching || self.totals.is_fetching || self.export.is_some()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("tab", "next report").with_priority(40),
      Shortcut::new("r", "refresh").with_priority(50),
      Shortcut::new("x", "export csv").with_priority(60),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::transport::fake::FakeTransport;
  use crate::api::transport::Verb;
  use crate::api::Gateway;
  use crate::derived::Formatter;
  use crossterm::event::KeyModifiers;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
  }

  fn context(fake: &FakeTransport) -> Context {
    Context::new(
      Gateway::new(Arc::new(fake.clone())),
      Formatter::default(),
      Duration::from_secs(60),
    )
  }

  async fn step(view: &mut ReportsView, ctx: &mut Context) {
    for _ in 0..5 {
      tokio::time::sleep(Duration::from_millis(1)).await;
    }
    ctx.cache.poll();
    view.tick(ctx);
  }

  fn reports(fake: &FakeTransport) {
    fake.route_json(
      Verb::Get,
      "reports/department-summary/",
      200,
      json!({"departments": [
        {"department": "Science", "income": "50000", "expenses": "62000.50", "net": "-12000.50"}
      ]}),
    );
    fake.route_json(
      Verb::Get,
      "reports/income-vs-expense/",
      200,
      json!({"summary": {
        "total_income": 50000, "total_expenses": "62000.50",
        "balance": "-12000.50", "status": "Deficit"
      }}),
    );
  }

  #[tokio::test(start_paused = true)]
  async fn test_loads_current_year() {
    let fake = FakeTransport::new();
    reports(&fake);
    let mut ctx = context(&fake);
    let mut view = ReportsView::new(today());
    assert_eq!(view.breadcrumb_label(), "Reports 2026");

    view.tick(&mut ctx);
    assert!(view.is_busy());
    step(&mut view, &mut ctx).await;
    assert!(!view.is_busy());

    let totals = view.totals.data.clone().unwrap();
    assert_eq!(totals.summary.status, "Deficit");
    assert_eq!(totals.summary.total_income, Decimal::from(50000));
    let departments = view.departments.data.clone().unwrap();
    assert_eq!(departments.departments[0].department, "Science");

    let call = fake
      .calls()
      .into_iter()
      .find(|c| c.path == "reports/department-summary/")
      .unwrap();
    let params: Vec<(String, String)> = call
      .params
      .pairs()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    assert!(params.contains(&("start_date".into(), "2026-01-01".into())));
    assert!(params.contains(&("end_date".into(), "2026-12-31".into())));

    // Cached: another tick does not refetch, `r` does
    view.tick(&mut ctx);
    assert_eq!(fake.count(Verb::Get, "reports/income-vs-expense/"), 1);
    view.handle_key(key(KeyCode::Char('r')), &mut ctx);
    step(&mut view, &mut ctx).await;
    assert_eq!(fake.count(Verb::Get, "reports/income-vs-expense/"), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_tab_switches_to_budget_comparison() {
    let fake = FakeTransport::new();
    reports(&fake);
    fake.route_json(
      Verb::Get,
      "reports/budget-vs-actual/",
      200,
      json!({"financial_year": "26-27", "budgets": [{
        "department": "Sports", "period": "Annual", "allocated_budget": "10000",
        "actual_spent": "12500", "variance": "-2500", "status": "Over Budget"
      }]}),
    );
    let mut ctx = context(&fake);
    let mut view = ReportsView::new(today());
    view.tick(&mut ctx);
    step(&mut view, &mut ctx).await;
    assert_eq!(fake.count(Verb::Get, "reports/budget-vs-actual/"), 0);

    view.handle_key(key(KeyCode::Tab), &mut ctx);
    step(&mut view, &mut ctx).await;
    let call = fake
      .calls()
      .into_iter()
      .find(|c| c.path == "reports/budget-vs-actual/")
      .unwrap();
    assert_eq!(call.params.canonical(), "financial_year=26-27");
    let report = view.budgets.data.clone().unwrap();
    assert_eq!(report.budgets[0].variance, Decimal::from(-2500));
  }

  #[tokio::test]
  async fn test_export_notifies_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeTransport::new();
    reports(&fake);
    fake.route_json(Verb::Get, "reports/audit-download/", 200, json!("date,amount"));
    let mut ctx = context(&fake);
    let mut view = ReportsView::new(today()).with_output_dir(dir.path());

    view.handle_key(key(KeyCode::Char('x')), &mut ctx);
    assert!(view.is_busy());
    for _ in 0..50 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      view.tick(&mut ctx);
      if view.export.is_none() {
        break;
      }
    }

    let expected = dir.path().join("audit_2026-01-01_2026-12-31.csv");
    assert!(expected.exists());
    let message = ctx.notifications.latest().map(|n| n.message.clone()).unwrap();
    assert!(message.starts_with("Audit report saved to"));
  }

  #[tokio::test]
  async fn test_export_failure_is_reported() {
    let fake = FakeTransport::new();
    reports(&fake);
    fake.route_json(
      Verb::Get,
      "reports/audit-download/",
      403,
      json!({"detail": "You do not have permission to perform this action."}),
    );
    let mut ctx = context(&fake);
    let dir = tempfile::tempdir().unwrap();
    let mut view = ReportsView::new(today()).with_output_dir(dir.path());

    view.handle_key(key(KeyCode::Char('x')), &mut ctx);
    for _ in 0..50 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      view.tick(&mut ctx);
      if view.export.is_none() {
        break;
      }
    }

    assert_eq!(
      ctx.notifications.latest().map(|n| n.message.as_str()),
      Some("You do not have permission to perform this action.")
    );
  }
}
