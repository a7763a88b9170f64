use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::api_types::{
  normalize_list, BudgetVsActualReport, DepartmentSummaryReport, IncomeVsExpenseReport, ListPage,
  LoginResponse, MonthlyExpenseReport,
};
use super::error::ApiError;
use super::keys::{ListParams, ResourceKind};
use super::transport::{ApiRequest, ApiResponse, HttpTransport, Transport, Verb};
use crate::session::Session;

pub const AUDIT_DOWNLOAD_PATH: &str = "reports/audit-download/";
const LOGIN_PATH: &str = "auth/login/";

/// Typed requests against the finance API. No business logic lives here.
#[derive(Clone)]
pub struct Gateway {
  transport: Arc<dyn Transport>,
}

impl Gateway {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  /// Gateway over HTTP, authenticating with whatever token `session` holds.
  pub fn http(base_url: &str, timeout: Duration, session: Session) -> color_eyre::Result<Self> {
    let transport = HttpTransport::new(base_url, timeout, session)?;
    Ok(Self::new(Arc::new(transport)))
  }

  /// List a collection, unwrapping bare arrays and `results` envelopes alike
  pub async fn list<T: DeserializeOwned>(
    &self,
    kind: ResourceKind,
    params: &ListParams,
  ) -> Result<ListPage<T>, ApiError> {
    let body = self
      .json(ApiRequest::get(kind.path(), params.clone()))
      .await?;
    let page = normalize_list(kind.name(), body);
    debug!(%kind, items = page.len(), total = ?page.total, "listed");
    Ok(page)
  }

  pub async fn create<T: DeserializeOwned>(
    &self,
    kind: ResourceKind,
    payload: &Value,
  ) -> Result<T, ApiError> {
    let body = self
      .json(ApiRequest::send(Verb::Post, kind.path(), Some(payload.clone())))
      .await?;
    decode(body)
  }

  pub async fn update<T: DeserializeOwned>(
    &self,
    kind: ResourceKind,
    id: u64,
    payload: &Value,
  ) -> Result<T, ApiError> {
    let body = self
      .json(ApiRequest::send(
        Verb::Patch,
        kind.detail_path(id),
        Some(payload.clone()),
      ))
      .await?;
    decode(body)
  }

  pub async fn delete(&self, kind: ResourceKind, id: u64) -> Result<(), ApiError> {
    self
      .exchange(ApiRequest::send(Verb::Delete, kind.detail_path(id), None))
      .await?;
    Ok(())
  }

  /// POST to a record's action endpoint, e.g. `finance/expenses/7/approve/`
  pub async fn action<T: DeserializeOwned>(
    &self,
    kind: ResourceKind,
    id: u64,
    name: &str,
  ) -> Result<T, ApiError> {
    let path = format!("{}{}/", kind.detail_path(id), name);
    let body = self
      .json(ApiRequest::send(Verb::Post, path, Some(json!({}))))
      .await?;
    decode(body)
  }

  /// Fetch an opaque binary payload such as the CSV audit export.
  pub async fn download(&self, path: &str, params: &ListParams) -> Result<Vec<u8>, ApiError> {
    let response = self
      .exchange(ApiRequest::get(path, params.clone()))
      .await?;
    Ok(response.body)
  }

  pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
    let body = self
      .json(ApiRequest::send(
        Verb::Post,
        LOGIN_PATH,
        Some(json!({ "email": email, "password": password })),
      ))
      .await?;
    decode(body)
  }

  pub async fn department_summary(
    &self,
    start: &str,
    end: &str,
  ) -> Result<DepartmentSummaryReport, ApiError> {
    self
      .report(ResourceKind::DepartmentSummary.path(), period(start, end))
      .await
  }

  pub async fn income_vs_expense(
    &self,
    start: &str,
    end: &str,
  ) -> Result<IncomeVsExpenseReport, ApiError> {
    self
      .report(ResourceKind::IncomeVsExpense.path(), period(start, end))
      .await
  }

  pub async fn monthly_expense(
    &self,
    month: u32,
    year: i32,
  ) -> Result<MonthlyExpenseReport, ApiError> {
    let params = ListParams::new()
      .with("month", month.to_string())
      .with("year", year.to_string());
    self.report(ResourceKind::MonthlyExpense.path(), params).await
  }

  pub async fn budget_vs_actual(
    &self,
    financial_year: &str,
  ) -> Result<BudgetVsActualReport, ApiError> {
    let params = ListParams::new().with("financial_year", financial_year);
    self.report(ResourceKind::BudgetVsActual.path(), params).await
  }

  async fn report<T: DeserializeOwned>(
    &self,
    path: &str,
    params: ListParams,
  ) -> Result<T, ApiError> {
    let body = self.json(ApiRequest::get(path, params)).await?;
    decode(body)
  }

  /// Send a request and map non-2xx statuses to `ApiError`.
  async fn exchange(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
    let response = self.transport.request(request).await?;
    if response.is_success() {
      Ok(response)
    } else {
      Err(ApiError::from_status(response.status, &response.body))
    }
  }

  async fn json(&self, request: ApiRequest) -> Result<Value, ApiError> {
    let response = self.exchange(request).await?;
    // 204 No Content and friends
    if response.body.iter().all(u8::is_ascii_whitespace) {
      return Ok(Value::Null);
    }
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Malformed(e.to_string()))
  }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
  serde_json::from_value(body).map_err(|e| ApiError::Malformed(e.to_string()))
}

fn period(start: &str, end: &str) -> ListParams {
  ListParams::new()
    .with("start_date", start)
    .with("end_date", end)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::transport::fake::FakeTransport;
  use crate::api::types::{Department, ExpenseRecord, ExpenseStatus};

  fn gateway(fake: &FakeTransport) -> Gateway {
    Gateway::new(Arc::new(fake.clone()))
  }

  #[tokio::test]
  async fn test_list_bare_array_and_envelope() {
    let fake = FakeTransport::new();
    fake
      .respond_json(200, json!([{"id": 1, "name": "Science"}, {"id": 2, "name": "Arts"}]))
      .respond_json(200, json!({"count": 9, "results": [{"id": 3, "name": "Sports"}]}));
    let gw = gateway(&fake);

    let bare: ListPage<Department> = gw
      .list(ResourceKind::Departments, &ListParams::new())
      .await
      .unwrap();
    assert_eq!(bare.len(), 2);

    let paged: ListPage<Department> = gw
      .list(ResourceKind::Departments, &ListParams::new())
      .await
      .unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged.total, Some(9));
  }

  #[tokio::test]
  async fn test_list_sends_params() {
    let fake = FakeTransport::new();
    fake.respond_json(200, json!([]));
    let params = ListParams::new().with("status", "PENDING");

    let _: ListPage<ExpenseRecord> = gateway(&fake)
      .list(ResourceKind::Expenses, &params)
      .await
      .unwrap();

    let calls = fake.calls();
    assert_eq!(calls[0].verb, Verb::Get);
    assert_eq!(calls[0].path, "finance/expenses/");
    assert_eq!(calls[0].params, params);
  }

  #[tokio::test]
  async fn test_transport_failure_has_no_reason() {
    let fake = FakeTransport::new();
    fake.fail(ApiError::Transport("connection refused".into()));

    let err = gateway(&fake)
      .action::<Value>(ResourceKind::Expenses, 7, "approve")
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.status(), None);
    assert_eq!(err.user_message("Failed to approve expense"), "Failed to approve expense");
  }

  #[tokio::test]
  async fn test_rejection_carries_reason() {
    let fake = FakeTransport::new();
    fake.respond_json(
      400,
      json!({"allocated_amount": ["This field is required."]}),
    );

    let err = gateway(&fake)
      .create::<Value>(ResourceKind::Budgets, &json!({}))
      .await
      .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(
      err.reason(),
      Some("allocated_amount: This field is required.")
    );
  }

  #[tokio::test]
  async fn test_action_posts_to_detail_endpoint() {
    let fake = FakeTransport::new();
    fake.respond_json(200, json!({"id": 7, "status": "APPROVED", "amount": "10.00"}));

    let expense: ExpenseRecord = gateway(&fake)
      .action(ResourceKind::Expenses, 7, "approve")
      .await
      .unwrap();
    assert_eq!(expense.status, ExpenseStatus::Approved);

    let calls = fake.calls();
    assert_eq!(calls[0].verb, Verb::Post);
    assert_eq!(calls[0].path, "finance/expenses/7/approve/");
  }

  #[tokio::test]
  async fn test_update_patches_and_delete_accepts_empty_body() {
    let fake = FakeTransport::new();
    fake
      .respond_json(200, json!({"id": 5, "name": "Arts"}))
      .respond_raw(204, b"");
    let gw = gateway(&fake);

    let dept: Department = gw
      .update(ResourceKind::Departments, 5, &json!({"name": "Arts"}))
      .await
      .unwrap();
    assert_eq!(dept.name, "Arts");
    gw.delete(ResourceKind::Departments, 5).await.unwrap();

    let calls = fake.calls();
    assert_eq!(calls[0].verb, Verb::Patch);
    assert_eq!(calls[0].path, "departments/5/");
    assert_eq!(calls[1].verb, Verb::Delete);
  }

  #[tokio::test]
  async fn test_non_json_success_is_malformed() {
    let fake = FakeTransport::new();
    fake.respond_raw(200, b"<html>");

    let err = gateway(&fake)
      .list::<Department>(ResourceKind::Departments, &ListParams::new())
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Malformed(_)));
  }

  #[tokio::test]
  async fn test_download_returns_raw_bytes() {
    let fake = FakeTransport::new();
    fake.respond_raw(200, b"date,amount\n2024-03-01,10.00\n");

    let bytes = gateway(&fake)
      .download(AUDIT_DOWNLOAD_PATH, &period("2024-01-01", "2024-12-31"))
      .await
      .unwrap();
    assert!(bytes.starts_with(b"date,amount"));
    assert_eq!(fake.calls()[0].params.canonical(), "end_date=2024-12-31&start_date=2024-01-01");
  }
}
