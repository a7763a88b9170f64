//! CSV audit export: download the report and save it to disk.

use chrono::NaiveDate;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::api::client::AUDIT_DOWNLOAD_PATH;
use crate::api::{Gateway, ListParams};

/// `audit_2026-01-01_2026-12-31.csv`
pub fn default_file_name(from: NaiveDate, to: NaiveDate) -> PathBuf {
  PathBuf::from(format!(
    "audit_{}_{}.csv",
    from.format("%Y-%m-%d"),
    to.format("%Y-%m-%d")
  ))
}

/// Download the audit CSV for `from..=to` and write it to `output`.
pub async fn export_audit(
  gateway: &Gateway,
  from: NaiveDate,
  to: NaiveDate,
  output: &Path,
) -> Result<PathBuf> {
  if from > to {
    return Err(eyre!("Start date {} is after end date {}", from, to));
  }
  let params = ListParams::new()
    .with("start_date", from.format("%Y-%m-%d").to_string())
    .with("end_date", to.format("%Y-%m-%d").to_string());
  let bytes = gateway
    .download(AUDIT_DOWNLOAD_PATH, &params)
    .await
    .map_err(|e| eyre!("{}", e.user_message("Failed to download the audit report")))?;

  tokio::fs::write(output, &bytes)
    .await
    .map_err(|e| eyre!("Failed to write {}: {}", output.display(), e))?;
  info!(path = %output.display(), bytes = bytes.len(), "audit exported");
  Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::transport::fake::FakeTransport;
  use crate::api::transport::Verb;
  use std::sync::Arc;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[tokio::test]
  async fn test_export_writes_body() {
    let fake = FakeTransport::new();
    fake.respond_raw(200, b"date,amount\n2026-03-01,1500.50\n");
    let gateway = Gateway::new(Arc::new(fake.clone()));
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join(default_file_name(date(2026, 1, 1), date(2026, 12, 31)));

    let written = export_audit(&gateway, date(2026, 1, 1), date(2026, 12, 31), &output)
      .await
      .unwrap();
    assert_eq!(written, output);
    assert_eq!(
      std::fs::read_to_string(&output).unwrap(),
      "date,amount\n2026-03-01,1500.50\n"
    );

    let call = &fake.calls()[0];
    assert_eq!(call.verb, Verb::Get);
    assert_eq!(call.path, AUDIT_DOWNLOAD_PATH);
    assert_eq!(call.params.canonical(), "end_date=2026-12-31&start_date=2026-01-01");
  }

  #[tokio::test]
  async fn test_export_refuses_reversed_range() {
    let gateway = Gateway::new(Arc::new(FakeTransport::new()));
    let dir = tempfile::tempdir().unwrap();
    let result = export_audit(
      &gateway,
      date(2026, 5, 1),
      date(2026, 4, 1),
      &dir.path().join("out.csv"),
    )
    .await;
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn test_export_surfaces_rejection() {
    let fake = FakeTransport::new();
    fake.respond_json(403, serde_json::json!({"detail": "Not allowed"}));
    let gateway = Gateway::new(Arc::new(fake));
    let dir = tempfile::tempdir().unwrap();
    let err = export_audit(&gateway, date(2026, 1, 1), date(2026, 1, 31), &dir.path().join("a.csv"))
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Not allowed");
  }
}
