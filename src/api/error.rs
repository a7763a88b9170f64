use serde_json::Value;
use thiserror::Error;

/// Failure of a request against the finance API.
///
/// Cloneable so a single failed fetch can be handed to every reader of the
/// cache entry it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// 4xx response, optionally carrying the server's reason
  #[error("request rejected ({status}){}", fmt_reason(.message))]
  Rejected {
    status: u16,
    message: Option<String>,
  },
  /// 5xx (or otherwise unexpected) status
  #[error("server error ({status}){}", fmt_reason(.message))]
  Server {
    status: u16,
    message: Option<String>,
  },
  /// Network unreachable, timeout, TLS failure
  #[error("network error: {0}")]
  Transport(String),
  /// Response body did not have the expected shape
  #[error("unexpected response: {0}")]
  Malformed(String),
}

fn fmt_reason(message: &Option<String>) -> String {
  message
    .as_deref()
    .map(|m| format!(": {}", m))
    .unwrap_or_default()
}

impl ApiError {
  /// Build an error from a non-success status and its raw body.
  pub fn from_status(status: u16, body: &[u8]) -> Self {
    let message = serde_json::from_slice::<Value>(body)
      .ok()
      .and_then(|v| extract_reason(&v));
    if (400..500).contains(&status) {
      ApiError::Rejected { status, message }
    } else {
      ApiError::Server { status, message }
    }
  }

  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Rejected { status, .. } | ApiError::Server { status, .. } => Some(*status),
      _ => None,
    }
  }

  /// Server-supplied reason of a rejection. Transport failures and 5xx
  /// responses never expose one.
  pub fn reason(&self) -> Option<&str> {
    match self {
      ApiError::Rejected { message, .. } => message.as_deref(),
      _ => None,
    }
  }

  /// Message to show the user: the rejection reason when present, otherwise
  /// the caller's fallback copy.
  pub fn user_message(&self, fallback: &str) -> String {
    self
      .reason()
      .map(String::from)
      .unwrap_or_else(|| fallback.to_string())
  }
}

/// Pull a human-readable reason out of an error body.
///
/// Order: `detail`, then `error`, then the first field error
/// (`{"amount": ["This field is required."]}` → `amount: This field is required.`).
pub fn extract_reason(body: &Value) -> Option<String> {
  let obj = body.as_object()?;

  for key in ["detail", "error"] {
    if let Some(s) = obj.get(key).and_then(|v| v.as_str()) {
      return Some(s.to_string());
    }
  }

  for (field, value) in obj {
    let message = match value {
      Value::String(s) => Some(s.clone()),
      Value::Array(items) => items.iter().find_map(|i| i.as_str()).map(String::from),
      _ => None,
    };
    if let Some(message) = message {
      if field == "non_field_errors" {
        return Some(message);
      }
      return Some(format!("{}: {}", field, message));
    }
  }

  None
}
