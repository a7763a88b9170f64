//! Raw request transport. The only code that touches HTTP.

use futures::future::BoxFuture;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::error::ApiError;
use super::keys::ListParams;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
  Get,
  Post,
  Patch,
  Delete,
}

impl Verb {
  fn method(self) -> Method {
    match self {
      Verb::Get => Method::GET,
      Verb::Post => Method::POST,
      Verb::Patch => Method::PATCH,
      Verb::Delete => Method::DELETE,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub verb: Verb,
  /// Path relative to the API base URL, e.g. `finance/expenses/`
  pub path: String,
  pub params: ListParams,
  pub body: Option<Value>,
}

impl ApiRequest {
  pub fn get(path: impl Into<String>, params: ListParams) -> Self {
    Self {
      verb: Verb::Get,
      path: path.into(),
      params,
      body: None,
    }
  }

  pub fn send(verb: Verb, path: impl Into<String>, body: Option<Value>) -> Self {
    Self {
      verb,
      path: path.into(),
      params: ListParams::new(),
      body,
    }
  }
}

/// Status and raw body of a completed exchange, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl ApiResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Executes requests against the remote API.
///
/// Implementations only move bytes; status interpretation and body
/// normalization live in [`super::client::Gateway`].
pub trait Transport: Send + Sync {
  fn request(&self, request: ApiRequest) -> BoxFuture<'static, Result<ApiResponse, ApiError>>;
}

/// reqwest-backed transport attaching the session's bearer token.
#[derive(Clone)]
pub struct HttpTransport {
  http: reqwest::Client,
  base: Url,
  session: Session,
}

impl HttpTransport {
  pub fn new(base_url: &str, timeout: Duration, session: Session) -> color_eyre::Result<Self> {
    let builder = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("bursar/", env!("CARGO_PKG_VERSION")));
    Self::with_builder(base_url, builder, session)
  }

  fn with_builder(
    base_url: &str,
    builder: reqwest::ClientBuilder,
    session: Session,
  ) -> color_eyre::Result<Self> {
    // Url::join drops the last segment unless the base ends with a slash
    let normalized = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };
    let base = Url::parse(&normalized)
      .map_err(|e| color_eyre::eyre::eyre!("Invalid API url {}: {}", base_url, e))?;

    let http = builder
      .build()
      .map_err(|e| color_eyre::eyre::eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      session,
    })
  }
}

impl Transport for HttpTransport {
  fn request(&self, request: ApiRequest) -> BoxFuture<'static, Result<ApiResponse, ApiError>> {
    let url = self.base.join(request.path.trim_start_matches('/'));
    let http = self.http.clone();
    // Read the token at dispatch time so a fresh login applies immediately
    let token = self.session.token();

    Box::pin(async move {
      let url = url.map_err(|e| ApiError::Transport(format!("invalid path: {}", e)))?;
      debug!(verb = ?request.verb, %url, "api request");

      let mut builder = http.request(request.verb.method(), url);
      if !request.params.is_empty() {
        let query: Vec<(&str, &str)> = request.params.pairs().collect();
        builder = builder.query(&query);
      }
      if let Some(token) = token {
        builder = builder.bearer_auth(token);
      }
      if let Some(body) = &request.body {
        let bytes =
          serde_json::to_vec(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
        builder = builder
          .header(reqwest::header::CONTENT_TYPE, "application/json")
          .body(bytes);
      }

      let response = builder
        .send()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
      let status = response.status().as_u16();
      let body = response
        .bytes()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

      Ok(ApiResponse {
        status,
        body: body.to_vec(),
      })
    })
  }
}
