use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::ApiError;
use super::soft_auth::is_auth_rejection;
use super::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::auth::Authenticator;

/// Collaborator that shows the login surface.
pub trait Navigator: Send + Sync {
  fn show_login(&self);
}

/// Progress of one logical call through the single-retry policy.
///
/// `AwaitingRefresh` is only reachable from `Sending`, so a call performs at
/// most one refresh and at most two sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
  Sending,
  AwaitingRefresh,
  Resent,
  Failed,
}

/// Authenticated gateway to the workflow backend.
#[derive(Clone)]
pub struct Gateway {
  base_url: String,
  auth: Arc<dyn Authenticator>,
  transport: Arc<dyn Transport>,
  navigator: Arc<dyn Navigator>,
}

impl Gateway {
  pub fn new(
    base_url: impl Into<String>,
    auth: Arc<dyn Authenticator>,
    transport: Arc<dyn Transport>,
    navigator: Arc<dyn Navigator>,
  ) -> Self {
    Self {
      base_url: base_url.into(),
      auth,
      transport,
      navigator,
    }
  }

  /// Build the URL for an endpoint without doing any I/O.
  ///
  /// Absolute `http(s)://` endpoints are used as-is; anything else is
  /// appended to the configured base URL.
  pub fn url(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
    let base = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
      endpoint.to_string()
    } else {
      format!(
        "{}/{}",
        self.base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
      )
    };

    if params.is_empty() {
      return base;
    }

    let query = url::form_urlencoded::Serializer::new(String::new())
      .extend_pairs(params)
      .finish();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base, separator, query)
  }

  pub async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<ApiResponse, ApiError> {
    self
      .execute(Method::Get, self.url(endpoint, params), None)
      .await
  }

  pub async fn post(
    &self,
    endpoint: &str,
    body: Value,
    params: &[(&str, &str)],
  ) -> Result<ApiResponse, ApiError> {
    self
      .execute(Method::Post, self.url(endpoint, params), Some(body))
      .await
  }

  pub async fn delete(
    &self,
    endpoint: &str,
    body: Value,
    params: &[(&str, &str)],
  ) -> Result<ApiResponse, ApiError> {
    self
      .execute(Method::Delete, self.url(endpoint, params), Some(body))
      .await
  }

  async fn execute(
    &self,
    method: Method,
    url: String,
    body: Option<Value>,
  ) -> Result<ApiResponse, ApiError> {
    // Never send a token we already know is dead
    if !self.auth.ensure_valid_token().await {
      return Err(self.expire_session());
    }

    let mut request = ApiRequest {
      method,
      url,
      authorization: self.auth.auth_header(),
      body,
    };

    let mut attempt = Attempt::Sending;
    loop {
      attempt = match attempt {
        Attempt::Sending => {
          let response = self.transport.send(&request).await?;
          if !is_auth_rejection(&response) {
            return Ok(response);
          }
          debug!(url = %request.url, status = response.status, "authorization rejected, refreshing");
          Attempt::AwaitingRefresh
        }
        Attempt::AwaitingRefresh => {
          if self.auth.refresh_access_token().await {
            request.authorization = self.auth.auth_header();
            Attempt::Resent
          } else {
            Attempt::Failed
          }
        }
        Attempt::Resent => {
          let response = self.transport.send(&request).await?;
          if !is_auth_rejection(&response) {
            return Ok(response);
          }
          Attempt::Failed
        }
        Attempt::Failed => return Err(self.expire_session()),
      };
    }
  }

  fn expire_session(&self) -> ApiError {
    warn!("session could not be recovered, routing to login");
    self.auth.clear_session();
    self.navigator.show_login();
    ApiError::AuthExpired
  }
}
