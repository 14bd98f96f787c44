use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Delete,
}

/// A fully built request, ready to be sent (and re-sent) as-is.
#[derive(Debug, Clone)]
pub struct ApiRequest {
  pub method: Method,
  pub url: String,
  /// Value of the `Authorization` header
  pub authorization: String,
  pub body: Option<Value>,
}

/// Raw backend response. The body is kept as bytes so it can be inspected
/// without being consumed.
#[derive(Debug, Clone)]
pub struct ApiResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl ApiResponse {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      body: body.into(),
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Turn a non-2xx response into [`ApiError::Status`].
  pub fn error_for_status(self) -> Result<Self, ApiError> {
    if self.is_success() {
      Ok(self)
    } else {
      Err(ApiError::Status(self.status))
    }
  }

  pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
    Ok(serde_json::from_slice(&self.body)?)
  }

  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

/// Trait for the wire underneath the gateway.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new() -> Result<Self, ApiError> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("fieldsync/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| ApiError::Network(format!("failed to create HTTP client: {}", e)))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let builder = match request.method {
      Method::Get => self.client.get(&request.url),
      Method::Post => self.client.post(&request.url),
      Method::Delete => self.client.delete(&request.url),
    };

    // Responses must always reflect current backend state
    let mut builder = builder
      .header(AUTHORIZATION, &request.authorization)
      .header(ACCEPT, "application/json")
      .header(CACHE_CONTROL, "no-store")
      .header(PRAGMA, "no-cache");

    if let Some(body) = &request.body {
      builder = builder
        .header(CONTENT_TYPE, "application/json")
        .body(serde_json::to_vec(body)?);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| ApiError::Network(e.to_string()))?;

    let status = response.status().as_u16();
    let body = response
      .bytes()
      .await
      .map_err(|e| ApiError::Network(format!("failed to read response body: {}", e)))?;

    Ok(ApiResponse::new(status, body.to_vec()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_for_status() {
    assert!(ApiResponse::new(204, Vec::new()).error_for_status().is_ok());
    assert!(matches!(
      ApiResponse::new(500, "boom").error_for_status(),
      Err(ApiError::Status(500))
    ));
  }

  #[test]
  fn test_json_on_garbage_is_malformed() {
    let response = ApiResponse::new(200, "<html>");
    assert!(matches!(
      response.json::<Value>(),
      Err(ApiError::Malformed(_))
    ));
    assert_eq!(response.text(), "<html>");
  }
}
