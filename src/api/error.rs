#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// The session cannot be recovered. Login navigation has already fired.
  #[error("session expired, please log in again")]
  AuthExpired,

  #[error("network failure: {0}")]
  Network(String),

  /// Non-2xx response that is not an authorization failure.
  #[error("backend returned HTTP {0}")]
  Status(u16),

  #[error("malformed response: {0}")]
  Malformed(#[from] serde_json::Error),
}
