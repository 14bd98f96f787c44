//! Authorization rejections delivered inside a success response.
//!
//! The workflow backend cannot set HTTP status codes from its auth
//! sub-flow, so it answers `200` with `{"valid": false, "statusCode": 401}`,
//! sometimes wrapped in a one-element array.

use serde_json::Value;

use super::transport::ApiResponse;

/// Whether a response must be handled like an HTTP 401.
pub fn is_auth_rejection(response: &ApiResponse) -> bool {
  response.status == 401 || (response.is_success() && is_soft_rejection(&response.body))
}

/// Whether a success body is a soft-401. Bodies that are empty or not JSON
/// are never rejections.
pub fn is_soft_rejection(body: &[u8]) -> bool {
  let Ok(value) = serde_json::from_slice::<Value>(body) else {
    return false;
  };

  let candidate = match &value {
    Value::Array(items) if items.len() == 1 => &items[0],
    other => other,
  };

  let Some(fields) = candidate.as_object() else {
    return false;
  };

  if fields.get("valid") != Some(&Value::Bool(false)) {
    return false;
  }

  match fields.get("statusCode") {
    None => true,
    Some(code) => {
      let code = code
        .as_u64()
        .or_else(|| code.as_str().and_then(|s| s.parse().ok()));
      code == Some(401)
    }
  }
}
