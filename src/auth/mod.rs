//! Session guard: owns the access/refresh token pair.

mod guard;
mod session;

use async_trait::async_trait;

pub use guard::{AuthError, OidcRefresher, SessionGuard, TokenRefresher};
pub use session::TokenResponse;

/// Authentication collaborator consulted by the request gateway.
///
/// Refresh failures are reported as `false`, never as errors, so the
/// caller decides what to do about navigation.
#[async_trait]
pub trait Authenticator: Send + Sync {
  /// True if the access token can be used right now, refreshing it first
  /// when it is about to expire.
  async fn ensure_valid_token(&self) -> bool;

  /// Exchange the refresh token for a new token pair.
  async fn refresh_access_token(&self) -> bool;

  /// `Bearer <access token>` for the most recent token.
  fn auth_header(&self) -> String;

  /// Forget the session. Idempotent.
  fn clear_session(&self);
}
