use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::session::{Claims, Session, TokenResponse};
use super::Authenticator;
use crate::config::AuthConfig;
use crate::storage::{self, KeyValueStore, StorageKey};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
  #[error("token endpoint unreachable: {0}")]
  Network(String),
  #[error("token endpoint rejected the refresh with HTTP {0}")]
  Rejected(u16),
  #[error("invalid token response: {0}")]
  Malformed(#[from] serde_json::Error),
}

/// Trait for exchanging a refresh token for a new token pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
  async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError>;
}

/// Refresh grant against an OpenID Connect token endpoint.
pub struct OidcRefresher {
  client: reqwest::Client,
  token_url: String,
  client_id: String,
}

impl OidcRefresher {
  pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("fieldsync/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| AuthError::Network(format!("failed to create HTTP client: {}", e)))?;

    Ok(Self {
      client,
      token_url: config.token_url.clone(),
      client_id: config.client_id.clone(),
    })
  }
}

#[async_trait]
impl TokenRefresher for OidcRefresher {
  async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
    let form = [
      ("grant_type", "refresh_token"),
      ("client_id", self.client_id.as_str()),
      ("refresh_token", refresh_token),
    ];

    let response = self
      .client
      .post(&self.token_url)
      .form(&form)
      .send()
      .await
      .map_err(|e| AuthError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(AuthError::Rejected(status.as_u16()));
    }

    let body = response
      .bytes()
      .await
      .map_err(|e| AuthError::Network(e.to_string()))?;

    Ok(serde_json::from_slice(&body)?)
  }
}

/// Owner of the one live [`Session`].
///
/// Refreshes are serialized: concurrent callers that all find the token
/// near expiry wait for a single exchange instead of racing the token
/// endpoint with the same refresh token.
pub struct SessionGuard {
  session: Mutex<Option<Session>>,
  refresh_lock: tokio::sync::Mutex<()>,
  refresher: Arc<dyn TokenRefresher>,
  store: Arc<dyn KeyValueStore>,
  /// Tokens this close to expiry are refreshed before use
  skew: Duration,
}

impl SessionGuard {
  /// Create a guard, resuming a persisted session if there is one.
  pub fn new(
    refresher: Arc<dyn TokenRefresher>,
    store: Arc<dyn KeyValueStore>,
    skew: Duration,
  ) -> Self {
    let session: Option<Session> = storage::load_json(&*store, &StorageKey::Session);
    if session.is_some() {
      debug!("resuming persisted session");
    }

    Self {
      session: Mutex::new(session),
      refresh_lock: tokio::sync::Mutex::new(()),
      refresher,
      store,
      skew,
    }
  }

  /// Start a session from a refresh token handed over by the login flow.
  /// An existing session wins.
  pub fn begin_with_refresh_token(&self, refresh_token: impl Into<String>) {
    let mut session = self.lock();
    if session.is_none() {
      info!("starting session from refresh token");
      *session = Some(Session::from_refresh_token(refresh_token));
    }
  }

  pub fn is_authenticated(&self) -> bool {
    self.lock().is_some()
  }

  pub fn user(&self) -> Option<Claims> {
    self.lock().as_ref().map(|s| s.claims.clone())
  }

  pub fn has_role(&self, role: &str) -> bool {
    self
      .lock()
      .as_ref()
      .is_some_and(|s| s.claims.has_role(role))
  }

  fn lock(&self) -> MutexGuard<'_, Option<Session>> {
    self.session.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn is_valid_now(&self) -> bool {
    self
      .lock()
      .as_ref()
      .is_some_and(|s| s.is_valid_at(Utc::now(), self.skew))
  }

  /// Run one exchange. Callers must hold `refresh_lock`.
  async fn exchange(&self) -> bool {
    let refresh_token = self
      .lock()
      .as_ref()
      .map(|s| s.refresh_token.clone())
      .filter(|t| !t.is_empty());

    let Some(refresh_token) = refresh_token else {
      debug!("no refresh token available");
      return false;
    };

    let tokens = match self.refresher.refresh(&refresh_token).await {
      Ok(tokens) => tokens,
      Err(e) => {
        warn!(error = %e, "token refresh failed");
        return false;
      }
    };

    let mut guard = self.lock();
    // Cleared while the exchange was in flight
    let Some(session) = guard.as_mut() else {
      return false;
    };
    session.apply(tokens, Utc::now());
    storage::save_json(&*self.store, &StorageKey::Session, &*session);
    info!(expires_at = %session.expires_at, "access token refreshed");
    true
  }
}

#[async_trait]
impl Authenticator for SessionGuard {
  async fn ensure_valid_token(&self) -> bool {
    if self.is_valid_now() {
      return true;
    }

    let _refreshing = self.refresh_lock.lock().await;
    // Someone else may have refreshed while we waited
    if self.is_valid_now() {
      return true;
    }
    self.exchange().await
  }

  async fn refresh_access_token(&self) -> bool {
    let _refreshing = self.refresh_lock.lock().await;
    self.exchange().await
  }

  fn auth_header(&self) -> String {
    let session = self.lock();
    let token = session.as_ref().map_or("", |s| s.access_token.as_str());
    format!("Bearer {}", token)
  }

  fn clear_session(&self) {
    let had_session = self.lock().take().is_some();
    storage::erase(&*self.store, &StorageKey::Session);
    if had_session {
      info!("session cleared");
    }
  }
}
