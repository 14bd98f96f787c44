//! In-memory fakes shared by the unit tests.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::api::{ApiError, ApiRequest, ApiResponse, Gateway, Navigator, Transport};
use crate::auth::{AuthError, Authenticator, TokenRefresher, TokenResponse};
use crate::tasks::{Scope, SyncStatus, Task, TaskRenderer};

/// Unsigned JWT carrying `claims` as its payload.
pub fn jwt(claims: Value) -> String {
  let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
  let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
  format!("{}.{}.sig", header, payload)
}

/// Gateway over fakes, with a navigator nobody inspects.
pub fn gateway_with(auth: Arc<dyn Authenticator>, transport: Arc<dyn Transport>) -> Gateway {
  Gateway::new(
    "https://portal.example.com/webhook",
    auth,
    transport,
    Arc::new(RecordingNavigator::default()),
  )
}

/// Authenticator with scripted answers. The bearer token is
/// `token-<successful refreshes>`.
pub struct FakeAuth {
  valid: AtomicBool,
  refresh_succeeds: bool,
  refreshes: AtomicUsize,
  generation: AtomicUsize,
  clears: AtomicUsize,
}

impl FakeAuth {
  pub fn valid() -> Self {
    Self {
      valid: AtomicBool::new(true),
      refresh_succeeds: true,
      refreshes: AtomicUsize::new(0),
      generation: AtomicUsize::new(0),
      clears: AtomicUsize::new(0),
    }
  }

  pub fn expired_without_refresh() -> Self {
    let auth = Self::valid().refresh_fails();
    auth.valid.store(false, Ordering::SeqCst);
    auth
  }

  pub fn refresh_fails(mut self) -> Self {
    self.refresh_succeeds = false;
    self
  }

  pub fn refreshes(&self) -> usize {
    self.refreshes.load(Ordering::SeqCst)
  }

  pub fn clears(&self) -> usize {
    self.clears.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Authenticator for FakeAuth {
  async fn ensure_valid_token(&self) -> bool {
    self.valid.load(Ordering::SeqCst)
  }

  async fn refresh_access_token(&self) -> bool {
    self.refreshes.fetch_add(1, Ordering::SeqCst);
    if self.refresh_succeeds {
      self.generation.fetch_add(1, Ordering::SeqCst);
    }
    self.refresh_succeeds
  }

  fn auth_header(&self) -> String {
    format!("Bearer token-{}", self.generation.load(Ordering::SeqCst))
  }

  fn clear_session(&self) {
    self.clears.fetch_add(1, Ordering::SeqCst);
    self.valid.store(false, Ordering::SeqCst);
  }
}

type Reply = Result<ApiResponse, ApiError>;

/// Transport answering from per-path queues. Routes match on the URL path
/// suffix (query excluded); the longest matching suffix wins. An exhausted
/// route answers 404.
#[derive(Default)]
pub struct FakeTransport {
  routes: Mutex<Vec<(String, VecDeque<Reply>)>>,
  requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
  pub fn new() -> Self {
    Self::default()
  }

  fn push(&self, path: &str, reply: Reply) {
    let mut routes = self.routes.lock().unwrap();
    match routes.iter_mut().find(|(p, _)| p == path) {
      Some((_, queue)) => queue.push_back(reply),
      None => routes.push((path.to_string(), VecDeque::from([reply]))),
    }
  }

  pub fn respond(&self, path: &str, status: u16, body: Value) {
    self.push(path, Ok(ApiResponse::new(status, body.to_string())));
  }

  pub fn respond_raw(&self, path: &str, status: u16, body: Vec<u8>) {
    self.push(path, Ok(ApiResponse::new(status, body)));
  }

  pub fn fail(&self, path: &str, message: &str) {
    self.push(path, Err(ApiError::Network(message.to_string())));
  }

  pub fn requests(&self) -> Vec<ApiRequest> {
    self.requests.lock().unwrap().clone()
  }

  /// Query parameter `name` of the `index`th request.
  pub fn query_param(&self, index: usize, name: &str) -> Option<String> {
    self
      .requests()
      .get(index)
      .and_then(|request| param(&request.url, name))
  }

  /// Query parameter `name` of the first request to `path`.
  pub fn param_for(&self, path: &str, name: &str) -> Option<String> {
    self
      .requests()
      .iter()
      .find(|request| path_of(&request.url).ends_with(path))
      .and_then(|request| param(&request.url, name))
  }
}

fn path_of(url: &str) -> &str {
  url.split('?').next().unwrap_or(url)
}

fn param(url: &str, name: &str) -> Option<String> {
  url::Url::parse(url)
    .ok()?
    .query_pairs()
    .find(|(key, _)| key == name)
    .map(|(_, value)| value.into_owned())
}

#[async_trait]
impl Transport for FakeTransport {
  async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    self.requests.lock().unwrap().push(request.clone());
    tokio::task::yield_now().await;

    let path = path_of(&request.url);
    let mut routes = self.routes.lock().unwrap();
    let route = routes
      .iter_mut()
      .filter(|(suffix, _)| path.ends_with(suffix.as_str()))
      .max_by_key(|(suffix, _)| suffix.len());

    match route.and_then(|(_, queue)| queue.pop_front()) {
      Some(reply) => reply,
      None => Ok(ApiResponse::new(404, "{}")),
    }
  }
}

#[derive(Default)]
pub struct RecordingNavigator {
  logins: AtomicUsize,
}

impl RecordingNavigator {
  pub fn logins(&self) -> usize {
    self.logins.load(Ordering::SeqCst)
  }
}

impl Navigator for RecordingNavigator {
  fn show_login(&self) {
    self.logins.fetch_add(1, Ordering::SeqCst);
  }
}

/// Token endpoint fake. The nth successful call hands out `token(n)` and
/// refresh token `rt-n`.
pub struct FakeRefresher {
  succeeds: bool,
  calls: AtomicUsize,
}

impl FakeRefresher {
  pub fn succeeding() -> Self {
    Self {
      succeeds: true,
      calls: AtomicUsize::new(0),
    }
  }

  pub fn failing() -> Self {
    Self {
      succeeds: false,
      calls: AtomicUsize::new(0),
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn token(&self, n: usize) -> String {
    jwt(json!({
      "name": "Jan Peeters",
      "jti": format!("token-{}", n),
      "realm_access": {"roles": ["installer"]},
    }))
  }
}

#[async_trait]
impl TokenRefresher for FakeRefresher {
  async fn refresh(&self, _refresh_token: &str) -> Result<TokenResponse, AuthError> {
    let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
    tokio::task::yield_now().await;

    if !self.succeeds {
      return Err(AuthError::Rejected(400));
    }
    Ok(TokenResponse {
      access_token: self.token(n),
      refresh_token: Some(format!("rt-{}", n)),
      expires_in: Some(300),
    })
  }
}

/// Renderer that records everything it is shown.
#[derive(Default)]
pub struct RecordingRenderer {
  renders: Mutex<Vec<(Scope, Vec<Task>)>>,
  statuses: Mutex<Vec<(Scope, SyncStatus)>>,
}

impl RecordingRenderer {
  pub fn renders(&self) -> Vec<(Scope, Vec<Task>)> {
    self.renders.lock().unwrap().clone()
  }

  pub fn statuses(&self) -> Vec<SyncStatus> {
    self
      .statuses
      .lock()
      .unwrap()
      .iter()
      .map(|(_, status)| status.clone())
      .collect()
  }
}

impl TaskRenderer for RecordingRenderer {
  fn render(&self, scope: Scope, tasks: &[Task]) {
    self.renders.lock().unwrap().push((scope, tasks.to_vec()));
  }

  fn status(&self, scope: Scope, status: SyncStatus) {
    self.statuses.lock().unwrap().push((scope, status));
  }
}
