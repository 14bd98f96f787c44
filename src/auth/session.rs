use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifetime assumed for an access token that carries neither `expires_in`
/// nor an `exp` claim.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 300;

/// Token endpoint response (OAuth2 refresh grant).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
  pub access_token: String,
  /// Omitted by servers that do not rotate refresh tokens
  #[serde(default)]
  pub refresh_token: Option<String>,
  /// Seconds until the access token expires
  #[serde(default)]
  pub expires_in: Option<i64>,
}

/// Identity decoded from the access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub name: Option<String>,
  pub email: Option<String>,
  #[serde(default)]
  pub roles: BTreeSet<String>,
  /// `exp` claim, seconds since the epoch
  #[serde(default)]
  pub expires: Option<i64>,
}

#[derive(Deserialize, Default)]
struct RawClaims {
  name: Option<String>,
  preferred_username: Option<String>,
  email: Option<String>,
  exp: Option<i64>,
  #[serde(default)]
  realm_access: Option<RealmAccess>,
  #[serde(default)]
  roles: Vec<String>,
}

#[derive(Deserialize, Default)]
struct RealmAccess {
  #[serde(default)]
  roles: Vec<String>,
}

impl Claims {
  /// Decode the payload of a JWT. The signature is not checked here; the
  /// backend verifies every token it receives. Anything undecodable yields
  /// empty claims.
  pub fn decode(access_token: &str) -> Self {
    let Some(payload) = access_token.split('.').nth(1) else {
      return Self::default();
    };

    let raw: RawClaims = URL_SAFE_NO_PAD
      .decode(payload.trim_end_matches('='))
      .ok()
      .and_then(|bytes| serde_json::from_slice(&bytes).ok())
      .unwrap_or_default();

    let mut roles: BTreeSet<String> = raw.roles.into_iter().collect();
    if let Some(realm) = raw.realm_access {
      roles.extend(realm.roles);
    }

    Self {
      name: raw.name.or(raw.preferred_username),
      email: raw.email,
      roles,
      expires: raw.exp,
    }
  }

  pub fn has_role(&self, role: &str) -> bool {
    self.roles.contains(role)
  }
}

/// The one live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: DateTime<Utc>,
  pub claims: Claims,
}

impl Session {
  /// A session handed over by the login flow as a bare refresh token. It
  /// starts out expired so the first use refreshes it.
  pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
    Self {
      access_token: String::new(),
      refresh_token: refresh_token.into(),
      expires_at: DateTime::<Utc>::default(),
      claims: Claims::default(),
    }
  }

  /// Whether the access token is usable at `now` with `skew` to spare.
  pub fn is_valid_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
    !self.access_token.is_empty()
      && now
        .checked_add_signed(skew)
        .is_some_and(|deadline| deadline < self.expires_at)
  }

  /// Replace the tokens after a successful refresh.
  pub fn apply(&mut self, tokens: TokenResponse, now: DateTime<Utc>) {
    let claims = Claims::decode(&tokens.access_token);

    // Lifetimes that do not fit a timestamp get the default
    self.expires_at = match (tokens.expires_in, claims.expires) {
      (Some(secs), _) => Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d)),
      (None, Some(exp)) => DateTime::from_timestamp(exp, 0),
      (None, None) => None,
    }
    .unwrap_or_else(|| now + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));

    self.access_token = tokens.access_token;
    if let Some(refresh_token) = tokens.refresh_token.filter(|t| !t.is_empty()) {
      self.refresh_token = refresh_token;
    }
    self.claims = claims;
  }
}
