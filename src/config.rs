use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  pub auth: AuthConfig,
  /// Custom title for header (defaults to the backend host if not set)
  pub title: Option<String>,
  /// Past-days window the task list opens with
  #[serde(default)]
  pub default_past_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Prefix for every relative endpoint
  pub base_url: String,
  #[serde(default = "default_tasks_endpoint")]
  pub tasks_endpoint: String,
  #[serde(default)]
  pub lookups: LookupEndpoints,
}

/// Batched lookup endpoints, one per resource kind. Each takes an `ids`
/// query parameter with a comma-separated id list.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookupEndpoints {
  pub installers: String,
  pub sales_orders: String,
  pub addresses: String,
}

impl Default for LookupEndpoints {
  fn default() -> Self {
    Self {
      installers: "/lookup/installers".to_string(),
      sales_orders: "/lookup/sales-orders".to_string(),
      addresses: "/lookup/addresses".to_string(),
    }
  }
}

fn default_tasks_endpoint() -> String {
  "/tasks/tasks-quick".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
  /// OpenID Connect token endpoint used for the refresh grant
  pub token_url: String,
  pub client_id: String,
  /// Refresh the access token when it expires within this many seconds
  #[serde(default = "default_expiry_skew")]
  pub expiry_skew_secs: i64,
}

fn default_expiry_skew() -> i64 {
  30
}

impl AuthConfig {
  /// Out-of-range values fall back to the default skew.
  pub fn expiry_skew(&self) -> chrono::Duration {
    chrono::Duration::try_seconds(self.expiry_skew_secs.max(0))
      .unwrap_or_else(|| chrono::Duration::seconds(default_expiry_skew()))
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./fieldsync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/fieldsync/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/fieldsync/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("fieldsync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("fieldsync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Refresh token handed over by the login flow.
  ///
  /// Reads FIELDSYNC_REFRESH_TOKEN; `None` when unset or empty.
  pub fn refresh_token() -> Option<String> {
    std::env::var("FIELDSYNC_REFRESH_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_gets_defaults() {
    let config = Config::parse(
      r#"
api:
  base_url: https://portal.example.com/webhook
auth:
  token_url: https://sso.example.com/realms/portal/protocol/openid-connect/token
  client_id: portal
"#,
    )
    .unwrap();

    assert_eq!(config.api.tasks_endpoint, "/tasks/tasks-quick");
    assert_eq!(config.api.lookups.installers, "/lookup/installers");
    assert_eq!(config.auth.expiry_skew(), chrono::Duration::seconds(30));
    assert_eq!(config.default_past_days, 0);
    assert!(config.title.is_none());
  }

  #[test]
  fn test_partial_lookup_override() {
    let config = Config::parse(
      r#"
api:
  base_url: https://portal.example.com/webhook
  lookups:
    addresses: /odoo/addresses
auth:
  token_url: https://sso.example.com/token
  client_id: portal
  expiry_skew_secs: 60
default_past_days: 7
"#,
    )
    .unwrap();

    assert_eq!(config.api.lookups.addresses, "/odoo/addresses");
    assert_eq!(config.api.lookups.sales_orders, "/lookup/sales-orders");
    assert_eq!(config.auth.expiry_skew(), chrono::Duration::seconds(60));
    assert_eq!(config.default_past_days, 7);
  }

  #[test]
  fn test_missing_auth_section_is_an_error() {
    assert!(Config::parse("api:\n  base_url: https://x\n").is_err());
  }

  #[test]
  fn test_huge_expiry_skew_falls_back_to_default() {
    let config = Config::parse(
      r#"
api:
  base_url: https://portal.example.com/webhook
auth:
  token_url: https://sso.example.com/token
  client_id: portal
  expiry_skew_secs: 9223372036854775807
"#,
    )
    .unwrap();

    assert_eq!(config.auth.expiry_skew(), chrono::Duration::seconds(30));
  }
}
