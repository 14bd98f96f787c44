//! Lookup kinds and the records the backend returns for them.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Foreign-key categories resolved by the lookup cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LookupKind {
  Installer,
  SalesOrder,
  Address,
}

impl LookupKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Installer => "installers",
      Self::SalesOrder => "sales_orders",
      Self::Address => "addresses",
    }
  }
}

impl fmt::Display for LookupKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Trait for records held in a lookup table.
pub trait LookupRecord: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Table this record belongs to
  const KIND: LookupKind;

  /// Entity id the record is keyed by
  fn id(&self) -> u64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installer {
  pub id: u64,
  #[serde(default, deserialize_with = "optional_text")]
  pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrder {
  pub id: u64,
  #[serde(default, deserialize_with = "optional_text")]
  pub project_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
  pub id: u64,
  #[serde(default, deserialize_with = "optional_text")]
  pub street: Option<String>,
  #[serde(default, deserialize_with = "optional_text")]
  pub city: Option<String>,
  #[serde(default, deserialize_with = "optional_text")]
  pub zip: Option<String>,
}

impl Address {
  /// `street, zip city`, leaving out whatever is unknown.
  pub fn full(&self) -> Option<String> {
    let city_line = join_present([self.zip.as_deref(), self.city.as_deref()], " ");
    join_present([self.street.as_deref(), city_line.as_deref()], ", ")
  }
}

fn join_present<const N: usize>(parts: [Option<&str>; N], separator: &str) -> Option<String> {
  let present: Vec<&str> = parts.into_iter().flatten().collect();
  if present.is_empty() {
    None
  } else {
    Some(present.join(separator))
  }
}

impl LookupRecord for Installer {
  const KIND: LookupKind = LookupKind::Installer;

  fn id(&self) -> u64 {
    self.id
  }
}

impl LookupRecord for SalesOrder {
  const KIND: LookupKind = LookupKind::SalesOrder;

  fn id(&self) -> u64 {
    self.id
  }
}

impl LookupRecord for Address {
  const KIND: LookupKind = LookupKind::Address;

  fn id(&self) -> u64 {
    self.id
  }
}

/// Text field that Odoo may send as `false`, `null`, a number or a string.
fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
    Some(Value::Number(n)) => Some(n.to_string()),
    _ => None,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_false_fields_become_none() {
    let address: Address =
      serde_json::from_value(json!({"id": 3, "street": "Kerkstraat 1", "city": false, "zip": 9000}))
        .unwrap();
    assert_eq!(address.street.as_deref(), Some("Kerkstraat 1"));
    assert_eq!(address.city, None);
    assert_eq!(address.zip.as_deref(), Some("9000"));
  }

  #[test]
  fn test_full_address_parts_are_optional() {
    let address = |street: Option<&str>, zip: Option<&str>, city: Option<&str>| Address {
      id: 1,
      street: street.map(String::from),
      zip: zip.map(String::from),
      city: city.map(String::from),
    };

    assert_eq!(
      address(Some("Kerkstraat 1"), Some("9000"), Some("Gent")).full(),
      Some("Kerkstraat 1, 9000 Gent".to_string())
    );
    assert_eq!(
      address(None, Some("9000"), Some("Gent")).full(),
      Some("9000 Gent".to_string())
    );
    assert_eq!(
      address(Some("Kerkstraat 1"), None, None).full(),
      Some("Kerkstraat 1".to_string())
    );
    assert_eq!(address(None, None, None).full(), None);
  }

  #[test]
  fn test_extra_fields_are_ignored() {
    let installer: Installer =
      serde_json::from_value(json!({"id": 7, "name": "Jan", "email": "jan@example.com"})).unwrap();
    assert_eq!(installer.name.as_deref(), Some("Jan"));
  }
}
