//! Shapes the backend uses to return collections.

use serde_json::Value;

/// Normalize a collection payload into its items.
///
/// Accepts a bare array, a `{"data": [...]}` envelope, or a single object
/// with an `id` (treated as a one-element collection). Anything else is an
/// empty collection.
pub fn collection(value: Value) -> Vec<Value> {
  match value {
    Value::Array(items) => items,
    Value::Object(mut fields) => match fields.remove("data") {
      Some(Value::Array(items)) => items,
      Some(other) => {
        fields.insert("data".to_string(), other);
        single(fields)
      }
      None => single(fields),
    },
    _ => Vec::new(),
  }
}

fn single(fields: serde_json::Map<String, Value>) -> Vec<Value> {
  if fields.contains_key("id") {
    vec![Value::Object(fields)]
  } else {
    Vec::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_bare_and_enveloped() {
    assert_eq!(collection(json!([{"id": 1}, {"id": 2}])).len(), 2);
    assert_eq!(collection(json!({"data": [{"id": 1}]})).len(), 1);
  }

  #[test]
  fn test_single_object() {
    let items = collection(json!({"id": 5, "name": "Only"}));
    assert_eq!(items, vec![json!({"id": 5, "name": "Only"})]);
  }

  #[test]
  fn test_unrecognized_is_empty() {
    assert!(collection(json!({"message": "nothing"})).is_empty());
    assert!(collection(json!("text")).is_empty());
    assert!(collection(Value::Null).is_empty());
  }
}
