use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// How many past days a task list includes. Each scope is cached separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Scope(u32);

impl Scope {
  /// Windows offered by the scope selector, in cycling order.
  pub const PRESETS: [u32; 4] = [0, 7, 14, 30];

  pub const fn new(past_days: u32) -> Self {
    Self(past_days)
  }

  pub fn past_days(self) -> u32 {
    self.0
  }

  /// Value sent as the `past_days` query parameter.
  pub fn query_value(self) -> String {
    self.0.to_string()
  }

  /// Next preset after this one, wrapping around. Scopes that are not a
  /// preset jump back to the first one.
  pub fn next_preset(self) -> Self {
    let next = Self::PRESETS
      .iter()
      .position(|&days| days == self.0)
      .map(|i| Self::PRESETS[(i + 1) % Self::PRESETS.len()])
      .unwrap_or(Self::PRESETS[0]);
    Self(next)
  }
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.0 == 0 {
      write!(f, "upcoming only")
    } else {
      write!(f, "+ last {} days", self.0)
    }
  }
}

/// One scheduled work item as the backend sends it.
///
/// The record is opaque: the client only reads a handful of fields and
/// fills in display fields that the backend left empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Task(Map<String, Value>);

impl Task {
  /// Build a task from any JSON value; non-objects are rejected.
  pub fn from_value(value: Value) -> Option<Self> {
    match value {
      Value::Object(fields) => Some(Self(fields)),
      _ => None,
    }
  }

  pub fn get(&self, field: &str) -> Option<&Value> {
    self.0.get(field)
  }

  /// A string field, ignoring Odoo-style `false` placeholders.
  pub fn text(&self, field: &str) -> Option<&str> {
    self
      .0
      .get(field)
      .and_then(Value::as_str)
      .filter(|s| !s.is_empty())
  }

  pub fn id(&self) -> Option<u64> {
    self.0.get("id").and_then(Value::as_u64)
  }

  /// Display name of the task itself.
  pub fn name(&self) -> &str {
    self
      .text("name")
      .or_else(|| self.text("display_name"))
      .unwrap_or("Task")
  }

  /// Calendar date (`YYYY-MM-DD`) the task is scheduled on.
  pub fn date(&self) -> Option<&str> {
    self
      .text("date")
      .or_else(|| self.text("planned_date_begin"))
      .and_then(|d| d.split(' ').next())
  }

  /// Worker names, as filled by the backend or by enrichment.
  pub fn workers(&self) -> Vec<&str> {
    self
      .0
      .get("workers")
      .and_then(Value::as_array)
      .map(|names| names.iter().filter_map(Value::as_str).collect())
      .unwrap_or_default()
  }

  /// Whether a field is missing or carries no usable value.
  pub fn is_blank(&self, field: &str) -> bool {
    self.0.get(field).map_or(true, is_blank)
  }

  /// Set `field` only when it is blank. Returns whether it was written.
  pub fn fill(&mut self, field: &str, value: Value) -> bool {
    if !self.is_blank(field) || is_blank(&value) {
      return false;
    }
    self.0.insert(field.to_string(), value);
    true
  }

  /// All entity ids referenced by a foreign-key field.
  ///
  /// Accepts a bare id, an `[id, "label"]` pair, a list of ids, or a list
  /// of pairs. Non-positive ids are ignored.
  pub fn references(&self, field: &str) -> Vec<u64> {
    self.0.get(field).map(reference_ids).unwrap_or_default()
  }

  /// The first id referenced by a single-valued foreign-key field.
  pub fn reference(&self, field: &str) -> Option<u64> {
    self.references(field).into_iter().next()
  }
}

fn is_blank(value: &Value) -> bool {
  match value {
    Value::Null | Value::Bool(false) => true,
    Value::String(s) => s.is_empty(),
    Value::Array(items) => items.is_empty(),
    _ => false,
  }
}

fn positive_id(value: &Value) -> Option<u64> {
  value.as_u64().filter(|&id| id > 0)
}

fn is_labelled_pair(items: &[Value]) -> bool {
  items.len() == 2 && items[0].is_u64() && items[1].is_string()
}

fn reference_ids(value: &Value) -> Vec<u64> {
  match value {
    Value::Number(_) => positive_id(value).into_iter().collect(),
    Value::Array(items) if is_labelled_pair(items) => positive_id(&items[0]).into_iter().collect(),
    Value::Array(items) => items
      .iter()
      .filter_map(|item| match item {
        Value::Array(pair) if is_labelled_pair(pair) => positive_id(&pair[0]),
        other => positive_id(other),
      })
      .collect(),
    _ => Vec::new(),
  }
}
