use std::fmt;

use crate::lookup::LookupKind;
use crate::tasks::Scope;

/// Every value the client persists, mapped to exactly one storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
  /// The live token pair and decoded claims
  Session,
  /// One lookup table per resource kind
  Lookup(LookupKind),
  /// One task collection per past-days scope
  Tasks(Scope),
}

impl StorageKey {
  /// Prefix shared by all task collections, for wiping every scope at once.
  pub const TASKS_PREFIX: &'static str = "tasks:";

  pub fn as_key(&self) -> String {
    match self {
      Self::Session => "session".to_string(),
      Self::Lookup(kind) => format!("lookup:{}", kind.as_str()),
      Self::Tasks(scope) => format!("{}{}", Self::TASKS_PREFIX, scope.past_days()),
    }
  }
}

impl fmt::Display for StorageKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.as_key())
  }
}
