//! Task list synchronizer: stale-while-revalidate loading of the task
//! list for one past-days scope.

mod sync;
mod task;

use std::fmt;

pub use sync::{SyncOutcome, TaskSynchronizer};
pub use task::{Scope, Task};

/// Status indicator shown next to the task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
  /// Nothing cached for this scope; waiting for the backend
  Loading,
  /// Showing `count` cached tasks while fresh data is fetched
  Updating { count: usize },
  /// Fresh data is on screen
  Found { count: usize },
  Error(String),
}

fn plural(count: usize) -> &'static str {
  if count == 1 {
    ""
  } else {
    "s"
  }
}

impl fmt::Display for SyncStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Loading => write!(f, "Loading tasks…"),
      Self::Updating { count } => write!(f, "{} task{} (updating…)", count, plural(*count)),
      Self::Found { count } => write!(f, "{} task{} found.", count, plural(*count)),
      Self::Error(message) => write!(f, "Error: {}", message),
    }
  }
}

/// Trait for whatever displays the task list.
///
/// Every call is tagged with the scope it belongs to so the receiver can
/// drop results for a scope that is no longer selected.
pub trait TaskRenderer: Send + Sync {
  fn render(&self, scope: Scope, tasks: &[Task]);
  fn status(&self, scope: Scope, status: SyncStatus);
}
