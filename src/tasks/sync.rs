use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::task::{Scope, Task};
use super::{SyncStatus, TaskRenderer};
use crate::api::{payload, ApiError, Gateway};
use crate::lookup::LookupCache;
use crate::storage::{self, KeyValueStore, StorageKey};

/// Path one [`TaskSynchronizer::load`] took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
  /// Fresh data was rendered and persisted
  Refreshed {
    count: usize,
    /// Whether resolving lookups changed what was on screen
    changed_by_lookups: bool,
  },
  /// The fetch failed; the cached render stays on screen
  StaleKept,
  /// The fetch failed and there was nothing cached to show
  Failed,
  /// Login navigation has already happened
  SessionExpired,
}

/// Stored shape of one scope's task list. The scope is written alongside
/// the tasks and checked on read.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedTasks {
  past_days: u32,
  tasks: Vec<Task>,
}

/// Keeps the task list for a scope on screen and up to date.
pub struct TaskSynchronizer {
  gateway: Gateway,
  lookups: Arc<LookupCache>,
  store: Arc<dyn KeyValueStore>,
  renderer: Arc<dyn TaskRenderer>,
  endpoint: String,
}

impl TaskSynchronizer {
  pub fn new(
    gateway: Gateway,
    lookups: Arc<LookupCache>,
    store: Arc<dyn KeyValueStore>,
    renderer: Arc<dyn TaskRenderer>,
    endpoint: impl Into<String>,
  ) -> Self {
    Self {
      gateway,
      lookups,
      store,
      renderer,
      endpoint: endpoint.into(),
    }
  }

  /// The collection persisted for exactly this scope, if any.
  pub fn cached(&self, scope: Scope) -> Option<Vec<Task>> {
    let persisted: PersistedTasks = storage::load_json(&*self.store, &StorageKey::Tasks(scope))?;
    if persisted.past_days != scope.past_days() {
      debug!(scope = scope.past_days(), stored = persisted.past_days, "ignoring task list for another scope");
      return None;
    }
    Some(persisted.tasks)
  }

  /// Show cached tasks for `scope` at once, then replace them with fresh
  /// backend data.
  pub async fn load(&self, scope: Scope) -> SyncOutcome {
    let mut on_screen: Option<String> = None;

    let cached = self.cached(scope).filter(|tasks| !tasks.is_empty());
    let had_cache = match cached {
      Some(mut tasks) => {
        self.lookups.enrich_tasks(&mut tasks);
        on_screen = Some(self.show(scope, &tasks));
        self
          .renderer
          .status(scope, SyncStatus::Updating { count: tasks.len() });
        true
      }
      None => {
        self.renderer.status(scope, SyncStatus::Loading);
        false
      }
    };

    let mut tasks = match self.fetch(scope).await {
      Ok(tasks) => tasks,
      Err(ApiError::AuthExpired) => return SyncOutcome::SessionExpired,
      Err(e) => {
        let message = match &e {
          ApiError::Status(status) => format!("HTTP {}", status),
          ApiError::Network(_) => "Network error".to_string(),
          other => other.to_string(),
        };
        warn!(scope = scope.past_days(), error = %e, "task fetch failed");
        self.renderer.status(scope, SyncStatus::Error(message));
        return if had_cache {
          SyncOutcome::StaleKept
        } else {
          SyncOutcome::Failed
        };
      }
    };

    self.lookups.enrich_tasks(&mut tasks);
    let before_lookups = snapshot(&tasks);
    if on_screen.as_ref() != Some(&before_lookups) {
      self.renderer.render(scope, &tasks);
    }

    let report = self.lookups.resolve_for_tasks(&tasks).await;
    if report.session_expired {
      return SyncOutcome::SessionExpired;
    }
    if !report.is_complete() {
      debug!(failed = ?report.failed, "some lookups stay unresolved");
    }
    self.lookups.enrich_tasks(&mut tasks);

    let after_lookups = snapshot(&tasks);
    let changed_by_lookups = after_lookups != before_lookups;
    if changed_by_lookups {
      self.renderer.render(scope, &tasks);
    }

    let count = tasks.len();
    self.renderer.status(scope, SyncStatus::Found { count });
    storage::save_json(
      &*self.store,
      &StorageKey::Tasks(scope),
      &PersistedTasks {
        past_days: scope.past_days(),
        tasks,
      },
    );
    info!(scope = scope.past_days(), count, "task list refreshed");

    SyncOutcome::Refreshed {
      count,
      changed_by_lookups,
    }
  }

  /// Full refresh: forget every cached scope and lookup, then load.
  pub async fn refresh(&self, scope: Scope) -> SyncOutcome {
    self.forget_all();
    self.load(scope).await
  }

  /// Erase every persisted task list and lookup table.
  pub fn forget_all(&self) {
    if let Err(e) = self.store.remove_prefix(StorageKey::TASKS_PREFIX) {
      warn!(error = %e, "failed to erase cached task lists");
    }
    self.lookups.clear();
  }

  async fn fetch(&self, scope: Scope) -> Result<Vec<Task>, ApiError> {
    let past_days = scope.query_value();
    let response = self
      .gateway
      .get(&self.endpoint, &[("past_days", past_days.as_str())])
      .await?
      .error_for_status()?;

    // An unparsable body is an empty list, not a failure
    let body: Value = response.json().unwrap_or_else(|e| {
      warn!(error = %e, "task payload is not JSON, treating as empty");
      Value::Null
    });

    Ok(
      payload::collection(body)
        .into_iter()
        .filter_map(Task::from_value)
        .collect(),
    )
  }

  fn show(&self, scope: Scope, tasks: &[Task]) -> String {
    self.renderer.render(scope, tasks);
    snapshot(tasks)
  }
}

fn snapshot(tasks: &[Task]) -> String {
  serde_json::to_string(tasks).unwrap_or_default()
}
