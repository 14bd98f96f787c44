use crate::api::{Gateway, HttpTransport};
use crate::auth::{Authenticator, OidcRefresher, SessionGuard};
use crate::commands::{self, Command, CommandKind};
use crate::config::Config;
use crate::event::{Event, EventBridge, EventHandler, SyncEvent};
use crate::lookup::LookupCache;
use crate::storage::KeyValueStore;
use crate::tasks::{Scope, SyncStatus, Task, TaskSynchronizer};
use crate::ui;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Role whose detail view leads with the task name instead of the project.
const EASYKIT_ROLE: &str = "easykit";

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
  Search,
  /// Typing a refresh token on the login screen
  TokenEntry,
}

/// View state - each variant owns its data
#[derive(Debug)]
pub enum ViewState {
  /// Root view
  TaskList {
    tasks: Vec<Task>,
    selected: usize,
    loading: bool,
  },

  /// Pushed via Enter
  TaskDetail { task: Box<Task> },

  /// Replaces the whole stack when the session cannot be recovered
  Login,
}

impl ViewState {
  fn empty_list() -> Self {
    ViewState::TaskList {
      tasks: Vec::new(),
      selected: 0,
      loading: true,
    }
  }
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<ViewState>,

  /// Current input mode
  mode: Mode,

  /// Command input buffer (after pressing :)
  command_input: String,

  /// Task filter (after pressing /)
  search_filter: String,

  /// Refresh token being typed on the login screen
  token_input: String,

  /// Selected autocomplete suggestion index
  selected_suggestion: usize,

  /// Past-days scope currently on screen
  scope: Scope,

  /// Last status reported for `scope`
  status: Option<SyncStatus>,

  config: Config,
  guard: Arc<SessionGuard>,
  sync: Arc<TaskSynchronizer>,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  /// Wire the session guard, gateway, lookup cache and synchronizer
  /// together. Background results come back through `events`.
  pub fn new(config: Config, store: Arc<dyn KeyValueStore>, events: &EventHandler) -> Result<Self> {
    let bridge = Arc::new(EventBridge::new(events.sender()));

    let refresher = Arc::new(OidcRefresher::new(&config.auth)?);
    let guard = Arc::new(SessionGuard::new(
      refresher,
      store.clone(),
      config.auth.expiry_skew(),
    ));
    if let Some(token) = Config::refresh_token() {
      guard.begin_with_refresh_token(token);
    }

    let gateway = Gateway::new(
      config.api.base_url.clone(),
      guard.clone(),
      Arc::new(HttpTransport::new()?),
      bridge.clone(),
    );
    let lookups = Arc::new(LookupCache::new(
      gateway.clone(),
      store.clone(),
      &config.api.lookups,
    ));
    let sync = Arc::new(TaskSynchronizer::new(
      gateway,
      lookups,
      store,
      bridge,
      config.api.tasks_endpoint.clone(),
    ));

    let root = if guard.is_authenticated() {
      ViewState::empty_list()
    } else {
      ViewState::Login
    };

    Ok(Self {
      view_stack: vec![root],
      mode: Mode::Normal,
      command_input: String::new(),
      search_filter: String::new(),
      token_input: String::new(),
      selected_suggestion: 0,
      scope: Scope::new(config.default_past_days),
      status: None,
      config,
      guard,
      sync,
      event_tx: events.sender(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self, mut events: EventHandler) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    events.start(Duration::from_millis(250));

    if matches!(self.view_stack.first(), Some(ViewState::TaskList { .. })) {
      self.spawn_load(false);
    }

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  /// Load (or fully refresh) the current scope in the background.
  fn spawn_load(&self, full_refresh: bool) {
    let sync = self.sync.clone();
    let scope = self.scope;
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let outcome = if full_refresh {
        sync.refresh(scope).await
      } else {
        sync.load(scope).await
      };
      let _ = tx.send(Event::Sync(SyncEvent::Finished { scope, outcome }));
    });
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {} // UI refresh happens automatically
      Event::Sync(sync_event) => self.handle_sync_event(sync_event),
    }
  }

  fn handle_sync_event(&mut self, event: SyncEvent) {
    match event {
      SyncEvent::Rendered { scope, mut tasks } => {
        if scope != self.scope {
          debug!(scope = scope.past_days(), "dropping render for inactive scope");
          return;
        }
        order_for_role(&mut tasks, self.is_easykit());
        if let Some(ViewState::TaskList {
          tasks: list,
          selected,
          ..
        }) = self.view_stack.first_mut()
        {
          *list = tasks;
          *selected = (*selected).min(list.len().saturating_sub(1));
        }
      }
      SyncEvent::Status { scope, status } => {
        // A load that outlived its session must not write onto the login screen
        if scope != self.scope || matches!(self.view_stack.first(), Some(ViewState::Login)) {
          return;
        }
        if let Some(ViewState::TaskList { loading, .. }) = self.view_stack.first_mut() {
          *loading = matches!(status, SyncStatus::Loading | SyncStatus::Updating { .. });
        }
        self.status = Some(status);
      }
      SyncEvent::LoginRequired => self.show_login(),
      SyncEvent::Finished { scope, outcome } => {
        debug!(scope = scope.past_days(), ?outcome, "sync finished");
        if scope == self.scope {
          if let Some(ViewState::TaskList { loading, .. }) = self.view_stack.first_mut() {
            *loading = false;
          }
        }
      }
    }
  }

  fn show_login(&mut self) {
    self.view_stack = vec![ViewState::Login];
    self.status = None;
    self.mode = Mode::Normal;
  }

  /// Back to the task list for the current scope.
  fn show_tasks(&mut self, full_refresh: bool) {
    if !self.guard.is_authenticated() {
      self.show_login();
      return;
    }
    self.view_stack = vec![ViewState::empty_list()];
    self.status = None;
    self.spawn_load(full_refresh);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Command => self.handle_command_mode_key(key),
      Mode::Search => self.handle_search_mode_key(key),
      Mode::TokenEntry => self.handle_token_entry_key(key),
    }
  }

  fn handle_normal_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      // Quit
      KeyCode::Char('q') => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }

      // Navigation
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
      KeyCode::Enter => self.enter_selected(),
      KeyCode::Esc => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.search_filter.clear();
        }
      }

      // Sync
      KeyCode::Char('p') if self.on_task_list() => {
        self.scope = self.scope.next_preset();
        info!(scope = self.scope.past_days(), "switching scope");
        self.show_tasks(false);
      }
      KeyCode::Char('r') if !self.on_login() => self.show_tasks(true),
      KeyCode::Char('l') if self.on_login() => {
        self.mode = Mode::TokenEntry;
        self.token_input.clear();
      }

      // Mode switches
      KeyCode::Char(':') => {
        self.mode = Mode::Command;
        self.command_input.clear();
      }
      KeyCode::Char('/') if self.on_task_list() => {
        self.mode = Mode::Search;
        self.search_filter.clear();
      }

      _ => {}
    }
  }

  fn handle_command_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command();
        if self.mode == Mode::Command {
          self.mode = Mode::Normal;
        }
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0;
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0;
      }
      _ => {}
    }
  }

  fn handle_search_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.search_filter.clear();
      }
      KeyCode::Enter => {
        // Keep the filter applied
        self.mode = Mode::Normal;
      }
      KeyCode::Backspace => {
        self.search_filter.pop();
      }
      KeyCode::Char(c) => {
        self.search_filter.push(c);
      }
      _ => {}
    }
    self.reset_selection();
  }

  fn execute_command(&mut self) {
    let suggestions = commands::get_suggestions(&self.command_input);
    let kind = suggestions
      .get(self.selected_suggestion)
      .map(|cmd| cmd.kind)
      .or_else(|| commands::resolve(&self.command_input));
    self.command_input.clear();

    match kind {
      Some(CommandKind::Tasks) => self.show_tasks(false),
      Some(CommandKind::Refresh) => self.show_tasks(true),
      Some(CommandKind::Logout) => {
        info!("logging out");
        sign_out(&*self.guard, &self.sync);
        self.show_login();
      }
      Some(CommandKind::Quit) => self.should_quit = true,
      None => {}
    }
  }

  fn handle_token_entry_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.token_input.clear();
      }
      KeyCode::Enter => {
        self.mode = Mode::Normal;
        let token = std::mem::take(&mut self.token_input);
        let token = token.trim();
        if !token.is_empty() {
          self.guard.begin_with_refresh_token(token);
          self.show_tasks(false);
        }
      }
      KeyCode::Backspace => {
        self.token_input.pop();
      }
      KeyCode::Char(c) => {
        self.token_input.push(c);
      }
      _ => {}
    }
  }

  fn on_task_list(&self) -> bool {
    matches!(self.view_stack.last(), Some(ViewState::TaskList { .. }))
  }

  fn on_login(&self) -> bool {
    matches!(self.view_stack.last(), Some(ViewState::Login))
  }

  fn reset_selection(&mut self) {
    if let Some(ViewState::TaskList { selected, .. }) = self.view_stack.first_mut() {
      *selected = 0;
    }
  }

  fn move_selection(&mut self, delta: i32) {
    let len = self.visible_tasks().len();
    if let Some(ViewState::TaskList { selected, .. }) = self.view_stack.last_mut() {
      if len > 0 {
        *selected = (*selected as i32 + delta).rem_euclid(len as i32) as usize;
      }
    }
  }

  fn enter_selected(&mut self) {
    let Some(ViewState::TaskList { selected, .. }) = self.view_stack.last() else {
      return;
    };
    let task = self
      .visible_tasks()
      .get(*selected)
      .map(|task| Box::new((*task).clone()));
    if let Some(task) = task {
      self.view_stack.push(ViewState::TaskDetail { task });
    }
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&ViewState> {
    self.view_stack.last()
  }

  /// Root task list after the `/` filter.
  pub fn visible_tasks(&self) -> Vec<&Task> {
    match self.view_stack.first() {
      Some(ViewState::TaskList { tasks, .. }) => tasks
        .iter()
        .filter(|task| matches_filter(task, &self.search_filter))
        .collect(),
      _ => Vec::new(),
    }
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn search_filter(&self) -> &str {
    &self.search_filter
  }

  /// Length of the token typed so far; the token itself is never drawn.
  pub fn token_input_len(&self) -> usize {
    self.token_input.chars().count()
  }

  pub fn title(&self) -> &str {
    self
      .config
      .title
      .as_deref()
      .unwrap_or(&self.config.api.base_url)
  }

  pub fn user_name(&self) -> Option<String> {
    self.guard.user().and_then(|claims| claims.name)
  }

  pub fn is_easykit(&self) -> bool {
    self.guard.has_role(EASYKIT_ROLE)
  }

  pub fn scope(&self) -> Scope {
    self.scope
  }

  pub fn status(&self) -> Option<&SyncStatus> {
    self.status.as_ref()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.command_input)
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }
}

impl ViewState {
  /// Get the label for this view in the breadcrumb
  fn breadcrumb_label(&self) -> String {
    match self {
      ViewState::TaskList { .. } => "Tasks".to_string(),
      ViewState::TaskDetail { task } => task.name().to_string(),
      ViewState::Login => "Login".to_string(),
    }
  }
}

/// Forget the session along with every cached task list and lookup, so the
/// next login starts from nothing.
fn sign_out(auth: &dyn Authenticator, sync: &TaskSynchronizer) {
  auth.clear_session();
  sync.forget_all();
}

/// Easykit crews work through tasks in planning order; everyone else
/// sees them by date.
fn order_for_role(tasks: &mut [Task], easykit: bool) {
  if !easykit {
    sort_by_date(tasks);
  }
}

/// Order by scheduled date; undated tasks go last, ties keep backend order.
fn sort_by_date(tasks: &mut [Task]) {
  tasks.sort_by(|a, b| match (a.date(), b.date()) {
    (Some(a), Some(b)) => a.cmp(b),
    (Some(_), None) => std::cmp::Ordering::Less,
    (None, Some(_)) => std::cmp::Ordering::Greater,
    (None, None) => std::cmp::Ordering::Equal,
  });
}

/// Case-insensitive match on the fields shown in the list.
fn matches_filter(task: &Task, filter: &str) -> bool {
  let needle = filter.trim().to_lowercase();
  if needle.is_empty() {
    return true;
  }

  [
    Some(task.name()),
    task.text("project_name"),
    task.text("address_full"),
  ]
  .into_iter()
  .flatten()
  .chain(task.workers())
  .any(|text| text.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::LookupEndpoints;
  use crate::lookup::LookupKind;
  use crate::storage::{self, MemoryStore, StorageKey};
  use crate::testing::{gateway_with, FakeAuth, FakeTransport, RecordingRenderer};
  use serde_json::{json, Value};

  fn task(value: Value) -> Task {
    Task::from_value(value).unwrap()
  }

  #[test]
  fn test_sort_by_date_keeps_undated_last() {
    let mut tasks = vec![
      task(json!({"id": 1})),
      task(json!({"id": 2, "date": "2026-03-05 08:00:00"})),
      task(json!({"id": 3, "planned_date_begin": "2026-03-02 07:00:00"})),
      task(json!({"id": 4, "date": "2026-03-05"})),
    ];

    sort_by_date(&mut tasks);

    let ids: Vec<u64> = tasks.iter().filter_map(Task::id).collect();
    assert_eq!(ids, vec![3, 2, 4, 1]);
  }

  #[test]
  fn test_filter_matches_visible_fields() {
    let t = task(json!({
      "name": "Install heat pump",
      "project_name": "Renovatie Dewitte",
      "workers": ["Jan Peeters"],
    }));

    assert!(matches_filter(&t, ""));
    assert!(matches_filter(&t, "HEAT"));
    assert!(matches_filter(&t, "dewitte"));
    assert!(matches_filter(&t, "peeters"));
    assert!(!matches_filter(&t, "gent"));
  }

  #[test]
  fn test_easykit_keeps_planning_order() {
    let planned = || {
      vec![
        task(json!({"id": 1, "date": "2026-03-05"})),
        task(json!({"id": 2, "date": "2026-03-02"})),
      ]
    };

    let mut tasks = planned();
    order_for_role(&mut tasks, true);
    let ids: Vec<u64> = tasks.iter().filter_map(Task::id).collect();
    assert_eq!(ids, vec![1, 2]);

    let mut tasks = planned();
    order_for_role(&mut tasks, false);
    let ids: Vec<u64> = tasks.iter().filter_map(Task::id).collect();
    assert_eq!(ids, vec![2, 1]);
  }

  #[test]
  fn test_sign_out_forgets_cached_tasks_and_lookups() {
    let store = Arc::new(MemoryStore::new());
    for days in [0, 30] {
      storage::save_json(
        &*store,
        &StorageKey::Tasks(Scope::new(days)),
        &json!({"past_days": days, "tasks": [{"id": 1, "name": "Install"}]}),
      );
    }
    storage::save_json(
      &*store,
      &StorageKey::Lookup(LookupKind::Installer),
      &json!({"7": {"id": 7, "name": "Jan"}}),
    );

    let auth = Arc::new(FakeAuth::valid());
    let gateway = gateway_with(auth.clone(), Arc::new(FakeTransport::new()));
    let lookups = Arc::new(LookupCache::new(
      gateway.clone(),
      store.clone(),
      &LookupEndpoints::default(),
    ));
    let sync = TaskSynchronizer::new(
      gateway,
      lookups.clone(),
      store.clone(),
      Arc::new(RecordingRenderer::default()),
      "/tasks/tasks-quick",
    );
    assert!(sync.cached(Scope::new(0)).is_some());

    sign_out(&*auth, &sync);

    assert_eq!(auth.clears(), 1);
    assert!(sync.cached(Scope::new(0)).is_none());
    assert!(sync.cached(Scope::new(30)).is_none());
    assert!(lookups.installer(7).is_none());
    assert!(store
      .get(&StorageKey::Lookup(LookupKind::Installer))
      .unwrap()
      .is_none());
  }
}
