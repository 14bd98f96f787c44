use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::api::Navigator;
use crate::tasks::{Scope, SyncOutcome, SyncStatus, Task, TaskRenderer};

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh
  Tick,
  /// Something a background sync reported
  Sync(SyncEvent),
}

/// Reports from spawned loads. Task-list reports carry their scope so the
/// app can drop the ones for a scope that is no longer selected.
#[derive(Debug)]
pub enum SyncEvent {
  Rendered { scope: Scope, tasks: Vec<Task> },
  Status { scope: Scope, status: SyncStatus },
  LoginRequired,
  Finished { scope: Scope, outcome: SyncOutcome },
}

/// Event handler that produces events from terminal input, a tick timer and
/// background syncs
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self { tx, rx }
  }

  /// Start reading the terminal. Call once raw mode is on.
  pub fn start(&self, tick_rate: Duration) {
    let tx = self.tx.clone();

    tokio::task::spawn_blocking(move || loop {
      if event::poll(tick_rate).unwrap_or(false) {
        if let Ok(CrosstermEvent::Key(key)) = event::read() {
          if key.kind == KeyEventKind::Press && tx.send(Event::Key(key)).is_err() {
            break;
          }
        }
      } else if tx.send(Event::Tick).is_err() {
        break;
      }
    });
  }

  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

/// Forwards synchronizer and gateway callbacks into the event loop.
pub struct EventBridge {
  tx: mpsc::UnboundedSender<Event>,
}

impl EventBridge {
  pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
    Self { tx }
  }

  fn send(&self, event: SyncEvent) {
    // The loop is gone when the app is shutting down
    let _ = self.tx.send(Event::Sync(event));
  }
}

impl TaskRenderer for EventBridge {
  fn render(&self, scope: Scope, tasks: &[Task]) {
    self.send(SyncEvent::Rendered {
      scope,
      tasks: tasks.to_vec(),
    });
  }

  fn status(&self, scope: Scope, status: SyncStatus) {
    self.send(SyncEvent::Status { scope, status });
  }
}

impl Navigator for EventBridge {
  fn show_login(&self) {
    self.send(SyncEvent::LoginRequired);
  }
}
