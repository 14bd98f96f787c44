mod renderfns;
mod views;

use crate::app::{App, Mode, ViewState};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Breadcrumb + sync status
      Constraint::Length(1), // Mode line
    ])
    .split(frame.area());

  renderfns::draw_header(
    frame,
    chunks[0],
    app.title(),
    app.user_name().as_deref(),
    app.scope(),
  );

  if let Some(view) = app.current_view() {
    match view {
      ViewState::TaskList {
        selected, loading, ..
      } => {
        views::task_list::draw_task_list(
          frame,
          chunks[1],
          &app.visible_tasks(),
          *selected,
          app.scope(),
          *loading,
        );
      }
      ViewState::TaskDetail { task } => {
        views::task_detail::draw_task_detail(frame, chunks[1], task, app.is_easykit());
      }
      ViewState::Login => views::login::draw_login(frame, chunks[1]),
    }
  }

  renderfns::draw_footer(frame, chunks[2], &app.view_breadcrumb(), app.status());
  draw_status_bar(frame, chunks[3], app);

  if *app.mode() == Mode::Command {
    renderfns::draw_command_overlay(
      frame,
      chunks[1],
      app.command_input(),
      &app.autocomplete_suggestions(),
      app.selected_suggestion(),
    );
  }
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let (content, style) = match app.mode() {
    Mode::Normal => {
      let hint = match app.current_view() {
        Some(ViewState::Login) => " l:enter refresh token  :command  q:quit",
        Some(ViewState::TaskDetail { .. }) => " r:refresh  q:back  :command",
        _ => " :command  /filter  j/k:nav  Enter:open  p:past days  r:refresh  q:quit",
      };
      let hint = if app.search_filter().is_empty() {
        hint.to_string()
      } else {
        format!(" filter: {}  Esc:clear |{}", app.search_filter(), hint)
      };
      (hint, Style::default().fg(Color::DarkGray))
    }
    Mode::Command => {
      let cmd = format!(":{}", app.command_input());
      (cmd, Style::default().fg(Color::Yellow))
    }
    Mode::Search => {
      let search = format!("/{}", app.search_filter());
      (search, Style::default().fg(Color::Cyan))
    }
    Mode::TokenEntry => {
      let masked = format!(
        " refresh token: {}  Enter:submit  Esc:cancel",
        "*".repeat(app.token_input_len())
      );
      (masked, Style::default().fg(Color::Green))
    }
  };

  let paragraph = Paragraph::new(content).style(style);
  frame.render_widget(paragraph, area);
}
