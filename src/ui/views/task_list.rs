use crate::tasks::{Scope, Task};
use crate::ui::renderfns::{date_color, truncate};
use chrono::Local;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

pub fn draw_task_list(
  frame: &mut Frame,
  area: Rect,
  tasks: &[&Task],
  selected: usize,
  scope: Scope,
  loading: bool,
) {
  let title = if loading {
    format!(" Tasks [{}] (loading...) ", scope)
  } else {
    format!(" Tasks [{}] ({}) ", scope, tasks.len())
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  if tasks.is_empty() {
    let content = if loading {
      "Loading tasks..."
    } else {
      "No tasks found. Press 'p' to include past days."
    };
    let paragraph = Paragraph::new(content)
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let today = Local::now().date_naive();
  let items: Vec<ListItem> = tasks
    .iter()
    .map(|task| {
      let date = task.date();
      let workers = task.workers().join(", ");

      let line = Line::from(vec![
        Span::styled(
          format!("{:<11}", date.unwrap_or("no date")),
          Style::default().fg(date_color(date, today)),
        ),
        Span::raw(" "),
        Span::styled(
          format!("{:<28}", truncate(task.text("project_name").unwrap_or("-"), 28)),
          Style::default().fg(Color::Yellow),
        ),
        Span::raw(" "),
        Span::raw(format!("{:<30}", truncate(task.name(), 30))),
        Span::raw(" "),
        Span::styled(
          format!("{:<20}", truncate(&workers, 20)),
          Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(
          truncate(task.text("address_full").unwrap_or(""), 40),
          Style::default().fg(Color::DarkGray),
        ),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut state = ListState::default();
  state.select(Some(selected.min(tasks.len() - 1)));

  frame.render_stateful_widget(list, area, &mut state);
}
