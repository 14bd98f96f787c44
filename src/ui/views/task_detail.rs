use crate::tasks::Task;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use serde_json::Value;

/// Fields shown below the header, in order
const DETAIL_FIELDS: &[(&str, &str)] = &[
  ("Date", "date"),
  ("Order", "order_number"),
  ("Address", "address_full"),
  ("Project leader", "project_leader"),
  ("Phone", "partner_phone"),
];

pub fn draw_task_detail(frame: &mut Frame, area: Rect, task: &Task, easykit: bool) {
  let block = Block::default()
    .title(format!(" {} ", task.name()))
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let inner = block.inner(area);
  frame.render_widget(block, area);

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(2), // Heading
      Constraint::Length(DETAIL_FIELDS.len() as u16 + 1),
      Constraint::Min(1), // Description
    ])
    .split(inner);

  let (heading, subheading) = headings(task, easykit);
  let heading = vec![
    Line::from(Span::styled(heading, Style::default().fg(Color::Yellow).bold())),
    Line::from(Span::styled(subheading, Style::default().fg(Color::DarkGray))),
  ];
  frame.render_widget(Paragraph::new(heading), chunks[0]);

  let mut lines: Vec<Line> = DETAIL_FIELDS
    .iter()
    .filter_map(|(label, field)| {
      let value = match *field {
        "date" => task.date().map(str::to_string),
        other => field_text(task, other),
      }?;
      Some(Line::from(vec![
        Span::styled(format!("{:<16}", label), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
      ]))
    })
    .collect();

  let workers = task.workers();
  if !workers.is_empty() {
    lines.push(Line::from(vec![
      Span::styled(format!("{:<16}", "Workers"), Style::default().fg(Color::DarkGray)),
      Span::styled(workers.join(", "), Style::default().fg(Color::Cyan)),
    ]));
  }
  frame.render_widget(Paragraph::new(lines), chunks[1]);

  let description = task
    .text("description")
    .unwrap_or("No description");
  let description = Paragraph::new(description).wrap(Wrap { trim: true });
  frame.render_widget(description, chunks[2]);
}

/// Easykit crews navigate by task; everyone else by project.
fn headings(task: &Task, easykit: bool) -> (String, String) {
  let name = task.name().to_string();
  let project = task.text("project_name").unwrap_or_default().to_string();

  if easykit {
    (name, project)
  } else {
    let subheading = match task.text("order_number") {
      Some(order) => format!("{} • {}", name, order),
      None => name,
    };
    (project, subheading)
  }
}

/// Text for a scalar field; Odoo `[id, "label"]` pairs show their label.
fn field_text(task: &Task, field: &str) -> Option<String> {
  match task.get(field)? {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Array(pair) if pair.len() == 2 => pair[1].as_str().map(str::to_string),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_headings_depend_on_role() {
    let task = Task::from_value(json!({
      "name": "Install",
      "project_name": "Renovatie Dewitte",
      "order_number": "S00012",
    }))
    .unwrap();

    assert_eq!(
      headings(&task, false),
      ("Renovatie Dewitte".to_string(), "Install • S00012".to_string())
    );
    assert_eq!(
      headings(&task, true),
      ("Install".to_string(), "Renovatie Dewitte".to_string())
    );
  }

  #[test]
  fn test_field_text_shapes() {
    let task = Task::from_value(json!({
      "project_leader": [4, "An Claes"],
      "partner_phone": false,
      "order_number": 12,
    }))
    .unwrap();

    assert_eq!(field_text(&task, "project_leader").as_deref(), Some("An Claes"));
    assert_eq!(field_text(&task, "partner_phone"), None);
    assert_eq!(field_text(&task, "order_number").as_deref(), Some("12"));
  }
}
