use crate::tasks::Scope;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, backend, user and the active scope
pub fn draw_header(frame: &mut Frame, area: Rect, title: &str, user: Option<&str>, scope: Scope) {
  let mut spans = vec![
    Span::styled(" fieldsync ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", display_title(title)), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", scope),
      Style::default().fg(Color::Yellow).bold(),
    ),
  ];

  if let Some(user) = user {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(format!(" {} ", user), Style::default().fg(Color::Green)));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

/// Configured titles are shown as-is; a base URL is reduced to its host
fn display_title(title: &str) -> &str {
  match title
    .strip_prefix("https://")
    .or_else(|| title.strip_prefix("http://"))
  {
    Some(rest) => rest.split('/').next().unwrap_or(rest),
    None => title,
  }
}
