use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

pub fn draw_login(frame: &mut Frame, area: Rect) {
  let block = Block::default()
    .title(" Login required ")
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Red));

  let text = vec![
    Line::from(Span::styled(
      "Your session has expired or you are not logged in.",
      Style::default().fg(Color::Yellow).bold(),
    )),
    Line::from(""),
    Line::from("Sign in through the portal, then press 'l' and paste the refresh token"),
    Line::from("it hands out. To start logged in next time, export it instead:"),
    Line::from(Span::styled(
      "  export FIELDSYNC_REFRESH_TOKEN=<token>",
      Style::default().fg(Color::Cyan),
    )),
  ];

  let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
  frame.render_widget(paragraph, area);
}
