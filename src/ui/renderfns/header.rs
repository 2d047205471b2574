use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::view::ShortcutInfo;

/// Draw the header bar: app name, service title and the view's shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, title: &str, shortcuts: &[ShortcutInfo]) {
  let mut spans = vec![
    Span::styled(" takaful ", Style::default().fg(Color::Green).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::raw(" "),
  ];

  let mut sorted: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  sorted.sort_by_key(|s| s.priority);
  for shortcut in sorted {
    spans.extend(shortcut_spans(shortcut));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// `<key> label`, dimmed when the action is unavailable
fn shortcut_spans(shortcut: &ShortcutInfo) -> [Span<'static>; 3] {
  let (key_color, label_color) = if shortcut.enabled {
    (Color::Cyan, Color::DarkGray)
  } else {
    (Color::DarkGray, Color::Black)
  };
  [
    Span::styled(format!("<{}>", shortcut.key), Style::default().fg(key_color)),
    Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(label_color).add_modifier(if shortcut.enabled {
        Modifier::empty()
      } else {
        Modifier::CROSSED_OUT
      }),
    ),
    Span::raw("   "),
  ]
}
