use ratatui::prelude::*;

/// Truncate to at most `max_len` characters, ending in "..." if cut
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    return s.to_string();
  }
  let keep = max_len.saturating_sub(3);
  let mut out: String = s.chars().take(keep).collect();
  out.push_str("...");
  out
}

/// Badge color for a policy category
pub fn category_color(category: &str) -> Color {
  match category {
    "Health" | "Disability" => Color::Green,
    "Family" | "Education" => Color::Cyan,
    "Senior" | "Pilgrimage" => Color::Magenta,
    "Travel" => Color::Yellow,
    "Term" | "Term Life" => Color::Blue,
    _ => Color::White,
  }
}

/// Base premium rate as a percentage, e.g. 0.0003 -> "0.0300%"
pub fn format_rate(rate: f64) -> String {
  format!("{:.4}%", rate * 100.0)
}

/// Page buttons `1 2 [3] 4`, or nothing when there is a single page
pub fn pagination_line(page: u32, total_pages: u32) -> Line<'static> {
  if total_pages <= 1 {
    return Line::default();
  }
  let mut spans = vec![Span::styled("Page ", Style::default().fg(Color::DarkGray))];
  for p in 1..=total_pages {
    if p == page {
      spans.push(Span::styled(
        format!("[{}]", p),
        Style::default().fg(Color::Green).bold(),
      ));
    } else {
      spans.push(Span::raw(format!(" {} ", p)));
    }
  }
  spans.push(Span::styled(
    "   <n>/<p> next/prev",
    Style::default().fg(Color::DarkGray),
  ));
  Line::from(spans)
}
