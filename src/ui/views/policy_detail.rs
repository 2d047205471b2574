use crate::app::AppContext;
use crate::policy::types::Policy;
use crate::query::{Query, QueryState};
use crate::ui::renderfns::{category_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Full record of one policy
pub struct PolicyDetailView {
  title: String,
  query: Query<String, Policy>,
  scroll: u16,
}

impl PolicyDetailView {
  /// `title` labels the breadcrumb until the record arrives
  pub fn new(ctx: &AppContext, id: String, title: String) -> Self {
    let policies = ctx.policies.clone();
    let mut query = Query::new(move |id: String| {
      let policies = policies.clone();
      async move { policies.get_policy(&id).await }
    })
    .with_stale_time(ctx.listing.stale_time().to_std().unwrap_or_default())
    .with_invalidation(ctx.policies.watch_details());
    query.set_key(id);

    Self {
      title,
      query,
      scroll: 0,
    }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Loading => format!(" {} (loading...) ", self.title),
      _ => format!(" {} ", self.title),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Green));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(error) = self.query.error() {
      let paragraph = Paragraph::new(format!(
        "Error loading policy details. Please try again.\n\n{}\n\nPress 'r' to retry.",
        error
      ))
      .style(Style::default().fg(Color::Red))
      .wrap(Wrap { trim: true });
      frame.render_widget(paragraph, inner);
      return;
    }

    let Some(policy) = self.query.data() else {
      let paragraph =
        Paragraph::new("Loading policy details...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    };

    let paragraph = Paragraph::new(detail_lines(policy))
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, inner);
  }
}

fn section(label: &str) -> Line<'static> {
  Line::styled(label.to_string(), Style::default().fg(Color::Green).bold())
}

fn field(label: &str, value: String) -> Line<'static> {
  Line::from(vec![
    Span::styled(format!("{:<16}", label), Style::default().fg(Color::DarkGray)),
    Span::raw(value),
  ])
}

fn detail_lines(policy: &Policy) -> Vec<Line<'static>> {
  let durations = if policy.duration_options.is_empty() {
    "N/A".to_string()
  } else {
    policy
      .duration_options
      .iter()
      .map(|d| d.to_string())
      .collect::<Vec<_>>()
      .join(", ")
  };
  let image = policy
    .image_url()
    .map(|url| truncate(url, 80))
    .unwrap_or_else(|| "[no image]".to_string());

  let mut lines = vec![
    Line::from(Span::styled(
      format!(" {} ", policy.category),
      Style::default().fg(Color::Black).bg(category_color(&policy.category)),
    )),
    Line::raw(""),
    Line::raw(policy.description.clone()),
    Line::raw(""),
    section("Eligibility"),
    Line::raw(policy.eligibility.clone()),
    Line::raw(""),
    section("Policy Details"),
    field("Age Range", format!("{} to {} years", policy.min_age, policy.max_age)),
    field("Coverage", policy.coverage_range.clone()),
    field("Duration", durations),
    field("Base Rate", policy.base_premium_rate.to_string()),
    field("Image", image),
    Line::raw(""),
    section("Benefits"),
  ];
  lines.extend(
    policy
      .benefits
      .iter()
      .map(|b| Line::from(vec![Span::styled("  • ", Style::default().fg(Color::Green)), Span::raw(b.clone())])),
  );
  lines.extend([
    Line::raw(""),
    section("Premium Calculation"),
    Line::raw(policy.premium_logic_note.clone()),
  ]);
  lines
}

impl View for PolicyDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.query.data() {
      Some(policy) if !policy.title.is_empty() => policy.title.clone(),
      _ => self.title.clone(),
    }
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn resume(&mut self) {
    self.query.refresh_if_stale();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "scroll").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(30),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_detail_lines_handle_missing_fields() {
    let policy: Policy = serde_json::from_value(serde_json::json!({
      "_id": "p1",
      "title": "Bare",
      "benefits": ["One", "Two"]
    }))
    .unwrap();

    let text: Vec<String> = detail_lines(&policy)
      .iter()
      .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
      .collect();

    assert!(text.iter().any(|l| l.contains("[no image]")));
    assert!(text.iter().any(|l| l.contains("N/A")));
    assert_eq!(text.iter().filter(|l| l.contains("• ")).count(), 2);
  }
}
