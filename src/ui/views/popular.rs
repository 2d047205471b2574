use crate::app::AppContext;
use crate::policy::types::Policy;
use crate::query::{Query, QueryState};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{category_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::PolicyDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Top six policies by purchase count
pub struct PopularView {
  ctx: AppContext,
  query: Query<(), Vec<Policy>>,
  list_state: ListState,
}

impl PopularView {
  pub fn new(ctx: AppContext) -> Self {
    let policies = ctx.policies.clone();
    let mut query = Query::new(move |_: ()| {
      let policies = policies.clone();
      async move { policies.popular_policies().await }
    })
    .with_stale_time(ctx.listing.stale_time().to_std().unwrap_or_default())
    .with_invalidation(ctx.policies.watch_pages());
    query.set_key(());

    Self {
      ctx,
      query,
      list_state: ListState::default(),
    }
  }

  fn policies(&self) -> &[Policy] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.policies().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.state() {
      QueryState::Loading => " Most Popular Policies (loading...) ".to_string(),
      _ => " Most Popular Policies ".to_string(),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Magenta));

    if let Some(error) = self.query.error() {
      let paragraph = Paragraph::new(format!("Error loading policies: {}", error))
        .block(block)
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, area);
      return;
    }

    if len == 0 {
      let content = if self.query.is_loading() {
        "Loading..."
      } else {
        "No policies available at the moment."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .policies()
      .iter()
      .enumerate()
      .map(|(rank, policy)| ListItem::new(popular_card(rank + 1, policy)))
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

fn purchases_label(count: u64) -> String {
  if count == 1 {
    "1 purchase".to_string()
  } else {
    format!("{} purchases", count)
  }
}

fn popular_card(rank: usize, policy: &Policy) -> Vec<Line<'static>> {
  let terms = if policy.duration_options.is_empty() {
    "N/A".to_string()
  } else {
    policy
      .duration_options
      .iter()
      .map(|d| d.to_string())
      .collect::<Vec<_>>()
      .join(", ")
  };
  vec![
    Line::from(vec![
      Span::styled(format!("#{} ", rank), Style::default().fg(Color::Magenta).bold()),
      Span::styled(truncate(&policy.title, 50), Style::default().bold()),
      Span::raw("  "),
      Span::styled(
        policy.category.clone(),
        Style::default().fg(category_color(&policy.category)),
      ),
    ]),
    Line::from(vec![
      Span::styled("   Coverage: ", Style::default().fg(Color::DarkGray)),
      Span::raw(policy.coverage_range.clone()),
      Span::styled("  Term Options: ", Style::default().fg(Color::DarkGray)),
      Span::raw(format!("{} years", terms)),
      Span::styled("  Popularity: ", Style::default().fg(Color::DarkGray)),
      Span::styled(
        purchases_label(policy.popularity()),
        Style::default().fg(Color::Magenta),
      ),
    ]),
  ]
}

impl View for PopularView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Enter => {
        let selected = self
          .list_state
          .selected()
          .and_then(|i| self.policies().get(i));
        if let Some(policy) = selected {
          return ViewAction::Push(Box::new(PolicyDetailView::new(
            &self.ctx,
            policy.id.clone(),
            policy.title.clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Popular".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn resume(&mut self) {
    self.query.refresh_if_stale();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("enter", "details").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(30),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
