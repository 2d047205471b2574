use crate::app::AppContext;
use crate::policy::types::{Policy, BROWSE_CATEGORIES};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{category_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::listing::FilteredListing;
use crate::ui::views::PolicyDetailView;
use crate::ui::components::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs};

/// Browse all policies with category tabs, search and pagination
pub struct PolicyListView {
  ctx: AppContext,
  listing: FilteredListing,
  /// 0 is "All", then one tab per browse category
  tab: usize,
  list_state: ListState,
}

impl PolicyListView {
  pub fn new(ctx: AppContext) -> Self {
    let listing = FilteredListing::new(&ctx);
    Self {
      ctx,
      listing,
      tab: 0,
      list_state: ListState::default(),
    }
  }

  fn tab_count() -> usize {
    BROWSE_CATEGORIES.len() + 1
  }

  fn select_tab(&mut self, tab: usize) {
    self.tab = tab % Self::tab_count();
    let category = match self.tab {
      0 => "",
      n => BROWSE_CATEGORIES[n - 1],
    };
    self.listing.set_category(category);
    self.list_state.select(Some(0));
  }

  fn selected_policy(&self) -> Option<&Policy> {
    self
      .list_state
      .selected()
      .and_then(|i| self.listing.items().get(i))
  }

  fn render_tabs(&self, frame: &mut Frame, area: Rect) {
    let titles: Vec<Line> = std::iter::once("All")
      .chain(BROWSE_CATEGORIES.iter().copied())
      .map(Line::from)
      .collect();
    let tabs = Tabs::new(titles)
      .select(self.tab)
      .block(Block::default().borders(Borders::ALL).title(" Category "))
      .highlight_style(Style::default().fg(Color::Yellow).bold())
      .divider("|");
    frame.render_widget(tabs, area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.listing.items().len();
    ensure_valid_selection(&mut self.list_state, len);

    let block = Block::default()
      .title(self.listing.title("Policies"))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if let Some(error) = self.listing.query().error() {
      let paragraph = Paragraph::new(format!("Error loading policies: {}", error))
        .block(block)
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, area);
      return;
    }

    if len == 0 {
      let content = if self.listing.query().is_loading() {
        "Loading..."
      } else {
        "No policies found."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let width = area.width.saturating_sub(6) as usize;
    let items: Vec<ListItem> = self
      .listing
      .items()
      .iter()
      .map(|policy| ListItem::new(policy_card(policy, width)))
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

fn policy_card(policy: &Policy, width: usize) -> Vec<Line<'static>> {
  vec![
    Line::from(vec![
      Span::styled(truncate(&policy.title, 50), Style::default().bold()),
      Span::raw("  "),
      Span::styled(
        format!("[{}]", policy.category),
        Style::default().fg(category_color(&policy.category)),
      ),
    ]),
    Line::styled(
      format!("  {}", truncate(&policy.description, width.max(20))),
      Style::default().fg(Color::DarkGray),
    ),
  ]
}

impl View for PolicyListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let KeyResult::Handled | KeyResult::Event(_) = self.listing.handle_key(key) {
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab => self.select_tab(self.tab + 1),
      KeyCode::Char('h') | KeyCode::Left | KeyCode::BackTab => {
        self.select_tab(self.tab + Self::tab_count() - 1)
      }
      KeyCode::Char('r') => self.listing.refetch(),
      KeyCode::Char('x') => {
        self.tab = 0;
        self.listing.clear();
      }
      KeyCode::Enter => {
        if let Some(policy) = self.selected_policy() {
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
    let [tabs_area, list_area, pages_area] = Layout::vertical([
      Constraint::Length(3),
      Constraint::Min(0),
      Constraint::Length(1),
    ])
    .areas(area);

    self.render_tabs(frame, tabs_area);
    self.render_list(frame, list_area);
    frame.render_widget(
      Paragraph::new(self.listing.pagination()).alignment(Alignment::Center),
      pages_area,
    );
    self.listing.render_search(frame, list_area);
  }

  fn breadcrumb_label(&self) -> String {
    "Policies".to_string()
  }

  fn tick(&mut self) {
    if self.listing.tick() {
      ensure_valid_selection(&mut self.list_state, self.listing.items().len());
    }
  }

  fn resume(&mut self) {
    self.listing.resume();
  }

  fn captures_input(&self) -> bool {
    self.listing.search_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(15),
      ShortcutInfo::new("h/l", "category").with_priority(20),
      ShortcutInfo::new("n/p", "page").with_priority(25),
      ShortcutInfo::new("enter", "details").with_priority(30),
      ShortcutInfo::new("x", "clear filters")
        .with_priority(40)
        .enabled(self.listing.filters().is_filtered()),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
