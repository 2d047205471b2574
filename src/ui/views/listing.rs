use crate::app::AppContext;
use crate::filters::{total_pages, PolicyFilters};
use crate::policy::types::{Policy, PolicyPage, PolicyQuery};
use crate::query::Query;
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::renderfns::pagination_line;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use tracing::debug;

/// Filtered, paginated read of the policy collection shared by the browse
/// and admin views: filter state, the page query and the search box.
pub struct FilteredListing {
  filters: PolicyFilters,
  query: Query<PolicyQuery, PolicyPage>,
  search: SearchInput,
}

impl FilteredListing {
  pub fn new(ctx: &AppContext) -> Self {
    let filters = PolicyFilters::new(ctx.listing.items_per_page, ctx.listing.debounce());
    let policies = ctx.policies.clone();
    let mut query = Query::new(move |q: PolicyQuery| {
      let policies = policies.clone();
      async move { policies.list_policies(&q).await }
    })
    .with_stale_time(ctx.listing.stale_time().to_std().unwrap_or_default())
    .with_invalidation(ctx.policies.watch_pages());
    query.set_key(filters.query());

    Self {
      filters,
      query,
      search: SearchInput::new(),
    }
  }

  fn sync(&mut self) {
    self.query.set_key(self.filters.query());
  }

  pub fn query(&self) -> &Query<PolicyQuery, PolicyPage> {
    &self.query
  }

  pub fn filters(&self) -> &PolicyFilters {
    &self.filters
  }

  /// Records of the current page; the previous page while the next loads
  pub fn items(&self) -> &[Policy] {
    self.query.data().map(|p| p.items.as_slice()).unwrap_or(&[])
  }

  pub fn total(&self) -> u64 {
    self.query.data().map(|p| p.total).unwrap_or(0)
  }

  pub fn total_pages(&self) -> u32 {
    total_pages(self.total(), self.filters.per_page())
  }

  pub fn search_active(&self) -> bool {
    self.search.is_active()
  }

  pub fn set_category(&mut self, category: &str) {
    self.filters.set_category(category);
    self.sync();
  }

  pub fn clear(&mut self) {
    self.filters.clear();
    self.search.clear();
    self.sync();
  }

  pub fn clear_search(&mut self) {
    self.filters.clear_search();
    self.search.clear();
    self.sync();
  }

  pub fn refetch(&mut self) {
    self.query.refetch();
  }

  pub fn resume(&mut self) {
    self.query.refresh_if_stale();
  }

  /// Search box first, then page navigation (`n`/`p`, digits)
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<()> {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(text)) => {
        self.filters.set_search_text(text);
        return KeyResult::Handled;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return KeyResult::Handled,
      KeyResult::NotHandled => {}
    }

    let total = self.total();
    match key.code {
      KeyCode::Char('n') | KeyCode::PageDown => self.filters.next_page(total),
      KeyCode::Char('p') | KeyCode::PageUp => self.filters.prev_page(total),
      KeyCode::Char(c @ '1'..='9') => {
        self.filters.go_to_page(c.to_digit(10).unwrap_or(1), total);
      }
      _ => return KeyResult::NotHandled,
    }
    self.sync();
    KeyResult::Handled
  }

  /// Apply a settled search and collect query results. Returns `true` when
  /// something changed.
  ///
  /// A result whose total no longer reaches the current page (the last
  /// record of the last page was deleted) moves back to the last page.
  pub fn tick(&mut self) -> bool {
    let mut changed = false;
    if self.filters.poll() {
      self.sync();
      changed = true;
    }
    if self.query.poll() {
      changed = true;
      if self.query.is_success() && self.filters.fit_to(self.total()) {
        debug!(page = self.filters.page(), total = self.total(), "page past the end");
        self.sync();
      }
    }
    changed
  }

  /// `" {label} ({total}) "` plus loading and filter hints
  pub fn title(&self, label: &str) -> String {
    let mut title = format!(" {} ({})", label, self.total());
    if !self.filters.category().is_empty() {
      title.push_str(&format!(" [{}]", self.filters.category()));
    }
    if !self.filters.applied_search().is_empty() {
      title.push_str(&format!(" /{}", self.filters.applied_search()));
    }
    if self.query.is_placeholder() {
      title.push_str(" (refreshing...)");
    } else if self.query.is_loading() {
      title.push_str(" (loading...)");
    }
    title.push(' ');
    title
  }

  pub fn pagination(&self) -> Line<'static> {
    pagination_line(self.filters.page(), self.total_pages())
  }

  pub fn render_search(&self, frame: &mut Frame, area: Rect) {
    self
      .search
      .render_overlay(frame, area, self.filters.search_pending());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ListingConfig;
  use crate::policy::client::PolicyClient;
  use crate::policy::upload::HostedImageUploader;
  use crossterm::event::KeyModifiers;
  use httpmock::prelude::*;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn context(server: &MockServer) -> AppContext {
    let client = PolicyClient::with_base_url(&server.base_url(), None).unwrap();
    let uploader = HostedImageUploader::with_endpoint(&server.url("/upload"), None);
    let listing = ListingConfig {
      items_per_page: 9,
      search_debounce_ms: 40,
      stale_minutes: 5,
    };
    AppContext::from_parts(client, Arc::new(uploader), listing)
  }

  async fn settle(listing: &mut FilteredListing) {
    for _ in 0..20 {
      tokio::time::sleep(Duration::from_millis(20)).await;
      listing.tick();
    }
  }

  #[tokio::test]
  async fn test_typing_burst_reads_once() {
    let server = MockServer::start();
    // Most specific mock first
    let searched = server.mock(|when, then| {
      when
        .method(GET)
        .path("/policies")
        .query_param("search", "health");
      then
        .status(200)
        .json_body(json!({"policies": [{"_id": "h"}], "total": 1}));
    });
    let unfiltered = server.mock(|when, then| {
      when.method(GET).path("/policies").query_param("page", "1");
      then
        .status(200)
        .json_body(json!({"policies": [{"_id": "a"}], "total": 1}));
    });

    let mut listing = FilteredListing::new(&context(&server));
    settle(&mut listing).await;
    assert_eq!(listing.items()[0].id, "a");

    listing.handle_key(key(KeyCode::Char('/')));
    for c in "health".chars() {
      listing.handle_key(key(KeyCode::Char(c)));
      listing.tick();
    }
    settle(&mut listing).await;

    assert_eq!(listing.items()[0].id, "h");
    searched.assert_hits(1);
    assert!(unfiltered.hits() >= 1);
  }

  #[tokio::test]
  async fn test_pages_follow_total() {
    let server = MockServer::start();
    server.mock(|when, then| {
      when.method(GET).path("/policies").query_param("page", "1");
      then.status(200).json_body(json!({
        "policies": (0..9).map(|i| json!({"_id": format!("p{i}")})).collect::<Vec<_>>(),
        "total": 12
      }));
    });
    let second = server.mock(|when, then| {
      when.method(GET).path("/policies").query_param("page", "2");
      then.status(200).json_body(json!({
        "policies": (9..12).map(|i| json!({"_id": format!("p{i}")})).collect::<Vec<_>>(),
        "total": 12
      }));
    });

    let mut listing = FilteredListing::new(&context(&server));
    settle(&mut listing).await;
    assert_eq!(listing.total_pages(), 2);
    assert_eq!(listing.items().len(), 9);

    listing.handle_key(key(KeyCode::Char('n')));
    // Previous page stays visible while the next one loads
    assert_eq!(listing.items().len(), 9);
    settle(&mut listing).await;
    assert_eq!(listing.items().len(), 3);

    // Already on the last page
    listing.handle_key(key(KeyCode::Char('n')));
    assert_eq!(listing.filters().page(), 2);
    second.assert_hits(1);
  }

  fn page_mock<'a>(
    server: &'a MockServer,
    page: u32,
    ids: std::ops::Range<u32>,
    total: u64,
  ) -> httpmock::Mock<'a> {
    server.mock(|when, then| {
      when
        .method(GET)
        .path("/policies")
        .query_param("page", page.to_string());
      then.status(200).json_body(json!({
        "policies": ids.map(|i| json!({"_id": format!("p{i}")})).collect::<Vec<_>>(),
        "total": total
      }));
    })
  }

  #[tokio::test]
  async fn test_shrunk_collection_moves_back_to_last_page() {
    let server = MockServer::start();
    let mut first = page_mock(&server, 1, 0..9, 10);
    let mut second = page_mock(&server, 2, 9..10, 10);

    let ctx = context(&server);
    let mut listing = FilteredListing::new(&ctx);
    settle(&mut listing).await;
    listing.handle_key(key(KeyCode::Char('n')));
    settle(&mut listing).await;
    assert_eq!(listing.filters().page(), 2);
    assert_eq!(listing.items().len(), 1);

    // The only record on page 2 is deleted elsewhere
    first.delete();
    second.delete();
    page_mock(&server, 1, 0..9, 9);
    page_mock(&server, 2, 0..0, 9);
    ctx.policies.invalidate_policies();
    settle(&mut listing).await;

    assert_eq!(listing.filters().page(), 1);
    assert_eq!(listing.total_pages(), 1);
    assert_eq!(listing.items().len(), 9);
    assert!(listing.query().is_success());
  }

  #[tokio::test]
  async fn test_empty_collection_has_no_pages() {
    let server = MockServer::start();
    server.mock(|when, then| {
      when.method(GET).path("/policies");
      then.status(200).json_body(json!({"policies": [], "total": 0}));
    });

    let mut listing = FilteredListing::new(&context(&server));
    settle(&mut listing).await;

    assert!(listing.items().is_empty());
    assert_eq!(listing.total_pages(), 0);
    assert!(listing.pagination().spans.is_empty());
    assert!(!listing.query().is_error());
  }
}
