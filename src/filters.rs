//! Page, category and search state behind the policy lists.

use std::time::Duration;

use crate::debounce::Debounced;
use crate::policy::types::PolicyQuery;

/// Number of pages needed for `total` records, `per_page` at a time.
pub fn total_pages(total: u64, per_page: u32) -> u32 {
  if per_page == 0 {
    return 0;
  }
  total.div_ceil(u64::from(per_page)).try_into().unwrap_or(u32::MAX)
}

/// Clamp a page number to `[1, total_pages]`. With no pages at all the only
/// valid page is 1.
pub fn clamp_page(page: u32, total_pages: u32) -> u32 {
  page.min(total_pages.max(1)).max(1)
}

/// Filter controller: page, category filter and debounced search text.
///
/// Only the settled search participates in [`PolicyFilters::query`], so the
/// query key changes at most once per quiet period no matter how fast the
/// user types.
#[derive(Debug)]
pub struct PolicyFilters {
  page: u32,
  per_page: u32,
  category: String,
  search: Debounced<String>,
}

impl PolicyFilters {
  pub fn new(per_page: u32, debounce: Duration) -> Self {
    Self {
      page: 1,
      per_page: per_page.max(1),
      category: String::new(),
      search: Debounced::new(String::new(), debounce),
    }
  }

  pub fn page(&self) -> u32 {
    self.page
  }

  pub fn per_page(&self) -> u32 {
    self.per_page
  }

  pub fn category(&self) -> &str {
    &self.category
  }

  /// Search text as typed
  #[cfg(test)]
  pub fn search_text(&self) -> &str {
    self.search.raw()
  }

  /// Search text that has settled and is used for reads
  pub fn applied_search(&self) -> &str {
    self.search.settled()
  }

  /// Typed search text still waiting out the quiet period
  pub fn search_pending(&self) -> bool {
    self.search.is_pending()
  }

  pub fn is_filtered(&self) -> bool {
    !self.category.is_empty() || !self.search.raw().is_empty() || !self.search.settled().is_empty()
  }

  /// Parameters for the current read
  pub fn query(&self) -> PolicyQuery {
    PolicyQuery {
      page: self.page,
      limit: self.per_page,
      category: self.category.clone(),
      search: self.search.settled().clone(),
    }
  }

  /// Change the category filter. Returns to the first page when it changes.
  pub fn set_category(&mut self, category: impl Into<String>) {
    let category = category.into();
    if category != self.category {
      self.category = category;
      self.page = 1;
    }
  }

  /// Record typed search text. The read follows once typing pauses.
  pub fn set_search_text(&mut self, text: impl Into<String>) {
    let text = text.into();
    if &text != self.search.raw() {
      self.search.set(text);
    }
  }

  /// Apply a settled search, if one is ready. Returns `true` when the query
  /// changed, in which case the page is back to 1.
  pub fn poll(&mut self) -> bool {
    if self.search.poll() {
      self.page = 1;
      return true;
    }
    false
  }

  /// Reset the search alone, raw and settled together.
  pub fn clear_search(&mut self) {
    if self.search.reset(String::new()) {
      self.page = 1;
    }
  }

  /// Reset category and search, raw and settled together, and go to page 1.
  pub fn clear(&mut self) {
    self.category.clear();
    self.search.reset(String::new());
    self.page = 1;
  }

  /// Go to a page, clamped to the pages available for `total` records
  pub fn go_to_page(&mut self, page: u32, total: u64) {
    self.page = clamp_page(page, total_pages(total, self.per_page));
  }

  /// Pull the current page back inside a collection that now holds `total`
  /// records. Returns `true` if the page moved.
  pub fn fit_to(&mut self, total: u64) -> bool {
    let before = self.page;
    self.go_to_page(before, total);
    self.page != before
  }

  pub fn next_page(&mut self, total: u64) {
    self.go_to_page(self.page.saturating_add(1), total);
  }

  pub fn prev_page(&mut self, total: u64) {
    self.go_to_page(self.page.saturating_sub(1), total);
  }
}
