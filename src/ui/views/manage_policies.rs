use crate::app::AppContext;
use crate::mutations::{MutationError, MutationKind, Notification};
use crate::policy::types::{Policy, FORM_CATEGORIES};
use crate::ui::components::{
  ChoicePicker, ConfirmDialog, FormEvent, KeyResult, PolicyFormOverlay, Toast,
};
use crate::ui::ensure_valid_table_selection;
use crate::ui::renderfns::{category_color, format_rate, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::listing::FilteredListing;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const ALL_CATEGORIES: &str = "All Categories";

type MutationOutcome = (MutationKind, Result<(), MutationError>);

/// Hand an outcome back to the view. The change itself has already landed;
/// if the view was closed meanwhile only the notification is lost.
fn report(tx: &mpsc::UnboundedSender<MutationOutcome>, outcome: MutationOutcome) -> bool {
  match tx.send(outcome) {
    Ok(()) => true,
    Err(mpsc::error::SendError((kind, result))) => {
      warn!(?kind, ?result, "change finished after its view closed");
      false
    }
  }
}

/// Admin table: add, edit and delete policies
pub struct ManagePoliciesView {
  ctx: AppContext,
  listing: FilteredListing,
  table_state: TableState,
  category_picker: ChoicePicker,
  form: PolicyFormOverlay,
  confirm: ConfirmDialog,
  toast: Toast,
  outcomes_tx: mpsc::UnboundedSender<MutationOutcome>,
  outcomes_rx: mpsc::UnboundedReceiver<MutationOutcome>,
}

impl ManagePoliciesView {
  pub fn new(ctx: AppContext) -> Self {
    let listing = FilteredListing::new(&ctx);
    let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
    Self {
      ctx,
      listing,
      table_state: TableState::default(),
      category_picker: ChoicePicker::new(),
      form: PolicyFormOverlay::new(),
      confirm: ConfirmDialog::new(),
      toast: Toast::new(),
      outcomes_tx,
      outcomes_rx,
    }
  }

  fn busy(&self) -> bool {
    self.ctx.mutations.is_busy()
  }

  fn selected_policy(&self) -> Option<&Policy> {
    self
      .table_state
      .selected()
      .and_then(|i| self.listing.items().get(i))
  }

  fn open_category_picker(&mut self) {
    let choices = std::iter::once(ALL_CATEGORIES)
      .chain(FORM_CATEGORIES.iter().copied())
      .map(String::from)
      .collect();
    let current = match self.listing.filters().category() {
      "" => ALL_CATEGORIES,
      c => c,
    };
    self.category_picker.show("Filter by category", choices, current);
  }

  fn start_delete(&mut self) {
    let Some(policy) = self.selected_policy() else {
      return;
    };
    let id = policy.id.clone();
    let confirmed = self
      .confirm
      .ask("Are you sure?", "You won't be able to revert this!");
    let mutations = self.ctx.mutations.clone();
    let tx = self.outcomes_tx.clone();

    tokio::spawn(async move {
      let result = match mutations.delete(&id, confirmed).await {
        Ok(false) => return,
        Ok(true) => Ok(()),
        Err(e) => Err(e),
      };
      report(&tx, (MutationKind::Delete, result));
    });
  }

  fn start_submit(&mut self, submission: crate::form::Submission) {
    let mutations = self.ctx.mutations.clone();
    let tx = self.outcomes_tx.clone();
    tokio::spawn(async move {
      report(&tx, mutations.submit(submission).await);
    });
    self.listing.clear_search();
  }

  /// Overlays in stacking order, topmost first
  fn handle_overlay_key(&mut self, key: KeyEvent) -> KeyResult<()> {
    self
      .toast
      .handle_key(key)
      .or_else(|| self.confirm.handle_key(key).map(|_| ()))
      .or_else(|| match self.form.handle_key(key) {
        KeyResult::Event(FormEvent::Submitted(submission)) => {
          self.start_submit(submission);
          KeyResult::Handled
        }
        KeyResult::Event(FormEvent::Cancelled) => KeyResult::Handled,
        other => other.map(|_| ()),
      })
      .or_else(|| match self.category_picker.handle_key(key) {
        KeyResult::Event(choice) => {
          let category = if choice == ALL_CATEGORIES { "" } else { choice.as_str() };
          self.listing.set_category(category);
          self.table_state.select(Some(0));
          KeyResult::Handled
        }
        other => other.map(|_| ()),
      })
      .or_else(|| self.listing.handle_key(key))
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.listing.items().len();
    ensure_valid_table_selection(&mut self.table_state, len);

    let block = Block::default()
      .title(self.listing.title("Manage Policies"))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Cyan));

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
        "No policies found. Press 'a' to add one."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let header = Row::new(["Title", "Category", "Age Range", "Coverage", "Premium Rate"])
      .style(Style::default().fg(Color::Yellow).bold());
    let rows: Vec<Row> = self.listing.items().iter().map(policy_row).collect();

    let table = Table::new(
      rows,
      [
        Constraint::Percentage(34),
        Constraint::Percentage(14),
        Constraint::Percentage(14),
        Constraint::Percentage(22),
        Constraint::Percentage(16),
      ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("> ");
    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

fn policy_row(policy: &Policy) -> Row<'static> {
  Row::new(vec![
    Cell::from(truncate(&policy.title, 40)),
    Cell::from(policy.category.clone()).style(Style::default().fg(category_color(&policy.category))),
    Cell::from(format!("{} - {}", policy.min_age, policy.max_age)),
    Cell::from(format!("Tk. {}", policy.coverage_range)),
    Cell::from(format_rate(policy.base_premium_rate)),
  ])
}

impl View for ManagePoliciesView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let KeyResult::Handled | KeyResult::Event(_) = self.handle_overlay_key(key) {
      return ViewAction::None;
    }

    let busy = self.busy();
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('a') if !busy => self.form.open_new(),
      KeyCode::Char('e') if !busy => {
        if let Some(policy) = self.selected_policy().cloned() {
          self.form.open_edit(&policy);
        }
      }
      KeyCode::Char('d') if !busy => self.start_delete(),
      KeyCode::Char('a') | KeyCode::Char('e') | KeyCode::Char('d') => {
        debug!("ignoring change while another is saving");
      }
      KeyCode::Char('c') => self.open_category_picker(),
      KeyCode::Char('x') => self.listing.clear(),
      KeyCode::Char('r') => self.listing.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [table_area, pages_area] =
      Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);

    self.render_table(frame, table_area);
    frame.render_widget(
      Paragraph::new(self.listing.pagination()).alignment(Alignment::Center),
      pages_area,
    );

    self.listing.render_search(frame, table_area);
    self.category_picker.render_overlay(frame, area);
    self.form.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
    self.toast.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Manage".to_string()
  }

  fn tick(&mut self) {
    while let Ok((kind, result)) = self.outcomes_rx.try_recv() {
      info!(?kind, ok = result.is_ok(), "change finished");
      self.toast.show(Notification::from_result(kind, &result));
    }
    self.toast.tick();
    if self.listing.tick() {
      ensure_valid_table_selection(&mut self.table_state, self.listing.items().len());
    }
  }

  fn resume(&mut self) {
    self.listing.resume();
  }

  fn captures_input(&self) -> bool {
    self.listing.search_active()
      || self.form.is_active()
      || self.confirm.is_active()
      || self.category_picker.is_active()
  }

  fn status(&self) -> Option<String> {
    self.busy().then(|| "Saving...".to_string())
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let idle = !self.busy();
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("a", "add").with_priority(15).enabled(idle),
      ShortcutInfo::new("e", "edit").with_priority(16).enabled(idle),
      ShortcutInfo::new("d", "delete").with_priority(17).enabled(idle),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("c", "category").with_priority(25),
      ShortcutInfo::new("n/p", "page").with_priority(30),
      ShortcutInfo::new("x", "clear filters")
        .with_priority(40)
        .enabled(self.listing.filters().is_filtered()),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ListingConfig;
  use crate::mutations::NotificationLevel;
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

  fn view(server: &MockServer) -> ManagePoliciesView {
    let client = PolicyClient::with_base_url(&server.base_url(), None).unwrap();
    let uploader = HostedImageUploader::with_endpoint(&server.url("/upload"), None);
    let ctx = AppContext::from_parts(client, Arc::new(uploader), ListingConfig::default());
    ManagePoliciesView::new(ctx)
  }

  async fn settle(view: &mut ManagePoliciesView) {
    for _ in 0..15 {
      tokio::time::sleep(Duration::from_millis(20)).await;
      view.tick();
    }
  }

  fn list_mock(server: &MockServer) {
    server.mock(|when, then| {
      when.method(GET).path("/policies");
      then.status(200).json_body(json!({
        "policies": [{"_id": "p1", "title": "Family Shield", "category": "Family"}],
        "total": 1
      }));
    });
  }

  #[tokio::test]
  async fn test_confirmed_delete_shows_success() {
    let server = MockServer::start();
    let delete = server.mock(|when, then| {
      when.method(DELETE).path("/policy/p1");
      then.status(200).json_body(json!({"deletedCount": 1}));
    });
    list_mock(&server);

    let mut view = view(&server);
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('d')));
    assert!(view.captures_input());
    view.handle_key(key(KeyCode::Char('y')));
    settle(&mut view).await;

    delete.assert();
    let shown = view.toast.current().unwrap();
    assert_eq!(shown.level, NotificationLevel::Success);
    assert_eq!(shown.title, "Policy Deleted!");
  }

  #[tokio::test]
  async fn test_declined_delete_sends_nothing() {
    let server = MockServer::start();
    let delete = server.mock(|when, then| {
      when.method(DELETE).path("/policy/p1");
      then.status(200).json_body(json!({"deletedCount": 1}));
    });
    list_mock(&server);

    let mut view = view(&server);
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('d')));
    view.handle_key(key(KeyCode::Esc));
    settle(&mut view).await;

    delete.assert_hits(0);
    assert!(view.toast.current().is_none());
    assert!(!view.captures_input());
  }

  #[test]
  fn test_outcome_for_closed_view_is_not_delivered() {
    let (tx, rx) = mpsc::unbounded_channel();
    assert!(report(&tx, (MutationKind::Create, Ok(()))));
    drop(rx);
    assert!(!report(&tx, (MutationKind::Delete, Err(MutationError::Busy))));
  }

  #[tokio::test]
  async fn test_delete_completes_after_view_closes() {
    let server = MockServer::start();
    let delete = server.mock(|when, then| {
      when.method(DELETE).path("/policy/p1");
      then
        .status(200)
        .delay(Duration::from_millis(50))
        .json_body(json!({"deletedCount": 1}));
    });
    list_mock(&server);

    let mut view = view(&server);
    settle(&mut view).await;
    let mutations = view.ctx.mutations.clone();

    view.handle_key(key(KeyCode::Char('d')));
    view.handle_key(key(KeyCode::Char('y')));
    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(view);

    for _ in 0..20 {
      tokio::time::sleep(Duration::from_millis(20)).await;
      if delete.hits() == 1 && !mutations.is_busy() {
        break;
      }
    }
    delete.assert_hits(1);
    assert!(!mutations.is_busy());
  }

  #[tokio::test]
  async fn test_category_picker_filters() {
    let server = MockServer::start();
    list_mock(&server);

    let mut view = view(&server);
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('c')));
    // "All Categories" -> "Term Life"
    view.handle_key(key(KeyCode::Down));
    view.handle_key(key(KeyCode::Enter));
    assert_eq!(view.listing.filters().category(), "Term Life");

    view.handle_key(key(KeyCode::Char('c')));
    view.handle_key(key(KeyCode::Up));
    view.handle_key(key(KeyCode::Enter));
    assert_eq!(view.listing.filters().category(), "");
  }
}
