use crate::commands;
use crate::config::{Config, ListingConfig};
use crate::event::{Event, EventHandler};
use crate::mutations::PolicyMutations;
use crate::policy::cached_client::CachedPolicyClient;
use crate::policy::client::PolicyClient;
use crate::policy::upload::{HostedImageUploader, ImageUploader};
use crate::ui::components::{CommandInput, KeyResult};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{ManagePoliciesView, PolicyListView, PopularView};
use clap::ValueEnum;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Screens reachable from the command line and `:` commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RootView {
  Browse,
  Manage,
  #[default]
  Popular,
}

impl RootView {
  fn from_command(name: &str) -> Option<Self> {
    match name {
      "policies" => Some(RootView::Browse),
      "manage" => Some(RootView::Manage),
      "popular" => Some(RootView::Popular),
      _ => None,
    }
  }
}

/// Shared handles every view gets: the cached reads, the write pipelines
/// and the listing settings. Cloning shares the cache and the busy flag.
#[derive(Clone)]
pub struct AppContext {
  pub policies: CachedPolicyClient,
  pub mutations: PolicyMutations,
  pub listing: ListingConfig,
}

impl AppContext {
  pub fn new(config: &Config) -> Result<Self> {
    let client = PolicyClient::new(config)?;
    let uploader = HostedImageUploader::new(config);
    Ok(Self::from_parts(client, Arc::new(uploader), config.listing.clone()))
  }

  pub fn from_parts(
    client: PolicyClient,
    uploader: Arc<dyn ImageUploader>,
    listing: ListingConfig,
  ) -> Self {
    let policies = CachedPolicyClient::new(client, listing.stale_time());
    let mutations = PolicyMutations::new(policies.clone(), uploader);
    Self {
      policies,
      mutations,
      listing,
    }
  }

  fn root_view(&self, root: RootView) -> Box<dyn View> {
    match root {
      RootView::Browse => Box::new(PolicyListView::new(self.clone())),
      RootView::Manage => Box::new(ManagePoliciesView::new(self.clone())),
      RootView::Popular => Box::new(PopularView::new(self.clone())),
    }
  }
}

/// Main application state
pub struct App {
  /// Navigation stack, root at index 0
  views: Vec<Box<dyn View>>,
  command: CommandInput,
  ctx: AppContext,
  title: String,
  should_quit: bool,
}

impl App {
  pub fn new(config: Config, root: RootView) -> Result<Self> {
    let ctx = AppContext::new(&config)?;
    let title = config.display_title();
    info!(api = %config.api.url, ?root, "starting");

    Ok(Self {
      views: vec![ctx.root_view(root)],
      command: CommandInput::new(),
      ctx,
      title,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.event_loop().await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(Duration::from_millis(100));

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Resize) => {}
        Some(Event::Tick) => {}
        None => break,
      }
      // Keys can arrive faster than ticks
      self.tick();
    }
    Ok(())
  }

  fn tick(&mut self) {
    if let Some(view) = self.views.last_mut() {
      view.tick();
    }
  }

  fn draw(&mut self, frame: &mut Frame) {
    let [header, content, footer] = Layout::vertical([
      Constraint::Length(1),
      Constraint::Min(0),
      Constraint::Length(1),
    ])
    .areas(frame.area());

    let breadcrumb: Vec<String> = self.views.iter().map(|v| v.breadcrumb_label()).collect();
    let Some(view) = self.views.last_mut() else {
      return;
    };

    draw_header(frame, header, &self.title, &view.shortcuts());
    view.render(frame, content);
    draw_footer(frame, footer, &breadcrumb, view.status().as_deref());
    self.command.render_overlay(frame, content);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let captured = self.views.last().is_some_and(|v| v.captures_input());
    if !captured {
      match self.command.handle_key(key) {
        KeyResult::Event(cmd) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let Some(view) = self.views.last_mut() else {
      return;
    };
    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => self.views.push(next),
      ViewAction::Pop => self.pop(),
    }
  }

  fn pop(&mut self) {
    if self.views.len() > 1 {
      self.views.pop();
      if let Some(view) = self.views.last_mut() {
        view.resume();
      }
    } else {
      self.should_quit = true;
    }
  }

  fn execute_command(&mut self, input: &str) {
    let Some(cmd) = commands::find(input) else {
      warn!(input, "unknown command");
      return;
    };
    if cmd.name == "quit" {
      self.should_quit = true;
      return;
    }
    if let Some(root) = RootView::from_command(cmd.name) {
      self.views = vec![self.ctx.root_view(root)];
    }
  }
}
