use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::commands::{self, Command};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const MAX_SUGGESTIONS: usize = 8;

/// `:` prompt with autocomplete
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  input: TextInput,
  active: bool,
  selected: usize,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  fn close(&mut self) {
    self.active = false;
    self.input.clear();
    self.selected = 0;
  }

  pub fn suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(self.input.value())
  }

  fn cycle(&mut self, forward: bool) {
    let len = self.suggestions().len();
    if len == 0 {
      return;
    }
    self.selected = if forward {
      (self.selected + 1) % len
    } else {
      (self.selected + len - 1) % len
    };
  }

  /// Highlighted suggestion, or what was typed when nothing matches
  fn resolve(&self) -> String {
    match self.suggestions().get(self.selected) {
      Some(cmd) => cmd.name.to_string(),
      None => self.input.value().trim().to_lowercase(),
    }
  }

  /// Handle a key event. Call this regardless of active state; it handles
  /// activation too. Emits the resolved command name on Enter.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<String> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.active = true;
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Tab | KeyCode::Down => self.cycle(true),
      KeyCode::BackTab | KeyCode::Up => self.cycle(false),
      KeyCode::Enter => {
        let cmd = self.resolve();
        self.close();
        return KeyResult::Event(cmd);
      }
      _ => match self.input.handle_key(key) {
        InputResult::Cancelled => self.close(),
        InputResult::Consumed => self.selected = 0,
        InputResult::Submitted(_) | InputResult::NotHandled => {}
      },
    }
    KeyResult::Handled
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();
    let shown = suggestions.len().min(MAX_SUGGESTIONS) as u16;
    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let height = (3 + shown).min(area.height);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, height);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);
    if inner.height == 0 {
      return;
    }

    let [prompt_area, list_area] =
      Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);

    let prompt = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(prompt), prompt_area);

    if suggestions.is_empty() || list_area.height == 0 {
      return;
    }
    let items: Vec<ListItem> = suggestions
      .iter()
      .take(MAX_SUGGESTIONS)
      .map(|cmd| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<12}", cmd.name), Style::default().fg(Color::Cyan)),
          Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();
    let list = List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default().with_selected(Some(self.selected));
    frame.render_stateful_widget(list, list_area, &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_enter_resolves_highlighted_suggestion() {
    let mut cmd = CommandInput::new();
    cmd.handle_key(key(KeyCode::Char(':')));
    cmd.handle_key(key(KeyCode::Char('p')));
    cmd.handle_key(key(KeyCode::Char('o')));
    cmd.handle_key(key(KeyCode::Tab));

    assert_eq!(
      cmd.handle_key(key(KeyCode::Enter)),
      KeyResult::Event("popular".to_string())
    );
    assert!(!cmd.is_active());
  }

  #[test]
  fn test_escape_closes_without_event() {
    let mut cmd = CommandInput::new();
    cmd.handle_key(key(KeyCode::Char(':')));
    cmd.handle_key(key(KeyCode::Char('m')));
    assert_eq!(cmd.handle_key(key(KeyCode::Esc)), KeyResult::Handled);
    assert!(!cmd.is_active());
  }

  #[test]
  fn test_unknown_input_is_passed_through() {
    let mut cmd = CommandInput::new();
    cmd.handle_key(key(KeyCode::Char(':')));
    for c in "xyz".chars() {
      cmd.handle_key(key(KeyCode::Char(c)));
    }
    assert_eq!(
      cmd.handle_key(key(KeyCode::Enter)),
      KeyResult::Event("xyz".to_string())
    );
  }
}
