use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

use crate::ui::centered_rect;

/// Centered list overlay for choosing one of a few labels, e.g. a category.
/// Emits the chosen label; `Esc` closes it without an event.
#[derive(Debug, Clone, Default)]
pub struct ChoicePicker {
  active: bool,
  title: String,
  choices: Vec<String>,
  selected: usize,
}

impl ChoicePicker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Open with `choices`, highlighting `current` if present
  pub fn show(&mut self, title: impl Into<String>, choices: Vec<String>, current: &str) {
    self.selected = choices.iter().position(|c| c == current).unwrap_or(0);
    self.title = title.into();
    self.choices = choices;
    self.active = !self.choices.is_empty();
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.choices.clear();
    self.selected = 0;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<String> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    let len = self.choices.len();
    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => self.hide(),
      KeyCode::Enter => {
        let choice = self.choices.get(self.selected).cloned();
        self.hide();
        if let Some(choice) = choice {
          return KeyResult::Event(choice);
        }
      }
      KeyCode::Char('j') | KeyCode::Down => self.selected = (self.selected + 1) % len,
      KeyCode::Char('k') | KeyCode::Up => self.selected = (self.selected + len - 1) % len,
      _ => {}
    }
    KeyResult::Handled
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let widest = self.choices.iter().map(|c| c.chars().count()).max().unwrap_or(10);
    let width = (widest.max(self.title.chars().count()) as u16 + 6).max(20);
    let height = self.choices.len() as u16 + 2;
    let overlay_area = centered_rect(area, width, height);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let items: Vec<ListItem> = self
      .choices
      .iter()
      .map(|choice| ListItem::new(Span::styled(choice.as_str(), Style::default().fg(Color::Cyan))))
      .collect();
    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default().with_selected(Some(self.selected));
    frame.render_stateful_widget(list, overlay_area, &mut state);
  }
}
