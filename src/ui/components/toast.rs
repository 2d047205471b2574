use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::time::{Duration, Instant};

use crate::mutations::{Notification, NotificationLevel};

/// Success messages disappear on their own after this long
const SUCCESS_TTL: Duration = Duration::from_secs(3);

/// Shows the latest mutation notification in the top-right corner. Errors
/// stay until dismissed with Enter or Esc.
#[derive(Debug, Default)]
pub struct Toast {
  current: Option<(Notification, Instant)>,
}

impl Toast {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.current.is_some()
  }

  pub fn show(&mut self, notification: Notification) {
    self.current = Some((notification, Instant::now()));
  }

  pub fn current(&self) -> Option<&Notification> {
    self.current.as_ref().map(|(n, _)| n)
  }

  /// Expire a timed-out success message. Returns `true` if it went away.
  pub fn tick(&mut self) -> bool {
    let expired = matches!(
      &self.current,
      Some((n, shown)) if n.level == NotificationLevel::Success && shown.elapsed() >= SUCCESS_TTL
    );
    if expired {
      self.current = None;
    }
    expired
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<()> {
    if !self.is_active() {
      return KeyResult::NotHandled;
    }
    match key.code {
      KeyCode::Enter | KeyCode::Esc => {
        self.current = None;
        KeyResult::Handled
      }
      _ => KeyResult::NotHandled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some((notification, _)) = &self.current else {
      return;
    };

    let color = match notification.level {
      NotificationLevel::Success => Color::Green,
      NotificationLevel::Error => Color::Red,
    };
    let width = 40.min(area.width);
    let height = if notification.text.is_some() { 5 } else { 3 };
    let x = area.x + area.width.saturating_sub(width + 1);
    let toast_area = Rect::new(x, area.y + 1, width, height.min(area.height));
    frame.render_widget(Clear, toast_area);

    let mut lines = vec![Line::styled(
      notification.title.as_str(),
      Style::default().fg(color).bold(),
    )];
    if let Some(text) = &notification.text {
      lines.push(Line::raw(text.as_str()));
    }
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(color));
    frame.render_widget(
      Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
      toast_area,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mutations::MutationKind;
  use crossterm::event::KeyModifiers;

  #[test]
  fn test_error_stays_until_dismissed() {
    let mut toast = Toast::new();
    toast.show(Notification {
      level: NotificationLevel::Error,
      title: "Failed to Add Policy".to_string(),
      text: Some("Something went wrong!".to_string()),
    });
    assert!(!toast.tick());
    assert!(toast.is_active());

    let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
    assert_eq!(toast.handle_key(esc), KeyResult::Handled);
    assert!(!toast.is_active());
  }

  #[test]
  fn test_other_keys_pass_through() {
    let mut toast = Toast::new();
    toast.show(Notification::success(MutationKind::Delete));
    let j = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE);
    assert_eq!(toast.handle_key(j), KeyResult::NotHandled);
    assert_eq!(toast.current().map(|n| n.title.as_str()), Some("Policy Deleted!"));
  }
}
