use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::future::Future;
use tokio::sync::oneshot;

use crate::ui::centered_rect;

/// Yes/no prompt whose answer resolves a pending operation.
///
/// [`ConfirmDialog::ask`] hands back a future that yields `true` only when
/// the user answers yes. Answering no, pressing Esc, or dropping the dialog
/// (e.g. leaving the view) all yield `false`.
#[derive(Debug, Default)]
pub struct ConfirmDialog {
  title: String,
  text: String,
  answer: Option<oneshot::Sender<bool>>,
}

impl ConfirmDialog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.answer.is_some()
  }

  /// Show the prompt. Any earlier unanswered prompt resolves to `false`.
  pub fn ask(&mut self, title: &str, text: &str) -> impl Future<Output = bool> + Send + 'static {
    let (tx, rx) = oneshot::channel();
    self.title = title.to_string();
    self.text = text.to_string();
    self.answer = Some(tx);
    async move { rx.await.unwrap_or(false) }
  }

  fn resolve(&mut self, confirmed: bool) {
    if let Some(tx) = self.answer.take() {
      let _ = tx.send(confirmed);
    }
  }

  /// Emits the answer once given
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<bool> {
    if !self.is_active() {
      return KeyResult::NotHandled;
    }
    let confirmed = match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') => true,
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => false,
      _ => return KeyResult::Handled,
    };
    self.resolve(confirmed);
    KeyResult::Event(confirmed)
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.is_active() {
      return;
    }

    let overlay_area = centered_rect(area, 50, 7);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red))
      .title(format!(" {} ", self.title));
    let body = vec![
      Line::raw(self.text.as_str()),
      Line::raw(""),
      Line::from(vec![
        Span::styled("<y>", Style::default().fg(Color::Red).bold()),
        Span::styled(" yes, delete it   ", Style::default().fg(Color::DarkGray)),
        Span::styled("<n>", Style::default().fg(Color::Cyan)),
        Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
      ]),
    ];
    let paragraph = Paragraph::new(body).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, overlay_area);
  }
}
