use super::input::{InputResult, TextInput};
use super::{ChoicePicker, KeyResult};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

use crate::form::{FormField, PolicyForm, Submission};
use crate::policy::types::{Policy, FORM_CATEGORIES};
use crate::ui::centered_rect;
use crate::ui::renderfns::truncate;

#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
  Submitted(Submission),
  Cancelled,
}

/// Add/edit overlay over a [`PolicyForm`].
///
/// One field is edited at a time; moving away writes the text back into the
/// form. Category opens a picker instead of free text.
#[derive(Debug, Default)]
pub struct PolicyFormOverlay {
  form: Option<PolicyForm>,
  field: usize,
  input: TextInput,
  category: ChoicePicker,
  error: Option<String>,
}

impl PolicyFormOverlay {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.form.is_some()
  }

  pub fn open_new(&mut self) {
    self.open(PolicyForm::new());
  }

  pub fn open_edit(&mut self, policy: &Policy) {
    self.open(PolicyForm::edit(policy));
  }

  fn open(&mut self, form: PolicyForm) {
    self.form = Some(form);
    self.field = 0;
    self.error = None;
    self.load_field();
  }

  fn close(&mut self) {
    self.form = None;
    self.category.hide();
    self.input.clear();
  }

  fn current_field(&self) -> Option<FormField> {
    self.form.as_ref().and_then(|f| f.fields().get(self.field).copied())
  }

  /// Put the current field's text into the editor
  fn load_field(&mut self) {
    let value = match (&self.form, self.current_field()) {
      (Some(form), Some(field)) => form.value(field).to_string(),
      _ => String::new(),
    };
    self.input = TextInput::with_value(value);
  }

  /// Write the editor's text back into the form
  fn store_field(&mut self) {
    if let Some(field) = self.current_field() {
      if field != FormField::Category {
        let value = self.input.value().to_string();
        if let Some(form) = self.form.as_mut() {
          form.set_value(field, value);
        }
      }
    }
  }

  fn move_to(&mut self, index: usize) {
    self.store_field();
    let len = self.form.as_ref().map(|f| f.fields().len()).unwrap_or(0);
    self.field = index.min(len.saturating_sub(1));
    self.load_field();
  }

  fn step(&mut self, forward: bool) {
    let len = self.form.as_ref().map(|f| f.fields().len()).unwrap_or(0);
    if len == 0 {
      return;
    }
    let next = if forward {
      (self.field + 1) % len
    } else {
      (self.field + len - 1) % len
    };
    self.move_to(next);
  }

  fn add_benefit(&mut self) {
    self.store_field();
    let Some(form) = self.form.as_mut() else {
      return;
    };
    let after = match form.fields().get(self.field) {
      Some(FormField::Benefit(i)) => *i,
      _ => form.benefits.len().saturating_sub(1),
    };
    let at = form.add_benefit(after);
    let index = form
      .fields()
      .iter()
      .position(|f| *f == FormField::Benefit(at))
      .unwrap_or(self.field);
    self.field = index;
    self.load_field();
  }

  fn remove_benefit(&mut self) {
    if let (Some(FormField::Benefit(i)), Some(form)) = (self.current_field(), self.form.as_mut()) {
      if form.remove_benefit(i) {
        self.field = self.field.saturating_sub(usize::from(i > 0));
        self.load_field();
      }
    }
  }

  fn submit(&mut self) -> KeyResult<FormEvent> {
    self.store_field();
    let Some(form) = self.form.as_ref() else {
      return KeyResult::NotHandled;
    };
    match form.submit() {
      Ok(submission) => {
        self.close();
        KeyResult::Event(FormEvent::Submitted(submission))
      }
      Err(e) => {
        self.error = Some(e.to_string());
        KeyResult::Handled
      }
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if !self.is_active() {
      return KeyResult::NotHandled;
    }

    // Category picker sits on top of the form
    match self.category.handle_key(key) {
      KeyResult::Event(choice) => {
        if let Some(form) = self.form.as_mut() {
          form.category = choice;
        }
        self.load_field();
        return KeyResult::Handled;
      }
      KeyResult::Handled => return KeyResult::Handled,
      KeyResult::NotHandled => {}
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Esc => {
        self.close();
        return KeyResult::Event(FormEvent::Cancelled);
      }
      KeyCode::Char('s') if ctrl => return self.submit(),
      KeyCode::Char('n') if ctrl => self.add_benefit(),
      KeyCode::Char('d') if ctrl => self.remove_benefit(),
      KeyCode::Tab | KeyCode::Down => self.step(true),
      KeyCode::BackTab | KeyCode::Up => self.step(false),
      KeyCode::Enter if self.current_field() == Some(FormField::Category) => {
        let current = self.form.as_ref().map(|f| f.category.clone()).unwrap_or_default();
        let choices = FORM_CATEGORIES.iter().map(|c| c.to_string()).collect();
        self.category.show("Category", choices, &current);
      }
      KeyCode::Enter => self.step(true),
      // Category is only changed through the picker
      _ if self.current_field() == Some(FormField::Category) => {}
      _ => {
        if self.input.handle_key(key) == InputResult::Consumed {
          self.error = None;
        }
      }
    }
    KeyResult::Handled
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some(form) = &self.form else {
      return;
    };

    let fields = form.fields();
    let height = (fields.len() as u16 + 4).min(area.height);
    let overlay_area = centered_rect(area, 80, height);
    frame.render_widget(Clear, overlay_area);

    let title = if form.is_edit() { " Edit Policy " } else { " Add New Policy " };
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(title);
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let [list_area, status_area] =
      Layout::vertical([Constraint::Min(1), Constraint::Length(2)]).areas(inner);
    let value_width = list_area.width.saturating_sub(30) as usize;

    let items: Vec<ListItem> = fields
      .iter()
      .enumerate()
      .map(|(i, field)| {
        let label = Span::styled(
          format!("{:<28}", truncate(&field.label(), 27)),
          Style::default().fg(Color::DarkGray),
        );
        let value = if i == self.field && *field != FormField::Category {
          let (before, after) = self.input.split_at_cursor();
          vec![
            Span::raw(before.to_string()),
            Span::styled("_", Style::default().fg(Color::Yellow)),
            Span::raw(after.to_string()),
          ]
        } else if *field == FormField::ImagePath && form.value(*field).is_empty() {
          let hint = if form.existing_image().is_empty() {
            "(path to an image file)"
          } else {
            "(keep current image)"
          };
          vec![Span::styled(hint, Style::default().fg(Color::DarkGray))]
        } else {
          vec![Span::raw(truncate(form.value(*field), value_width))]
        };
        let mut spans = vec![label];
        spans.extend(value);
        ListItem::new(Line::from(spans))
      })
      .collect();

    let list = List::new(items).highlight_style(Style::default().bg(Color::DarkGray));
    let mut state = ListState::default().with_selected(Some(self.field));
    frame.render_stateful_widget(list, list_area, &mut state);

    let status = match &self.error {
      Some(e) => Line::styled(e.as_str(), Style::default().fg(Color::Red)),
      None => Line::styled(
        "<tab> next  <ctrl-s> save  <ctrl-n>/<ctrl-d> add/remove benefit  <esc> cancel",
        Style::default().fg(Color::DarkGray),
      ),
    };
    frame.render_widget(Paragraph::new(status), status_area);

    self.category.render_overlay(frame, area);
  }
}
