pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::prelude::*;
use ratatui::widgets::{ListState, TableState};

/// Keep a list selection inside `len` items, selecting the first item when
/// there was no selection.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  state.select(clamp_selection(state.selected(), len));
}

/// Same as [`ensure_valid_selection`] for tables
pub fn ensure_valid_table_selection(state: &mut TableState, len: usize) {
  state.select(clamp_selection(state.selected(), len));
}

fn clamp_selection(selected: Option<usize>, len: usize) -> Option<usize> {
  if len == 0 {
    return None;
  }
  Some(selected.unwrap_or(0).min(len - 1))
}

/// A `width` x `height` rect centered in `area`, shrunk to fit
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}
