use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) {
    match key.code {
      KeyCode::Char('c') => app.should_quit = true,
      KeyCode::Char('t') => app.next_theme(),
      KeyCode::Char('r') => app.reset(),
      KeyCode::Char('y') => app.retry_search(),
      _ => {}
    }
    return;
  }

  match key.code {
    KeyCode::Enter => app.submit_input(),
    KeyCode::Tab | KeyCode::BackTab => app.toggle_focus(),
    KeyCode::Up => app.select_prev(),
    KeyCode::Down => app.select_next(),
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
      } else if app.selected.is_some() {
        app.selected = None;
      } else {
        app.should_quit = true;
      }
    }
    _ => handle_edit_key(app, key.code),
  }
}

fn handle_edit_key(app: &mut App, code: KeyCode) {
  app.clear_error();
  match code {
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::app::Focus;
  use crate::app::tests::{loaded_app, test_app};

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
  }

  fn type_str(app: &mut App, s: &str) {
    for c in s.chars() {
      handle_key_event(app, key(KeyCode::Char(c)));
    }
  }

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("clip", 0), 0);
    assert_eq!(char_to_byte_index("clip", 2), 2);
    assert_eq!(char_to_byte_index("clip", 4), 4);
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "vé日";
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6);
  }

  #[test]
  fn char_to_byte_past_end() {
    assert_eq!(char_to_byte_index("", 3), 0);
  }

  // --- editing ---

  #[test]
  fn typing_and_cursor_moves() {
    let mut app = test_app();
    type_str(&mut app, "cat");
    handle_key_event(&mut app, key(KeyCode::Left));
    handle_key_event(&mut app, key(KeyCode::Backspace));
    assert_eq!(app.input, "ct");
    handle_key_event(&mut app, key(KeyCode::Home));
    type_str(&mut app, "é");
    assert_eq!(app.input, "éct");
    handle_key_event(&mut app, key(KeyCode::End));
    handle_key_event(&mut app, key(KeyCode::Delete));
    assert_eq!(app.input, "éct");
    assert_eq!(app.cursor_position, 3);
  }

  #[test]
  fn esc_clears_then_quits() {
    let mut app = test_app();
    type_str(&mut app, "x");
    handle_key_event(&mut app, key(KeyCode::Esc));
    assert!(app.input.is_empty());
    assert!(!app.should_quit);
    handle_key_event(&mut app, key(KeyCode::Esc));
    assert!(app.should_quit);
  }

  #[test]
  fn ctrl_c_quits() {
    let mut app = test_app();
    handle_key_event(&mut app, ctrl('c'));
    assert!(app.should_quit);
  }

  #[test]
  fn ctrl_letters_are_not_typed() {
    let mut app = test_app();
    handle_key_event(&mut app, ctrl('r'));
    handle_key_event(&mut app, ctrl('y'));
    assert!(app.input.is_empty());
  }

  #[test]
  fn tab_switches_pane() {
    let mut app = loaded_app();
    handle_key_event(&mut app, key(KeyCode::Tab));
    assert_eq!(app.focus, Focus::Chat);
    handle_key_event(&mut app, key(KeyCode::BackTab));
    assert_eq!(app.focus, Focus::Search);
  }

  #[test]
  fn ctrl_r_unloads_video() {
    let mut app = loaded_app();
    handle_key_event(&mut app, ctrl('r'));
    assert!(!app.has_video());
  }

  #[test]
  fn arrows_move_selection_and_esc_drops_it() {
    let mut app = loaded_app();
    handle_key_event(&mut app, key(KeyCode::Down));
    handle_key_event(&mut app, key(KeyCode::Down));
    assert_eq!(app.selected, Some(1));
    handle_key_event(&mut app, key(KeyCode::Esc));
    assert_eq!(app.selected, None);
    assert!(!app.should_quit);
  }
}
