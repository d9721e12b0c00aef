use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::{App, Focus};
use crate::session::View;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent) {
  let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

  if ctrl && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if ctrl && key.code == KeyCode::Char('t') {
    app.toggle_theme();
    return;
  }

  match app.session.view() {
    View::Playing => handle_playing_key(app, key),
    View::Loading => {
      // No input while the delay runs; Esc abandons it.
      if key.code == KeyCode::Esc {
        app.back();
      }
    }
    View::Home => match app.focus {
      Focus::Input => handle_input_key(app, key),
      Focus::History => handle_history_key(app, key),
    },
  }
}

fn handle_playing_key(app: &mut App, key: event::KeyEvent) {
  let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
  match key.code {
    KeyCode::Enter => app.open_player(),
    KeyCode::Char('o') if ctrl => app.open_player(),
    KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => app.back(),
    KeyCode::Char('q') => app.should_quit = true,
    _ => {}
  }
}

fn handle_input_key(app: &mut App, key: event::KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) {
    if key.code == KeyCode::Char('r') {
      app.toggle_history();
    }
    return;
  }

  app.clear_error();
  let input = &mut app.session.input;
  match key.code {
    KeyCode::Enter => {
      app.trigger_submit();
    }
    KeyCode::Tab => {
      app.next_endpoint();
    }
    KeyCode::BackTab => {
      app.prev_endpoint();
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(input, app.cursor_position);
      input.insert(byte_idx, c);
      app.cursor_position += 1;
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(input, app.cursor_position);
        input.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < input.chars().count() {
        let byte_idx = char_to_byte_index(input, app.cursor_position);
        input.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = input.chars().count();
    }
    KeyCode::Esc => {
      if !input.is_empty() {
        input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
      } else if app.session.show_history {
        app.toggle_history();
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Down => {
      if app.session.show_history {
        app.focus = Focus::History;
      }
    }
    _ => {}
  }
}

fn handle_history_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => {
      if let Some(i) = app.history_state.selected() {
        app.select_history(i);
      }
    }
    KeyCode::Down | KeyCode::Char('j') => app.select_next_history(),
    KeyCode::Up | KeyCode::Char('k') => {
      if app.history_state.selected() == Some(0) {
        app.focus = Focus::Input;
      } else {
        app.select_prev_history();
      }
    }
    KeyCode::Esc => {
      app.focus = Focus::Input;
    }
    KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => app.toggle_history(),
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::app::tests::test_app;
  use ratatui::crossterm::event::KeyEvent;

  fn press(app: &mut App, code: KeyCode) {
    handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
  }

  fn type_str(app: &mut App, s: &str) {
    for c in s.chars() {
      press(app, KeyCode::Char(c));
    }
  }

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日"; // a=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 0), 0);
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6);
  }

  // --- key handling ---

  #[tokio::test]
  async fn typing_and_editing() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(0, dir.path());
    type_str(&mut app, "https://v.qq.com/ab");
    press(&mut app, KeyCode::Left);
    press(&mut app, KeyCode::Backspace);
    assert_eq!(app.session.input, "https://v.qq.com/b");
    press(&mut app, KeyCode::Home);
    press(&mut app, KeyCode::Delete);
    assert_eq!(app.session.input, "ttps://v.qq.com/b");
  }

  #[tokio::test]
  async fn enter_submits_and_esc_cancels_loading() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(1_000, dir.path());
    type_str(&mut app, "https://v.youku.com/x");
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.session.view(), View::Loading);

    type_str(&mut app, "ignored");
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.session.view(), View::Home);
    assert!(app.session.input.is_empty());
  }

  #[tokio::test]
  async fn enter_on_blank_shows_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(0, dir.path());
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.session.error(), Some("Please enter a video link."));
    type_str(&mut app, "h");
    assert_eq!(app.session.error(), None);
  }

  #[tokio::test]
  async fn tab_cycles_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(0, dir.path());
    press(&mut app, KeyCode::Tab);
    assert_eq!(app.session.endpoint_id, "two");
    press(&mut app, KeyCode::BackTab);
    assert_eq!(app.session.endpoint_id, "one");
  }

  #[tokio::test]
  async fn ctrl_t_toggles_theme() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(0, dir.path());
    let before = app.theme().name;
    handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('t'), KeyModifiers::CONTROL));
    assert_ne!(app.theme().name, before);
  }
}
