//! Playback request flow: input validation and the `Home → Loading → Playing` view state.

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::constants::constants;
use crate::endpoint::{EndpointTable, compose};
use crate::history::HistoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
  #[error("Please enter a video link.")]
  EmptyInput,
  #[error("Please enter a valid video link format.")]
  MalformedUrl(#[source] url::ParseError),
}

/// Accept any syntactically valid absolute URL, whatever the scheme.
///
/// Returns the trimmed input.
pub fn validate(raw: &str) -> Result<&str, InputError> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(InputError::EmptyInput);
  }
  Url::parse(trimmed).map_err(InputError::MalformedUrl)?;
  Ok(trimmed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
  Home,
  Loading,
  Playing,
}

/// Identifies one pending loading delay. Only the latest ticket may finish loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// What the player surface needs once loading completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayTarget {
  pub video_url: String,
  pub endpoint_name: String,
  pub composed: String,
}

#[derive(Debug)]
pub enum Outcome {
  Rejected(InputError),
  Loading {
    ticket: LoadTicket,
    target: PlayTarget,
    /// History could not be persisted; playback goes ahead regardless.
    warning: Option<anyhow::Error>,
  },
}

pub struct Session {
  pub input: String,
  pub endpoint_id: String,
  pub show_history: bool,
  view: View,
  error: Option<String>,
  target: Option<PlayTarget>,
  pending: Option<LoadTicket>,
  next_ticket: u64,
}

impl Session {
  pub fn new(endpoint_id: impl Into<String>) -> Self {
    Self {
      input: String::new(),
      endpoint_id: endpoint_id.into(),
      show_history: false,
      view: View::Home,
      error: None,
      target: None,
      pending: None,
      next_ticket: 0,
    }
  }

  pub fn view(&self) -> View {
    self.view
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn set_error(&mut self, msg: impl Into<String>) {
    self.error = Some(msg.into());
  }

  pub fn clear_error(&mut self) {
    self.error = None;
  }

  /// The composed target while loading or playing.
  pub fn target(&self) -> Option<&PlayTarget> {
    self.target.as_ref()
  }

  /// Validate the input, record it and start loading.
  ///
  /// A rejected submission only sets the error message.
  pub fn submit(&mut self, history: &mut HistoryStore, endpoints: &EndpointTable) -> Outcome {
    let video_url = match validate(&self.input) {
      Ok(url) => url.to_string(),
      Err(e) => {
        self.error = Some(e.to_string());
        return Outcome::Rejected(e);
      }
    };

    self.error = None;
    let (base_url, endpoint_name) = match endpoints.resolve(&self.endpoint_id) {
      Some(endpoint) => (endpoint.url.as_str(), endpoint.name.clone()),
      None => {
        warn!(endpoint = %self.endpoint_id, "session: selected endpoint not configured");
        ("", constants().unknown_endpoint_label.clone())
      }
    };
    let composed = compose(base_url, &video_url);

    let warning = history.record(&video_url, &endpoint_name).err();

    let ticket = LoadTicket(self.next_ticket);
    self.next_ticket += 1;
    self.pending = Some(ticket);
    self.view = View::Loading;

    let target = PlayTarget { video_url, endpoint_name, composed };
    info!(url = %target.video_url, endpoint = %target.endpoint_name, "session: loading");
    self.target = Some(target.clone());
    Outcome::Loading { ticket, target, warning }
  }

  /// Finish the loading delay. Returns `false` for a ticket that is no longer current.
  pub fn finish_loading(&mut self, ticket: LoadTicket) -> bool {
    if self.view != View::Loading || self.pending != Some(ticket) {
      return false;
    }
    self.pending = None;
    self.view = View::Playing;
    true
  }

  /// Return to the home view. History is left alone.
  pub fn back(&mut self) {
    self.view = View::Home;
    self.input.clear();
    self.error = None;
    self.target = None;
    self.pending = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::endpoint::Endpoint;
  use crate::history::MemoryStore;

  fn endpoints() -> EndpointTable {
    EndpointTable::new(vec![
      Endpoint { id: "one".into(), name: "One".into(), url: "https://one.example/?url=".into() },
      Endpoint { id: "two".into(), name: "Two".into(), url: "https://two.example/p?v=".into() },
    ])
    .unwrap()
  }

  fn history() -> HistoryStore {
    HistoryStore::load(Box::new(MemoryStore::default()))
  }

  fn loading_ticket(outcome: Outcome) -> LoadTicket {
    match outcome {
      Outcome::Loading { ticket, .. } => ticket,
      Outcome::Rejected(e) => panic!("unexpected rejection: {}", e),
    }
  }

  // --- validate ---

  #[test]
  fn validate_empty_and_whitespace() {
    for raw in ["", " ", "\t\n ", "   \r\n"] {
      assert_eq!(validate(raw), Err(InputError::EmptyInput), "{:?}", raw);
    }
  }

  #[test]
  fn validate_malformed() {
    for raw in ["not a url", "::::", "/relative/path", "www.youku.com/x"] {
      assert!(matches!(validate(raw), Err(InputError::MalformedUrl(_))), "{:?}", raw);
    }
  }

  #[test]
  fn validate_accepts_any_scheme() {
    for raw in ["https://v.youku.com/x", "ftp://h/p", "magnet:?xt=urn:btih:abc", "http://localhost:8080"] {
      assert_eq!(validate(raw), Ok(raw));
    }
  }

  #[test]
  fn validate_trims() {
    assert_eq!(validate("  https://v.qq.com/a  "), Ok("https://v.qq.com/a"));
  }

  // --- submit ---

  #[test]
  fn rejected_submit_only_sets_error() {
    let mut history = history();
    let mut session = Session::new("one");
    session.input = "   ".into();
    assert!(matches!(session.submit(&mut history, &endpoints()), Outcome::Rejected(InputError::EmptyInput)));
    assert_eq!(session.view(), View::Home);
    assert_eq!(session.error(), Some("Please enter a video link."));
    assert_eq!(session.input, "   ");
    assert!(history.is_empty());

    session.input = "not a url".into();
    session.submit(&mut history, &endpoints());
    assert_eq!(session.error(), Some("Please enter a valid video link format."));
    assert!(session.target().is_none());
  }

  #[test]
  fn successful_submit_records_and_composes() {
    let mut history = history();
    let mut session = Session::new("two");
    session.set_error("stale");
    session.input = "https://v.youku.com/a b".into();

    match session.submit(&mut history, &endpoints()) {
      Outcome::Loading { target, warning, .. } => {
        assert_eq!(target.composed, "https://two.example/p?v=https%3A%2F%2Fv.youku.com%2Fa%20b");
        assert_eq!(target.endpoint_name, "Two");
        assert!(warning.is_none());
      }
      Outcome::Rejected(e) => panic!("unexpected rejection: {}", e),
    }
    assert_eq!(session.view(), View::Loading);
    assert_eq!(session.error(), None);
    assert_eq!(history.len(), 1);
    assert_eq!(history.entries()[0].endpoint_name, "Two");
  }

  #[test]
  fn unknown_endpoint_falls_back() {
    let mut history = history();
    let mut session = Session::new("gone");
    session.input = "https://v.youku.com/x".into();
    match session.submit(&mut history, &endpoints()) {
      Outcome::Loading { target, .. } => {
        assert_eq!(target.composed, "https%3A%2F%2Fv.youku.com%2Fx");
        assert_eq!(target.endpoint_name, "unknown endpoint");
      }
      Outcome::Rejected(e) => panic!("unexpected rejection: {}", e),
    }
    assert_eq!(history.entries()[0].endpoint_name, "unknown endpoint");
  }

  #[test]
  fn home_loading_playing_scenario() {
    let mut history = history();
    let mut session = Session::new("one");
    assert!(history.is_empty());
    assert_eq!(session.view(), View::Home);

    session.input = "https://v.youku.com/x".into();
    let ticket = loading_ticket(session.submit(&mut history, &endpoints()));
    assert_eq!(session.view(), View::Loading);
    assert!(session.finish_loading(ticket));
    assert_eq!(session.view(), View::Playing);
    assert_eq!(history.len(), 1);
  }

  #[test]
  fn stale_ticket_ignored() {
    let mut history = history();
    let mut session = Session::new("one");
    session.input = "https://a.example/1".into();
    let first = loading_ticket(session.submit(&mut history, &endpoints()));
    session.back();
    assert!(!session.finish_loading(first));
    assert_eq!(session.view(), View::Home);

    session.input = "https://a.example/2".into();
    let second = loading_ticket(session.submit(&mut history, &endpoints()));
    assert!(!session.finish_loading(first));
    assert_eq!(session.view(), View::Loading);
    assert!(session.finish_loading(second));
    assert!(!session.finish_loading(second));
  }

  #[test]
  fn back_resets_session_but_not_history() {
    let mut history = history();
    let mut session = Session::new("one");
    session.input = "https://a.example/1".into();
    let ticket = loading_ticket(session.submit(&mut history, &endpoints()));
    session.finish_loading(ticket);

    session.back();
    assert_eq!(session.view(), View::Home);
    assert!(session.input.is_empty());
    assert_eq!(session.error(), None);
    assert!(session.target().is_none());
    assert_eq!(session.endpoint_id, "one");
    assert_eq!(history.len(), 1);
  }
}
