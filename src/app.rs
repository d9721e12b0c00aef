use ratatui::widgets::ListState;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::endpoint::{Endpoint, EndpointTable};
use crate::history::HistoryStore;
use crate::session::{LoadTicket, Outcome, Session, View};
use crate::surface::{Surface, open_in_browser};
use crate::theme::{self, Subscription, Theme, ThemePreference};

/// Which widget receives key presses on the home view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
  Input,
  History,
}

/// Everything `App::new` needs, resolved by `main` from config and flags.
pub struct AppOptions {
  pub endpoints: EndpointTable,
  pub endpoint_id: Option<String>,
  pub history: HistoryStore,
  pub surface: Surface,
  pub theme: ThemePreference,
  pub play_delay: Duration,
  /// Follow system theme changes while running.
  pub watch_theme: bool,
  /// Open the player page in the browser as soon as loading finishes.
  pub auto_open: bool,
}

/// The one-shot loading delay. Aborted on back or quit.
struct LoadingTimer {
  rx: oneshot::Receiver<LoadTicket>,
  handle: JoinHandle<()>,
}

pub struct App {
  pub session: Session,
  pub history: HistoryStore,
  pub endpoints: EndpointTable,
  pub theme_pref: ThemePreference,
  pub surface: Surface,
  pub play_delay: Duration,
  pub auto_open: bool,
  pub focus: Focus,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub history_state: ListState,
  pub status_message: Option<String>,
  /// Informational message, lower priority than status and error.
  pub info_message: Option<String>,
  /// Last player page written, reopened on demand.
  pub page_path: Option<PathBuf>,
  pub should_quit: bool,
  loading: Option<LoadingTimer>,
  theme_sub: Option<Subscription>,
  /// When the current error was set, for auto-dismiss.
  error_time: Option<Instant>,
}

impl App {
  pub fn new(opts: AppOptions) -> Self {
    let endpoint_id = match opts.endpoint_id {
      Some(id) => {
        if opts.endpoints.resolve(&id).is_none() {
          warn!(endpoint = %id, "app: requested endpoint is not configured");
        }
        id
      }
      None => opts.endpoints.first().id.clone(),
    };

    let theme_sub = opts.watch_theme.then(|| {
      theme::subscribe(Duration::from_secs(constants().theme_poll_secs), theme::detect_system_dark)
    });

    Self {
      session: Session::new(endpoint_id),
      history: opts.history,
      endpoints: opts.endpoints,
      theme_pref: opts.theme,
      surface: opts.surface,
      play_delay: opts.play_delay,
      auto_open: opts.auto_open,
      focus: Focus::Input,
      cursor_position: 0,
      input_scroll: 0,
      history_state: ListState::default(),
      status_message: None,
      info_message: None,
      page_path: None,
      should_quit: false,
      loading: None,
      theme_sub,
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static Theme {
    self.theme_pref.theme()
  }

  pub fn toggle_theme(&mut self) {
    self.theme_pref.toggle();
    debug!(dark = self.theme_pref.is_dark(), "app: theme toggled");
  }

  /// The selected endpoint, if it exists in the table.
  pub fn endpoint(&self) -> Option<&Endpoint> {
    self.endpoints.resolve(&self.session.endpoint_id)
  }

  pub fn next_endpoint(&mut self) {
    self.session.endpoint_id = self.endpoints.next_id(&self.session.endpoint_id).to_string();
  }

  pub fn prev_endpoint(&mut self) {
    self.session.endpoint_id = self.endpoints.prev_id(&self.session.endpoint_id).to_string();
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.session.set_error(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.session.clear_error();
    self.error_time = None;
  }

  /// Clear stale error messages after `error_display_secs`.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_display_secs)
    {
      self.clear_error();
    }
  }

  pub fn toggle_history(&mut self) {
    if self.history.is_empty() {
      self.session.show_history = false;
      return;
    }
    self.session.show_history = !self.session.show_history;
    if self.session.show_history {
      self.history_state.select(Some(0));
    } else {
      self.focus = Focus::Input;
    }
  }

  /// Copy a history entry's URL into the input and close the panel.
  pub fn select_history(&mut self, index: usize) {
    let Some(entry) = self.history.entries().get(index) else { return };
    self.session.input = entry.url.clone();
    self.cursor_position = self.session.input.chars().count();
    self.input_scroll = 0;
    self.session.show_history = false;
    self.focus = Focus::Input;
  }

  pub fn select_next_history(&mut self) {
    let count = self.history.len();
    if count > 0 {
      let i = self.history_state.selected().map_or(0, |i| (i + 1) % count);
      self.history_state.select(Some(i));
    }
  }

  pub fn select_prev_history(&mut self) {
    let count = self.history.len();
    if count > 0 {
      let i = self.history_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
      self.history_state.select(Some(i));
    }
  }

  pub fn trigger_submit(&mut self) {
    if self.session.view() != View::Home {
      return;
    }
    match self.session.submit(&mut self.history, &self.endpoints) {
      Outcome::Rejected(e) => {
        debug!(err = %e, "app: submission rejected");
        self.error_time = Some(Instant::now());
      }
      Outcome::Loading { ticket, target, warning } => {
        self.error_time = None;
        if let Some(e) = warning {
          let msg = format!("{:#}", e);
          warn!(err = %msg, "app: history not saved");
          self.info_message = Some(format!("History not saved: {}", msg));
        }
        self.session.show_history = false;
        self.focus = Focus::Input;
        self.status_message = Some(format!("Loading via {}…", target.endpoint_name));
        self.start_loading(ticket);
      }
    }
  }

  fn start_loading(&mut self, ticket: LoadTicket) {
    self.cancel_loading();
    let delay = self.play_delay;
    let (tx, rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      let _ = tx.send(ticket);
    });
    self.loading = Some(LoadingTimer { rx, handle });
  }

  fn cancel_loading(&mut self) {
    if let Some(timer) = self.loading.take() {
      timer.handle.abort();
      debug!("app: loading timer cancelled");
    }
  }

  /// Poll background tasks without blocking.
  pub fn check_pending(&mut self) {
    if let Some(sub) = self.theme_sub.as_mut() {
      while let Ok(dark) = sub.rx.try_recv() {
        self.theme_pref.report_system(dark);
      }
    }

    if let Some(mut timer) = self.loading.take() {
      match timer.rx.try_recv() {
        Ok(ticket) => {
          self.status_message = None;
          if self.session.finish_loading(ticket) {
            self.on_playing();
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.loading = Some(timer);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
          self.session.back();
          self.set_error("Loading task failed.".to_string());
        }
      }
    }
  }

  fn on_playing(&mut self) {
    let Some(target) = self.session.target().cloned() else { return };
    info!(composed = %target.composed, "app: playing");
    match self.surface.present(&target) {
      Ok(path) => {
        self.page_path = Some(path);
        if self.auto_open {
          self.open_player();
        }
      }
      Err(e) => self.set_error(format!("Player page failed: {:#}", e)),
    }
  }

  /// (Re)open the current player page in the browser.
  pub fn open_player(&mut self) {
    let Some(path) = self.page_path.clone() else { return };
    if let Err(e) = open_in_browser(&path) {
      self.set_error(format!("Failed to open browser: {:#}", e));
    }
  }

  /// Leave Loading or Playing for Home. History is untouched.
  pub fn back(&mut self) {
    self.cancel_loading();
    self.session.back();
    self.error_time = None;
    self.status_message = None;
    self.info_message = None;
    self.page_path = None;
    self.cursor_position = 0;
    self.input_scroll = 0;
    self.focus = Focus::Input;
  }

  pub fn shutdown(&mut self) {
    self.cancel_loading();
    if let Some(sub) = self.theme_sub.take() {
      sub.unsubscribe();
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::history::MemoryStore;

  pub(crate) fn test_app(delay_ms: u64, dir: &std::path::Path) -> App {
    let endpoints = EndpointTable::new(vec![
      Endpoint { id: "one".into(), name: "One".into(), url: "https://one.example/?url=".into() },
      Endpoint { id: "two".into(), name: "Two".into(), url: "https://two.example/?v=".into() },
    ])
    .unwrap();
    App::new(AppOptions {
      endpoints,
      endpoint_id: None,
      history: HistoryStore::load(Box::new(MemoryStore::default())),
      surface: Surface::new(dir),
      theme: ThemePreference::new(true),
      play_delay: Duration::from_millis(delay_ms),
      watch_theme: false,
      auto_open: false,
    })
  }

  async fn settle(app: &mut App) {
    tokio::time::sleep(Duration::from_millis(60)).await;
    app.check_pending();
  }

  #[tokio::test]
  async fn submit_transitions_home_loading_playing() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(10, dir.path());
    assert!(app.history.is_empty());
    assert_eq!(app.session.view(), View::Home);

    app.session.input = "https://v.youku.com/x".into();
    app.trigger_submit();
    assert_eq!(app.session.view(), View::Loading);
    assert!(app.status_message.is_some());

    settle(&mut app).await;
    assert_eq!(app.session.view(), View::Playing);
    assert_eq!(app.history.len(), 1);
    let page = app.page_path.clone().unwrap();
    let html = std::fs::read_to_string(page).unwrap();
    assert!(html.contains("https://one.example/?url=https%3A%2F%2Fv.youku.com%2Fx"));
  }

  #[tokio::test]
  async fn back_during_loading_cancels_timer() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(20, dir.path());
    app.session.input = "https://v.youku.com/x".into();
    app.trigger_submit();
    app.back();

    settle(&mut app).await;
    assert_eq!(app.session.view(), View::Home);
    assert!(app.page_path.is_none());
    assert_eq!(app.history.len(), 1);
  }

  #[tokio::test]
  async fn invalid_submit_sets_error_and_stays_home() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(0, dir.path());
    app.session.input = "not a url".into();
    app.trigger_submit();
    assert_eq!(app.session.view(), View::Home);
    assert_eq!(app.session.error(), Some("Please enter a valid video link format."));
    assert!(app.history.is_empty());
  }

  #[tokio::test]
  async fn history_selection_fills_input() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(0, dir.path());
    for url in ["https://a.example/1", "https://a.example/2"] {
      app.session.input = url.into();
      app.trigger_submit();
      settle(&mut app).await;
      app.back();
    }

    app.toggle_history();
    assert!(app.session.show_history);
    app.select_next_history();
    app.select_history(app.history_state.selected().unwrap());
    assert_eq!(app.session.input, "https://a.example/1");
    assert_eq!(app.cursor_position, "https://a.example/1".chars().count());
    assert!(!app.session.show_history);
  }

  #[tokio::test]
  async fn endpoint_cycling_wraps() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(0, dir.path());
    assert_eq!(app.session.endpoint_id, "one");
    app.next_endpoint();
    assert_eq!(app.endpoint().map(|e| e.name.as_str()), Some("Two"));
    app.next_endpoint();
    assert_eq!(app.session.endpoint_id, "one");
    app.prev_endpoint();
    assert_eq!(app.session.endpoint_id, "two");
  }

  #[tokio::test]
  async fn toggle_history_ignored_when_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(0, dir.path());
    app.toggle_history();
    assert!(!app.session.show_history);
  }
}
