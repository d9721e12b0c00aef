use ratatui::style::Color;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub const DARK: Theme = Theme {
  name: "dark",
  bg: Color::Rgb(24, 24, 28),
  fg: Color::Rgb(220, 220, 228),
  accent: Color::Rgb(0, 120, 212),
  muted: Color::Rgb(128, 128, 140),
  border: Color::Rgb(64, 64, 76),
  highlight_fg: Color::Rgb(255, 255, 255),
  highlight_bg: Color::Rgb(0, 90, 158),
  stripe_bg: Color::Rgb(32, 32, 38),
  status: Color::Rgb(120, 200, 255),
  error: Color::Rgb(240, 100, 100),
  key_fg: Color::Rgb(24, 24, 28),
  key_bg: Color::Rgb(160, 160, 172),
};

pub const LIGHT: Theme = Theme {
  name: "light",
  bg: Color::Rgb(250, 250, 250),
  fg: Color::Rgb(36, 36, 36),
  accent: Color::Rgb(0, 120, 212),
  muted: Color::Rgb(112, 112, 112),
  border: Color::Rgb(200, 200, 200),
  highlight_fg: Color::Rgb(255, 255, 255),
  highlight_bg: Color::Rgb(0, 120, 212),
  stripe_bg: Color::Rgb(240, 240, 242),
  status: Color::Rgb(0, 94, 166),
  error: Color::Rgb(196, 43, 28),
  key_fg: Color::Rgb(250, 250, 250),
  key_bg: Color::Rgb(96, 96, 96),
};

/// Theme flag: follows the system, with a manual toggle that holds until the system changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePreference {
  system_dark: bool,
  user_override: Option<bool>,
}

impl ThemePreference {
  pub fn new(system_dark: bool) -> Self {
    Self { system_dark, user_override: None }
  }

  pub fn with_override(mut self, dark: Option<bool>) -> Self {
    self.user_override = dark;
    self
  }

  pub fn is_dark(&self) -> bool {
    self.user_override.unwrap_or(self.system_dark)
  }

  /// Record the latest value reported by the system. A change replaces any manual toggle.
  pub fn report_system(&mut self, dark: bool) {
    if dark != self.system_dark {
      self.user_override = None;
    }
    self.system_dark = dark;
  }

  pub fn toggle(&mut self) {
    self.user_override = Some(!self.is_dark());
  }

  pub fn theme(&self) -> &'static Theme {
    if self.is_dark() { &DARK } else { &LIGHT }
  }
}

/// Ask the desktop for its light/dark preference, falling back to the terminal's `COLORFGBG`.
///
/// The desktop setting can change while the app runs; the environment cannot.
/// Unknown or missing values are treated as dark.
pub fn detect_system_dark() -> bool {
  query_desktop().or_else(|| parse_colorfgbg(std::env::var("COLORFGBG").ok().as_deref())).unwrap_or(true)
}

fn query_desktop() -> Option<bool> {
  if cfg!(target_os = "macos") {
    let mut cmd = Command::new("defaults");
    cmd.args(["read", "-g", "AppleInterfaceStyle"]);
    let output = run_query(cmd)?;
    // The key is absent (non-zero exit) in light mode.
    Some(parse_apple_interface_style(output.status.success(), &String::from_utf8_lossy(&output.stdout)))
  } else {
    let mut cmd = Command::new("gsettings");
    cmd.args(["get", "org.gnome.desktop.interface", "color-scheme"]);
    gnome_color_scheme(cmd)
  }
}

fn gnome_color_scheme(cmd: Command) -> Option<bool> {
  let output = run_query(cmd)?;
  if !output.status.success() {
    return None;
  }
  parse_gnome_color_scheme(&String::from_utf8_lossy(&output.stdout))
}

fn run_query(mut cmd: Command) -> Option<Output> {
  cmd.stdin(Stdio::null()).stderr(Stdio::null()).output().ok()
}

fn parse_apple_interface_style(success: bool, stdout: &str) -> bool {
  success && stdout.trim().eq_ignore_ascii_case("dark")
}

fn parse_gnome_color_scheme(stdout: &str) -> Option<bool> {
  match stdout.trim().trim_matches('\'') {
    "prefer-dark" => Some(true),
    "prefer-light" | "default" => Some(false),
    _ => None,
  }
}

fn parse_colorfgbg(value: Option<&str>) -> Option<bool> {
  let bg = value?.rsplit(';').next()?.trim().parse::<u8>().ok()?;
  Some(matches!(bg, 0..=6 | 8))
}

/// Live subscription to system theme changes. Dropping it unsubscribes.
pub struct Subscription {
  pub rx: mpsc::UnboundedReceiver<bool>,
  handle: JoinHandle<()>,
}

impl Subscription {
  /// Stop polling. Equivalent to dropping the subscription.
  pub fn unsubscribe(self) {
    drop(self);
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

/// Poll `detect` every `interval`, reporting only changes.
///
/// `detect` may shell out, so each poll runs on the blocking pool.
pub fn subscribe<F>(interval: Duration, detect: F) -> Subscription
where
  F: Fn() -> bool + Send + Sync + 'static,
{
  let (tx, rx) = mpsc::unbounded_channel();
  let mut last = detect();
  let detect = Arc::new(detect);
  let handle = tokio::spawn(async move {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
      ticker.tick().await;
      let poll = Arc::clone(&detect);
      let Ok(current) = tokio::task::spawn_blocking(move || poll()).await else {
        break;
      };
      if current != last {
        debug!(dark = current, "theme: system preference changed");
        last = current;
        if tx.send(current).is_err() {
          break;
        }
      }
    }
  });
  Subscription { rx, handle }
}
