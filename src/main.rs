mod app;
mod config;
mod constants;
mod endpoint;
mod history;
mod input;
mod session;
mod surface;
mod theme;
mod ui;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::io::Write;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::{App, AppOptions};
use config::Config;
use constants::constants;
use endpoint::EndpointTable;
use history::{FileStore, HistoryStore};
use session::{Outcome, Session};
use surface::Surface;
use theme::ThemePreference;

// --- CLI ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ThemeArg {
  Auto,
  Light,
  Dark,
}

impl ThemeArg {
  fn from_config(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "light" => ThemeArg::Light,
      "dark" => ThemeArg::Dark,
      _ => ThemeArg::Auto,
    }
  }

  fn as_override(self) -> Option<bool> {
    match self {
      ThemeArg::Auto => None,
      ThemeArg::Light => Some(false),
      ThemeArg::Dark => Some(true),
    }
  }
}

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Endpoint id to preselect (default: first configured endpoint)
  #[arg(short, long)]
  endpoint: Option<String>,

  /// Delay before switching to the player, in milliseconds
  #[arg(long)]
  delay_ms: Option<u64>,

  /// Color theme: 'auto' follows the terminal
  #[arg(short, long)]
  theme: Option<ThemeArg>,

  /// Validate and record URL, print the composed player address, then exit
  #[arg(short, long, value_name = "URL")]
  print: Option<String>,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<Shell>,
}

// --- Logging ---

/// Log to a daily file in the data directory; the terminal belongs to the UI.
fn init_logging() -> Result<WorkerGuard> {
  let proj_dirs = ProjectDirs::from("", "", "vp").context("Could not determine a home directory")?;
  let log_dir = proj_dirs.data_local_dir();
  std::fs::create_dir_all(log_dir).with_context(|| format!("Failed to create {}", log_dir.display()))?;
  let file_appender = tracing_appender::rolling::daily(log_dir, "vp.log");
  let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(non_blocking)
    .with_ansi(false)
    .try_init()
    .ok();
  Ok(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), "vp", &mut std::io::stdout());
    return Ok(());
  }

  let _guard = init_logging()?;
  let config = Config::load()?;
  let endpoints = EndpointTable::new(config.endpoints.clone().unwrap_or_else(|| constants().endpoints.clone()))?;
  let endpoint_id = args.endpoint.clone().or(config.default_endpoint.clone());
  let history = HistoryStore::load(Box::new(FileStore::open_default()?));

  if let Some(url) = args.print {
    let mut history = history;
    return print_composed(&mut std::io::stdout(), url, endpoint_id, &endpoints, &mut history);
  }

  let theme_arg = args.theme.or(config.theme.as_deref().map(ThemeArg::from_config)).unwrap_or(ThemeArg::Auto);
  let play_delay = args.delay_ms.or(config.play_delay_ms).unwrap_or(constants().play_delay_ms);
  let opts = AppOptions {
    endpoints,
    endpoint_id,
    history,
    surface: Surface::open_default()?,
    theme: ThemePreference::new(theme::detect_system_dark()).with_override(theme_arg.as_override()),
    play_delay: Duration::from_millis(play_delay),
    watch_theme: theme_arg == ThemeArg::Auto,
    auto_open: true,
  };
  info!(endpoints = opts.endpoints.len(), delay_ms = play_delay, "starting");

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let mut app = App::new(opts);
  let result = run(&mut terminal, &mut app);
  app.shutdown();
  ratatui::restore();
  result
}

/// Non-interactive `--print`: same validation and history as the UI, no delay.
fn print_composed(
  out: &mut impl Write,
  url: String,
  endpoint_id: Option<String>,
  endpoints: &EndpointTable,
  history: &mut HistoryStore,
) -> Result<()> {
  let mut session = Session::new(endpoint_id.unwrap_or_else(|| endpoints.first().id.clone()));
  session.input = url;
  match session.submit(history, endpoints) {
    Outcome::Rejected(e) => bail!(e),
    Outcome::Loading { target, warning, .. } => {
      if let Some(e) = warning {
        eprintln!("warning: {:#}", e);
      }
      writeln!(out, "{}", target.composed)?;
      Ok(())
    }
  }
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
  loop {
    app.check_pending();
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(app, key);
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }
  Ok(())
}
