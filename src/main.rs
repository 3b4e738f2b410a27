mod app;
mod backend;
mod chat;
mod config;
mod constants;
mod error;
mod input;
mod search;
mod session;
mod theme;
mod ui;
mod upload;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::App;
use backend::HttpBackend;
use config::Config;
use constants::constants;
use session::SessionController;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Analysis server base URL (default: prefs, then http://localhost:8000)
  #[arg(short, long)]
  server: Option<String>,

  /// Seconds to wait for a search or chat reply
  #[arg(short, long)]
  timeout: Option<u64>,

  /// Write debug-level logs
  #[arg(long)]
  debug: bool,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<clap_complete::Shell>,

  /// Video file to open on start
  video: Option<PathBuf>,
}

// --- Logging ---

/// Logs go to a daily rolling file; the terminal belongs to the UI.
fn init_logging(debug: bool) -> Result<WorkerGuard> {
  let dir = config::log_dir();
  std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;
  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, "clipsage.log"));
  let default_filter = if debug { "clipsage=debug" } else { "clipsage=info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
  Ok(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), "clipsage", &mut std::io::stdout());
    return Ok(());
  }

  let _guard = init_logging(args.debug)?;

  let config = Config::load();
  let settings = config.settings(args.server.as_deref(), args.timeout);
  info!(server = %settings.server_url, timeout = ?settings.timeouts.request, "starting");
  let backend = HttpBackend::new(&settings.server_url)?;
  let session = SessionController::new(Arc::new(backend), settings.timeouts);
  let mut app = App::new(session, config);

  if let Some(path) = args.video {
    app.open_paths(&[path]);
  }

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    let _ = ratatui::crossterm::execute!(std::io::stdout(), DisableBracketedPaste);
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  ratatui::crossterm::execute!(std::io::stdout(), EnableBracketedPaste).context("Failed to enable bracketed paste")?;
  let result = run(&mut terminal, &mut app);
  let _ = ratatui::crossterm::execute!(std::io::stdout(), DisableBracketedPaste);
  ratatui::restore();
  info!("exiting");
  result
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
  let tick = Duration::from_millis(constants().tick_millis);

  loop {
    app.check_pending();

    terminal.draw(|frame| ui::ui(frame, app))?;

    if event::poll(tick)? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key_event(app, key),
        Event::Paste(text) => app.handle_paste(&text),
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }
  Ok(())
}
