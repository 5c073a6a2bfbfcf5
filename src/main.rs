//! wikiscroll — browse Wikipedia as an infinite-scroll feed in the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐ FetchOutcome ┌──────────┐  draw()  ┌──────────┐
//! │  poll.rs │ ───────────► │  app.rs  │ ───────► │  ui.rs   │
//! │ (tasks)  │  (channel)   │ (state)  │ ◄─────── │ (render) │
//! └──────────┘              └──────────┘ viewport └──────────┘
//!      ▲   FetchRequest       ▲     │
//!      └──────────────────────┘     │ feed / scroll
//!                ┌──────────┐       ▼
//!                │ input.rs │  ┌─────────────────────┐
//!                └──────────┘  │ feed.rs  scroll.rs  │
//!                              └─────────────────────┘
//! ```
//!
//! * **`source/`** — the `ArticleSource` trait, the Wikipedia adapter, the
//!   category table and the offline sample set.
//! * **`feed`** — the feed state machine (filter, pages, in-flight flags).
//! * **`scroll`** — end and prefetch triggers over the visible window.
//! * **`poll`** — runs fetch requests on tokio tasks and reports back.
//! * **`app`** — owns all application state and wires the above together.
//! * **`ui`** — rendering: reads `App` state, records the viewport.
//! * **`input`** — maps key events to `App` mutations.
//! * **`config`** — the optional TOML config file.
//! * **`main`** — parse args, set up logging and the terminal, run the
//!   event loop.

mod app;
mod config;
mod feed;
mod input;
mod poll;
mod scroll;
mod source;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use app::App;
use config::Config;
use feed::{Feed, FeedQuery};
use scroll::ScrollTriggers;
use source::{ArticleSource, CategoryTable, SampleSource, WikipediaSource};

/// Redraw interval when nothing else happens.
const TICK_RATE: Duration = Duration::from_millis(250);

/// Browse Wikipedia as an endless feed of article cards.
#[derive(Debug, Parser)]
#[command(name = "wikiscroll", version, about)]
struct Args {
    /// Config file (default: ~/.config/wikiscroll/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Category to start on, e.g. "physics"
    #[arg(long, value_name = "NAME")]
    category: Option<String>,

    /// Start with a text search instead of a category
    #[arg(long, value_name = "TEXT")]
    search: Option<String>,

    /// Articles per page
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..=500))]
    page_size: Option<u16>,

    /// Use the built-in sample articles instead of the network
    #[arg(long)]
    offline: bool,

    /// Write logs to this file (filter with RUST_LOG)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// RAII terminal guard — idiomatic cleanup even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Config file merged with command-line overrides.
fn load_config(args: &Args) -> Result<Config> {
    let path = args.config.clone().or_else(Config::default_path);
    let mut config = match &path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(category) = &args.category {
        config.initial_category = category.trim().to_lowercase();
    }
    if let Some(page_size) = args.page_size {
        config.page_size = usize::from(page_size);
    }
    if args.log_file.is_some() {
        config.log_file = args.log_file.clone();
    }
    Ok(config)
}

/// Send `tracing` output to `path`.  Without a path, logs are discarded:
/// the terminal belongs to the UI.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("wikiscroll=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(config.log_file.as_deref())?;

    let categories = CategoryTable::with_overrides(&config.categories);
    let feed = Feed::new(config.page_size, config.initial_category.clone());
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        offline = args.offline,
        page_size = feed.page_size(),
        "Starting wikiscroll"
    );

    let mut app = App::new(feed, ScrollTriggers::new(config.scroll), categories.clone());

    match &args.search {
        Some(text) => {
            app.search_input = text.clone();
            app.submit_search();
        }
        None => app.set_filter(FeedQuery::category(config.initial_category.clone())),
    }

    if args.offline {
        return run(app, SampleSource).await;
    }

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.request_timeout())
        .build()
        .context("Failed to build HTTP client")?;
    let source = WikipediaSource::new(client, config.wikipedia.clone(), categories);
    run(app, source).await
}

/// Run the UI until the user quits.
///
/// Each turn of the loop renders (which records the viewport), runs the
/// scroll triggers, dispatches queued requests, then waits for a key, a
/// fetch outcome or the next tick.
async fn run<S: ArticleSource>(mut app: App, source: S) -> Result<()> {
    install_panic_hook();

    let (dispatcher, mut outcomes) = poll::channel(source);
    let mut guard = TerminalGuard::new()?;
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK_RATE);

    loop {
        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        app.check_triggers();
        for request in app.take_requests() {
            dispatcher.dispatch(request);
        }

        if app.quit {
            break;
        }

        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => input::handle_key_event(&mut app, key),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                None => break,
            },

            Some(outcome) = outcomes.recv() => app.handle_outcome(outcome),

            _ = tick.tick() => {}
        }
    }

    app.shutdown();
    tracing::info!("Exiting");
    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
