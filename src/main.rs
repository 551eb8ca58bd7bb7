// src/main.rs

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use crossterm::{
    event::{self, Event, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use scanwatch::config::AppConfig;
use scanwatch::core::client::HttpScanApi;
use scanwatch::core::fetcher::CollectionKind;
use scanwatch::core::models::{ScanParams, Tool};
use scanwatch::core::poller::CancelToken;
use scanwatch::core::errors::SessionError;
use scanwatch::core::session::{ScanSession, ScanSource, SessionOutcome, WatchEvent, WatchRequest};
use scanwatch::logging;

mod app;
mod ui;

use app::App;

const LOG_TAIL_LINES: usize = 200;

#[derive(Parser, Debug)]
#[command(name = "scanwatch", version, about = "Watch a reconnaissance scan until it finishes and browse its results")]
struct Cli {
    /// JSON config file (defaults to $SCANWATCH_CONFIG, then the user config dir)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scanning tool, used as the endpoint prefix
    #[arg(long, default_value = "dnsx")]
    tool: Tool,

    /// Scope target id
    #[arg(long, required_unless_present = "scan_id")]
    target: Option<String>,

    /// Domain to include when starting a new scan (repeatable)
    #[arg(long = "domain", value_name = "DOMAIN")]
    domains: Vec<String>,

    /// Watch an existing scan instead of starting one
    #[arg(long, conflicts_with_all = ["resume", "domains"])]
    scan_id: Option<String>,

    /// Watch the target's most recent scan instead of starting one
    #[arg(long, conflicts_with = "domains")]
    resume: bool,

    /// Collections to fetch on success, comma separated (default: all)
    #[arg(long, value_delimiter = ',')]
    collections: Vec<CollectionKind>,
}

impl Cli {
    fn into_request(self) -> WatchRequest {
        let source = match (self.scan_id, self.resume) {
            (Some(scan_id), _) => ScanSource::Existing(scan_id),
            (None, true) => ScanSource::ResumeLatest,
            (None, false) => ScanSource::Create(ScanParams::with_domains(self.domains)),
        };
        let collections = if self.collections.is_empty() { CollectionKind::all() } else { self.collections };
        WatchRequest {
            tool: self.tool,
            scope_target_id: self.target,
            source,
            collections,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    logging::initialize_logging()?;

    let config = AppConfig::load(cli.config.as_deref()).wrap_err("loading configuration")?;
    let base_url = config.base_url()?;
    let api = Arc::new(HttpScanApi::new(base_url.clone(), config.request_timeout())?);
    info!(%base_url, tool = %cli.tool, "Starting scanwatch.");

    let request = cli.into_request();
    let cancel = CancelToken::new();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    let mut app = App::new(request.tool.clone(), request.collections.clone(), cancel.clone(), config.export_dir());

    let session = ScanSession::new(api, config.poll_policy());
    let session_cancel = cancel.clone();
    tokio::spawn(async move {
        let outcome = session.run(request, session_cancel, events_tx).await;
        let _ = done_tx.send(outcome);
    });

    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let result = run_loop(&mut terminal, &mut app, &mut events_rx, &mut done_rx).await;

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;
    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    events_rx: &mut mpsc::UnboundedReceiver<WatchEvent>,
    done_rx: &mut mpsc::UnboundedReceiver<Result<SessionOutcome, SessionError>>,
) -> Result<()> {
    while !app.should_quit {
        while let Ok(event) = events_rx.try_recv() {
            app.apply_event(event);
        }
        if let Ok(Err(e)) = done_rx.try_recv() {
            error!(error = %e, "Watch session failed.");
            app.session_failed(e.to_string());
        }
        if app.show_logs {
            app.log_content = logging::tail_log(LOG_TAIL_LINES);
        }
        app.on_tick();

        terminal.draw(|frame| ui::render(app, frame))?;

        // crossterm's poll blocks the thread; keep it short so session events stay live.
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }
        tokio::task::yield_now().await;
    }
    Ok(())
}
