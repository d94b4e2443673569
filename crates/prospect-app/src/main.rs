// Prospect radar entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Parse the command line
// 3. Load config
// 4. Open database
// 5. Load the Players and Config sources
// 6. Build the scouting board
// 7. Build the intel client
// 8. Run the command, streaming intel output to stderr
// 9. Print the result

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};

use prospect_app::cli::{Cli, Command};
use prospect_app::commands;
use prospect_core::board::ScoutingBoard;
use prospect_core::config;
use prospect_core::db::Database;
use prospect_core::source::load_rows;
use prospect_llm::client::{IntelClient, IntelEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Prospect radar starting up");

    // 2. Parse the command line
    let cli = Cli::parse();

    // 3. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: players={}, leagues={}, model={}",
        config.data.players, config.data.leagues, config.llm.model
    );

    // 4. Open database
    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db_path = config.db_path.to_string_lossy().into_owned();
    let db = Database::open(&db_path).context("failed to open database")?;
    info!("Database opened at {}", db_path);

    // 5. Load the Players and Config sources
    let player_rows = load_rows(Path::new(&config.data.players)).context("failed to load players")?;
    let league_rows = load_rows(Path::new(&config.data.leagues)).context("failed to load leagues")?;
    info!(
        "Loaded {} player rows, {} config rows",
        player_rows.len(),
        league_rows.len()
    );

    // 6. Build the scouting board
    let mut board = ScoutingBoard::from_rows(&player_rows, &league_rows, db);

    // 7. Build the intel client
    let intel = IntelClient::from_config(&config);
    if intel.is_active() {
        info!("Intel client initialized (API key configured)");
    } else {
        info!("Intel client disabled (no API key)");
    }

    // 8. Run the command, streaming intel output to stderr
    let now = chrono::Utc::now();
    let (events, printer) = if matches!(cli.command, Command::Intel { .. }) {
        let (tx, rx) = mpsc::channel(256);
        (Some(tx), Some(tokio::spawn(print_events(rx))))
    } else {
        (None, None)
    };

    let result = commands::run(cli.command, &mut board, &intel, events, now).await;
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    // 9. Print the result
    match result {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            Err(e)
        }
    }
}

/// Echo streamed intel tokens as they arrive.
async fn print_events(mut rx: mpsc::Receiver<IntelEvent>) {
    let mut streamed = false;
    while let Some(event) = rx.recv().await {
        match event {
            IntelEvent::Token(text) => {
                eprint!("{text}");
                streamed = true;
            }
            IntelEvent::Source(source) => info!("Intel source: {} <{}>", source.title, source.url),
        }
    }
    if streamed {
        eprintln!("\n");
    }
}

/// Initialize tracing to log to a file so stdout stays clean for output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("prospect-radar.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("prospect_app=info,prospect_core=info,prospect_llm=info,warn")
        }))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
