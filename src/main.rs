mod api;
mod app;
mod cache;
mod chart;
mod config;
mod error;
mod event;
mod evidence;
mod history;
mod models;
mod poller;
mod tui;
mod ui;
mod view;

use anyhow::Context;
use api::ApiClient;
use app::App;
use clap::Parser;
use config::{DeskConfig, DEFAULT_LOG_FILE};
use std::fs::File;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "BotDesk: terminal dashboard for the trading-bot arena",
    after_help = "EXAMPLES:
    # Watch a local backend
    botdesk-tui

    # Point at another backend and poll every 10 seconds
    botdesk-tui --api-url http://10.0.0.5:5000 --status-secs 10

    # Print the current leaderboard and exit
    botdesk-tui --snapshot"
)]
struct Args {
    /// Backend base URL (env: BOTDESK_API_URL, default http://127.0.0.1:5000)
    #[arg(long)]
    api_url: Option<String>,

    /// Leaderboard refresh period in seconds (env: BOTDESK_STATUS_POLL_SECS)
    #[arg(long)]
    status_secs: Option<u64>,

    /// Recommendation feed refresh period in seconds (env: BOTDESK_RECS_POLL_SECS)
    #[arg(long)]
    recs_secs: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log file; the terminal is owned by the dashboard
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: String,

    /// Fetch the leaderboard once, print it, and exit
    #[arg(long)]
    snapshot: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_file = File::create(&args.log_file)
        .with_context(|| format!("cannot open log file {}", args.log_file))?;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("botdesk_tui=info,reqwest=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let config = DeskConfig::resolve(args.api_url, args.status_secs, args.recs_secs, args.timeout_secs);
    info!("Starting BotDesk against {}", config.api_url);

    if args.snapshot {
        return print_snapshot(&config).await;
    }

    let mut app = App::new(config)?;
    let mut terminal = tui::init()?;
    let res = app.run(&mut terminal).await;

    tui::restore()?;

    if let Err(e) = res {
        error!("Error: {:?}", e);
        return Err(e.into());
    }

    Ok(())
}

async fn print_snapshot(config: &DeskConfig) -> anyhow::Result<()> {
    let api = ApiClient::new(config)?;
    let status = api
        .status()
        .await
        .with_context(|| format!("status request to {} failed", config.api_url))?;

    println!("{:<4} {:<24} {:<20} {:<8} {:>12} {:>8}", "#", "BOT", "NAME", "RISK", "PNL", "WIN%");
    for card in ui::roster_cards(&status.leaderboard) {
        println!(
            "{:<4} {:<24} {:<20} {:<8} {:>12.2} {:>8.1}",
            card.rank, card.title, card.name, card.risk, card.pnl, card.win_rate
        );
    }
    Ok(())
}
