use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::error::{AppError, Context, Result};
use crate::fetch::HttpMarketData;
use crate::notify::Notifier;
use crate::refresh::{RefreshDispatcher, ResultRouter};
use crate::sink::Board;
use crate::utils::{current_human_timestamp, snapshot_timestamp_slug};
use crate::watchlist::Watchlist;

/// Entry point used by `main` to wire config, client, board, and dispatcher.
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::builtin(),
    };
    if let Some(path) = &cli.watchlist {
        config.watchlist.path = path.clone();
    }

    match cli.command {
        Command::Refresh { output_dir } => refresh_once(&config, &output_dir).await,
        Command::Watch { interval_secs } => {
            watch(&config, interval_secs.unwrap_or(config.refresh.interval_secs)).await
        }
    }
}

fn build_dispatcher(
    config: &Config,
    watchlist: &Watchlist,
    notifier: Notifier,
) -> Result<RefreshDispatcher<HttpMarketData, Board>> {
    let client = Arc::new(HttpMarketData::new(&config.provider)?);
    let board = Board::new(watchlist);
    let router = Arc::new(ResultRouter::new(board, notifier.clone()));
    Ok(RefreshDispatcher::new(
        client,
        router,
        notifier,
        Duration::from_secs(config.refresh.task_timeout_secs),
    ))
}

async fn refresh_once(config: &Config, output_dir: &str) -> Result<()> {
    let watchlist = Watchlist::load(&config.watchlist)?;
    let notifier = Notifier::new();
    let dispatcher = build_dispatcher(config, &watchlist, notifier.clone())?;

    dispatcher.refresh(&watchlist).await?;
    dispatcher.drain().await;

    if !Path::new(output_dir).exists() {
        fs::create_dir_all(output_dir).context("Failed to create output directory")?;
    }
    let slug = snapshot_timestamp_slug();

    {
        let board = dispatcher.router().sink().await;
        let quotes_path = format!("{}/{}_quotes.csv", output_dir, slug);
        let chains_path = format!("{}/{}_chains.csv", output_dir, slug);
        board.save_to_csv(&quotes_path)?;
        board.save_chains_to_csv(&chains_path)?;
        print_summary(&board);
        println!("Saved: {} and {}", quotes_path, chains_path);
    }

    print_notifications(&notifier);
    Ok(())
}

async fn watch(config: &Config, interval_secs: u64) -> Result<()> {
    let notifier = Notifier::new();
    let initial = Watchlist::load(&config.watchlist)?;
    let dispatcher = build_dispatcher(config, &initial, notifier.clone())?;

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Re-read the watchlist at the start of every cycle; symbols
                // added since startup have no board row and are skipped with
                // a report.
                let watchlist = match Watchlist::load(&config.watchlist) {
                    Ok(watchlist) => watchlist,
                    Err(err) => {
                        notifier.error("Failed to read watchlist", &err);
                        continue;
                    }
                };
                match dispatcher.refresh(&watchlist).await {
                    Ok(()) => {}
                    Err(AppError::Cancelled) => break,
                    Err(err) => notifier.error("Refresh cycle failed to launch", &err),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                notifier.info("Shutdown requested; draining in-flight fetches");
                dispatcher.shutdown().await;
                break;
            }
        }
    }

    {
        let board = dispatcher.router().sink().await;
        print_summary(&board);
    }
    print_notifications(&notifier);
    Ok(())
}

fn print_summary(board: &Board) {
    println!("Board as of {}", current_human_timestamp());
    for row in board.rows() {
        let stale = if row.quote_pending || row.chain_pending {
            " *stale*"
        } else {
            ""
        };
        let strikes = board
            .chain(&row.symbol)
            .map(|chain| chain.len())
            .unwrap_or(0);
        println!(
            "{:<8} last {:>10} change {:>8} close {:>10} strikes {:>4}{}",
            row.symbol,
            cell(row.last),
            cell(row.change),
            cell(row.close),
            strikes,
            stale
        );
    }
}

fn cell(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.2}", value),
        None => "-".to_string(),
    }
}

fn print_notifications(notifier: &Notifier) {
    for entry in notifier.entries() {
        println!("{}", entry);
    }
}
