use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "quote-board")]
#[command(about = "Refreshes equity quotes and option chains for a watchlist into a shared board")]
#[command(version)]
pub struct Cli {
    /// Path to a JSON config file; built-in defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the watchlist file from the config.
    #[arg(short, long)]
    pub watchlist: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a single refresh cycle and export the board
    Refresh {
        #[arg(short, long, default_value = "board_data")]
        output_dir: String,
    },

    /// Refresh on an interval until interrupted
    Watch {
        /// Seconds between cycles; falls back to the config value.
        #[arg(short, long)]
        interval_secs: Option<u64>,
    },
}
