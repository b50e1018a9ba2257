use clap::Parser;

use quote_board::app;
use quote_board::cli::Cli;
use quote_board::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    app::run(cli).await
}
