mod commands;
mod output;
mod xml_output;

use std::path::PathBuf;

use anyhow::Result;
use b3stocks_lib::universe::load_universe;
use b3stocks_lib::{DashboardConfig, MarketDataClient};
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "b3stocks")]
#[command(about = "Quotes, statistics and comparisons for stocks listed on B3")]
struct Cli {
    /// Output format: table, markdown, csv, json or xml
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote, company profile and period statistics for one ticker
    Stock(commands::stock::StockArgs),
    /// Compare cumulative returns, volatility and correlation across tickers
    Compare(commands::compare::CompareArgs),
    /// Daily OHLCV bars for one ticker
    History(commands::history::HistoryArgs),
    /// List the built-in tickers and periods
    Tickers,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("b3stocks=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format: OutputFormat = cli.output.parse()?;

    let config = DashboardConfig::load(cli.config.as_deref())?;
    let universe = load_universe()?;
    let client = MarketDataClient::new(&config);

    match &cli.command {
        Commands::Stock(args) => commands::stock::run(args, &client, &universe, &format).await?,
        Commands::Compare(args) => {
            commands::compare::run(args, &client, &universe, &format).await?
        }
        Commands::History(args) => {
            commands::history::run(args, &client, &universe, &format).await?
        }
        Commands::Tickers => commands::tickers::run(&universe, &format)?,
    }

    Ok(())
}
