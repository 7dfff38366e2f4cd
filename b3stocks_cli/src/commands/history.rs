use anyhow::{bail, Result};
use b3stocks_lib::universe::Universe;
use b3stocks_lib::validation::validate_ticker;
use b3stocks_lib::MarketDataClient;
use clap::Args;

use super::{report_failure, resolve_period};
use crate::output::{print_history, OutputFormat};

#[derive(Args)]
pub struct HistoryArgs {
    /// Ticker symbol (e.g. VALE3.SA)
    pub ticker: String,

    /// Period: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max
    #[arg(long)]
    pub period: Option<String>,
}

pub async fn run(
    args: &HistoryArgs,
    client: &MarketDataClient,
    universe: &Universe,
    format: &OutputFormat,
) -> Result<()> {
    let ticker = validate_ticker(&args.ticker)?;
    let period = resolve_period(args.period.as_deref(), universe)?;

    let table = match client.load_ticker_history(&ticker, period).await {
        Ok(table) => table,
        Err(e) => {
            report_failure(&ticker, "price history", &e, universe);
            bail!("no price history for {}", ticker);
        }
    };
    if table.is_empty() {
        eprintln!("Warning: no price data for {} over {}", ticker, period);
    }

    print_history(&table, period, format)
}
