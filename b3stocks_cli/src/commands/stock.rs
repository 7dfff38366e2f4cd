use anyhow::{bail, Result};
use b3stocks_lib::universe::Universe;
use b3stocks_lib::validation::validate_ticker;
use b3stocks_lib::{MarketDataClient, StockDashboard};
use clap::Args;

use super::{report_failure, resolve_period};
use crate::output::{print_stock, OutputFormat};

#[derive(Args)]
pub struct StockArgs {
    /// Ticker symbol (e.g. PETR4.SA)
    pub ticker: String,

    /// Period: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max
    #[arg(long)]
    pub period: Option<String>,
}

pub async fn run(
    args: &StockArgs,
    client: &MarketDataClient,
    universe: &Universe,
    format: &OutputFormat,
) -> Result<()> {
    let ticker = validate_ticker(&args.ticker)?;
    let period = resolve_period(args.period.as_deref(), universe)?;

    let view = StockDashboard::load(client, &ticker, period).await;

    if let Err(e) = &view.quote {
        report_failure(&ticker, "quote", e, universe);
    }
    match &view.history {
        Err(e) => report_failure(&ticker, "price history", e, universe),
        Ok(table) if table.is_empty() => {
            eprintln!("Warning: no price data for {} over {}", ticker, period)
        }
        Ok(_) => {}
    }
    if view.quote.is_err() && view.history.is_err() {
        bail!("no data available for {}", ticker);
    }

    print_stock(&view, format)
}
