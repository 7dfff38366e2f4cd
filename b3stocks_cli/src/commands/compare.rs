use anyhow::Result;
use b3stocks_lib::universe::Universe;
use b3stocks_lib::validation::{validate_tickers, MIN_COMPARISON_TICKERS};
use b3stocks_lib::{ComparisonReport, MarketDataClient, StockDashError};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use super::{report_failure, resolve_period};
use crate::output::{print_comparison, OutputFormat};

const SELECT_MORE: &str = "Please, select at least two stocks for analysis.";

#[derive(Args)]
pub struct CompareArgs {
    /// Tickers to compare (defaults to the built-in selection)
    pub tickers: Vec<String>,

    /// Period: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max
    #[arg(long)]
    pub period: Option<String>,
}

/// Explicit tickers win over the universe's default selection.
fn selected_tickers(args: &CompareArgs, universe: &Universe) -> Result<Vec<String>> {
    if args.tickers.is_empty() {
        Ok(universe.defaults.clone())
    } else {
        Ok(validate_tickers(&args.tickers)?)
    }
}

pub async fn run(
    args: &CompareArgs,
    client: &MarketDataClient,
    universe: &Universe,
    format: &OutputFormat,
) -> Result<()> {
    let tickers = selected_tickers(args, universe)?;
    let period = resolve_period(args.period.as_deref(), universe)?;

    if tickers.len() < MIN_COMPARISON_TICKERS {
        println!("{}", SELECT_MORE);
        return Ok(());
    }

    let pb = ProgressBar::new(tickers.len() as u64);
    pb.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({eta}) {msg}",
    )?);

    let result = ComparisonReport::load(client, &tickers, period, |ticker| {
        pb.set_message(ticker.to_string());
        pb.inc(1);
    })
    .await;
    pb.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(StockDashError::Precondition(msg)) => {
            eprintln!("Warning: {}", msg);
            println!("{}", SELECT_MORE);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for failure in &report.failures {
        report_failure(&failure.ticker, "price history", &failure.error, universe);
    }
    for ticker in &report.empty {
        eprintln!("Warning: no price data for {} over {}", ticker, period);
    }

    print_comparison(&report, format)
}
