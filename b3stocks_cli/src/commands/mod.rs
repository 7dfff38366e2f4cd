//! CLI subcommand implementations.

pub mod compare;
pub mod history;
pub mod stock;
pub mod tickers;

use anyhow::Result;
use b3stocks_lib::universe::Universe;
use b3stocks_lib::validation::validate_period;
use b3stocks_lib::{FetchError, Period};

/// The requested period, or the universe default when none was given.
pub(crate) fn resolve_period(input: Option<&str>, universe: &Universe) -> Result<Period> {
    match input {
        Some(token) => Ok(validate_period(token)?),
        None => Ok(universe.default_period),
    }
}

/// Prints a fetch failure to stderr. Not-found tickers get a hint from the
/// universe when a similar symbol exists.
pub(crate) fn report_failure(ticker: &str, what: &str, error: &FetchError, universe: &Universe) {
    eprintln!("Warning: could not load {} for {}: {}", what, ticker, error);
    if matches!(error, FetchError::TickerNotFound(_)) {
        let hints = universe.suggest(ticker, 3);
        if !hints.is_empty() {
            eprintln!("  Did you mean: {}?", hints.join(", "));
        }
    }
}
