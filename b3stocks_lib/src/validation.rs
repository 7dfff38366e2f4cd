use std::sync::OnceLock;

use regex::Regex;

use crate::error::StockDashError;
use crate::Period;

pub const MAX_TICKER_LENGTH: usize = 20;

/// Comparison views need at least this many tickers.
pub const MIN_COMPARISON_TICKERS: usize = 2;

/// Exchange-suffixed symbols (`PETR4.SA`), indices (`^BVSP`), currency pairs (`BRL=X`).
const TICKER_PATTERN: &str = r"^[A-Z0-9^][A-Z0-9.\-=^]{0,19}$";

fn ticker_regex() -> Result<&'static Regex, StockDashError> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TICKER_PATTERN))
        .as_ref()
        .map_err(|e| StockDashError::InvalidInput(format!("ticker pattern failed to compile: {}", e)))
}

/// Strip ASCII control characters (0x00-0x1F except space 0x20), trim whitespace,
/// and enforce a byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, StockDashError> {
    if input.len() > max_len {
        return Err(StockDashError::InvalidInput(format!(
            "input exceeds maximum length of {} bytes",
            max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_ascii_control() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(StockDashError::InvalidInput(
            "input is empty after sanitization".to_string(),
        ));
    }
    Ok(sanitized)
}

/// Validate a ticker symbol: trim, uppercase, check the symbol format.
pub fn validate_ticker(input: &str) -> Result<String, StockDashError> {
    let upper = sanitize_text(input, MAX_TICKER_LENGTH)?.to_uppercase();
    if ticker_regex()?.is_match(&upper) {
        Ok(upper)
    } else {
        Err(StockDashError::InvalidInput(format!(
            "invalid ticker '{}'. Expected an exchange symbol such as PETR4.SA",
            input.trim()
        )))
    }
}

/// Validate a list of tickers, dropping repeats while keeping first-seen order.
pub fn validate_tickers<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<String>, StockDashError> {
    let mut tickers: Vec<String> = Vec::with_capacity(inputs.len());
    for input in inputs {
        let ticker = validate_ticker(input.as_ref())?;
        if !tickers.contains(&ticker) {
            tickers.push(ticker);
        }
    }
    Ok(tickers)
}

/// Validate a period token (`1mo`, `1y`, `ytd`, ...), case-insensitive.
pub fn validate_period(input: &str) -> Result<Period, StockDashError> {
    input.parse::<Period>().map_err(StockDashError::InvalidInput)
}

/// Fails unless at least `min` tickers are selected.
pub fn require_selection(tickers: &[String], min: usize) -> Result<(), StockDashError> {
    if tickers.len() < min {
        return Err(StockDashError::Precondition(format!(
            "at least {} ticker{} required, got {}",
            min,
            if min == 1 { "" } else { "s" },
            tickers.len()
        )));
    }
    Ok(())
}
