//! Selectable tickers, default comparison basket and offered periods.
//!
//! Loaded from `seed_data/universe.yml`, embedded at compile time.

use serde::Deserialize;
use thiserror::Error;

use crate::Period;

#[derive(Error, Debug)]
pub enum UniverseError {
    #[error("Failed to parse universe YAML: {0}")]
    YamlParse(#[from] serde_yml::Error),
    #[error("Duplicate ticker in universe: {0}")]
    DuplicateTicker(String),
    #[error("Default ticker {0} is not part of the universe")]
    UnknownDefault(String),
    #[error("Default period {0} is not among the offered periods")]
    UnknownDefaultPeriod(Period),
    #[error("Universe lists no tickers")]
    Empty,
}

#[derive(Deserialize, Debug, Clone)]
struct UniverseFile {
    tickers: Vec<String>,
    #[serde(default)]
    defaults: Vec<String>,
    periods: Vec<Period>,
    #[serde(default)]
    default_period: Period,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub tickers: Vec<String>,
    pub defaults: Vec<String>,
    pub periods: Vec<Period>,
    pub default_period: Period,
}

/// Parse and check a universe document.
pub fn parse_universe(yaml_content: &str) -> Result<Universe, UniverseError> {
    let file: UniverseFile = serde_yml::from_str(yaml_content)?;

    if file.tickers.is_empty() {
        return Err(UniverseError::Empty);
    }
    let mut tickers: Vec<String> = Vec::with_capacity(file.tickers.len());
    for ticker in file.tickers {
        let ticker = ticker.trim().to_uppercase();
        if tickers.contains(&ticker) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    let defaults: Vec<String> = file
        .defaults
        .iter()
        .map(|t| t.trim().to_uppercase())
        .collect();
    if let Some(unknown) = defaults.iter().find(|t| !tickers.contains(t)) {
        return Err(UniverseError::UnknownDefault(unknown.clone()));
    }

    if !file.periods.is_empty() && !file.periods.contains(&file.default_period) {
        return Err(UniverseError::UnknownDefaultPeriod(file.default_period));
    }

    Ok(Universe {
        tickers,
        defaults,
        periods: file.periods,
        default_period: file.default_period,
    })
}

/// The built-in B3 universe.
pub fn load_universe() -> Result<Universe, UniverseError> {
    let yaml_content = include_str!("../../seed_data/universe.yml");
    parse_universe(yaml_content)
}

impl Universe {
    pub fn contains(&self, ticker: &str) -> bool {
        self.tickers.iter().any(|t| t.eq_ignore_ascii_case(ticker))
    }

    /// Universe members most similar to `ticker`, best first, at most `limit`.
    pub fn suggest(&self, ticker: &str, limit: usize) -> Vec<&str> {
        const MIN_SCORE: f64 = 0.8;
        let needle = ticker.trim().to_uppercase();
        let mut scored: Vec<(f64, &str)> = self
            .tickers
            .iter()
            .filter(|t| **t != needle)
            .map(|t| (strsim::jaro_winkler(&needle, t), t.as_str()))
            .filter(|(score, _)| *score >= MIN_SCORE)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(limit).map(|(_, t)| t).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_universe_is_valid() {
        let universe = load_universe().unwrap();
        assert!(universe.contains("PETR4.SA"));
        assert!(universe.contains("vale3.sa"));
        assert_eq!(universe.defaults.len(), 5);
        assert_eq!(universe.default_period, Period::OneYear);
        assert!(universe.periods.contains(&Period::YearToDate));
    }

    #[test]
    fn duplicate_rejected() {
        let yaml = r#"
tickers: ["PETR4.SA", "petr4.sa"]
periods: ["1y"]
"#;
        assert!(matches!(
            parse_universe(yaml).unwrap_err(),
            UniverseError::DuplicateTicker(t) if t == "PETR4.SA"
        ));
    }

    #[test]
    fn default_must_be_member() {
        let yaml = r#"
tickers: ["PETR4.SA"]
defaults: ["VALE3.SA"]
periods: ["1y"]
"#;
        assert!(matches!(
            parse_universe(yaml).unwrap_err(),
            UniverseError::UnknownDefault(_)
        ));
    }

    #[test]
    fn default_period_must_be_offered() {
        let yaml = r#"
tickers: ["PETR4.SA"]
periods: ["1mo", "3mo"]
default_period: "5y"
"#;
        assert!(matches!(
            parse_universe(yaml).unwrap_err(),
            UniverseError::UnknownDefaultPeriod(Period::FiveYears)
        ));
    }

    #[test]
    fn unknown_period_token_is_parse_error() {
        let yaml = r#"
tickers: ["PETR4.SA"]
periods: ["2w"]
"#;
        assert!(matches!(
            parse_universe(yaml).unwrap_err(),
            UniverseError::YamlParse(_)
        ));
    }

    #[test]
    fn suggest_close_symbols() {
        let universe = load_universe().unwrap();
        let hints = universe.suggest("PETR5.SA", 2);
        assert!(!hints.is_empty());
        assert!(hints.iter().all(|t| t.starts_with("PETR")));
        assert!(universe.suggest("ZZZZZZZZZZ", 3).is_empty());
    }
}
