//! Library layer for the B3 stocks dashboard: cached market-data accessor,
//! statistics engine, ticker universe, and dashboard assembly.
//!
//! Wraps the `b3stocks_api` crate with an in-memory TTL cache and retries,
//! converts upstream payloads into validated price tables and quote
//! snapshots, and computes the descriptive statistics the dashboard shows.

pub mod cache;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod quote;
pub mod series;
pub mod statistics;
pub mod universe;
pub mod validation;

pub use b3stocks_api;
pub use b3stocks_api::Period;

pub use client::MarketDataClient;
pub use config::DashboardConfig;
pub use dashboard::{ComparisonReport, StockDashboard, TickerFailure};
pub use error::{FetchError, StockDashError};
pub use quote::QuoteSnapshot;
pub use series::{
    ClosePriceMatrix, CumulativeReturnMatrix, PriceBar, PriceTable, ReturnMatrix, SeriesMatrix,
    TickerSeries,
};
pub use statistics::{CorrelationMatrix, RankEntry, StatBundle};
pub use universe::Universe;
