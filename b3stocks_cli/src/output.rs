use std::io::Write;
use std::str::FromStr;

use anyhow::{bail, Result};
use b3stocks_lib::statistics::round2;
use b3stocks_lib::universe::Universe;
use b3stocks_lib::{
    ComparisonReport, CorrelationMatrix, Period, PriceBar, PriceTable, QuoteSnapshot, RankEntry,
    SeriesMatrix, StatBundle, StockDashboard, TickerFailure,
};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::xml_output;

#[derive(Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
    Xml,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "xml" => Ok(OutputFormat::Xml),
            other => bail!(
                "unknown output format '{}'. Valid formats: table, markdown, csv, json, xml",
                other
            ),
        }
    }
}

#[derive(Tabled, Serialize)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    #[serde(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Tabled, Serialize)]
struct BarRow {
    #[tabled(rename = "Date")]
    #[serde(rename = "Date")]
    date: String,
    #[tabled(rename = "Open")]
    #[serde(rename = "Open")]
    open: String,
    #[tabled(rename = "High")]
    #[serde(rename = "High")]
    high: String,
    #[tabled(rename = "Low")]
    #[serde(rename = "Low")]
    low: String,
    #[tabled(rename = "Close")]
    #[serde(rename = "Close")]
    close: String,
    #[tabled(rename = "Volume")]
    #[serde(rename = "Volume")]
    volume: u64,
}

#[derive(Tabled, Serialize)]
struct CloseRow {
    #[tabled(rename = "Date")]
    #[serde(rename = "Date")]
    date: String,
    #[tabled(rename = "Close")]
    #[serde(rename = "Close")]
    close: String,
}

#[derive(Tabled, Serialize)]
struct RankRow {
    #[tabled(rename = "Rank")]
    #[serde(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Ticker")]
    #[serde(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct RankingCsvRow<'a> {
    #[serde(rename = "Metric")]
    metric: &'a str,
    #[serde(rename = "Rank")]
    rank: usize,
    #[serde(rename = "Ticker")]
    ticker: &'a str,
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Tabled, Serialize)]
struct TickerRow {
    #[tabled(rename = "Ticker")]
    #[serde(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Default")]
    #[serde(rename = "Default")]
    default: String,
}

// Structured output for json and xml, rounded to 2 decimals.

#[derive(Serialize)]
struct StockOutput<'a> {
    ticker: &'a str,
    period: Period,
    #[serde(skip_serializing_if = "Option::is_none")]
    quote: Option<&'a QuoteSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quote_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    statistics: Option<StatBundle>,
    bars: &'a [PriceBar],
    #[serde(skip_serializing_if = "Option::is_none")]
    history_error: Option<String>,
}

impl<'a> StockOutput<'a> {
    fn from_view(view: &'a StockDashboard) -> Self {
        Self {
            ticker: &view.ticker,
            period: view.period,
            quote: view.quote.as_ref().ok(),
            quote_error: view.quote.as_ref().err().map(|e| e.to_string()),
            statistics: view.statistics.as_ref().map(rounded_stats),
            bars: view.history.as_ref().map(|t| t.bars()).unwrap_or(&[]),
            history_error: view.history.as_ref().err().map(|e| e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct HistoryOutput<'a> {
    ticker: &'a str,
    period: Period,
    bars: &'a [PriceBar],
}

#[derive(Serialize, Debug, PartialEq)]
struct MatrixRowOutput {
    date: String,
    values: Vec<Option<f64>>,
}

#[derive(Serialize, Debug, PartialEq)]
struct MatrixOutput {
    tickers: Vec<String>,
    rows: Vec<MatrixRowOutput>,
}

impl MatrixOutput {
    fn from_matrix(matrix: &SeriesMatrix) -> Self {
        Self {
            tickers: matrix.tickers().into_iter().map(String::from).collect(),
            rows: matrix
                .rows()
                .into_iter()
                .map(|(date, cells)| MatrixRowOutput {
                    date: date.to_string(),
                    values: cells.into_iter().map(|c| c.map(round2)).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ComparisonOutput<'a> {
    period: Period,
    cumulative_returns: MatrixOutput,
    correlation: CorrelationMatrix,
    cumulative_ranking: &'a [RankEntry],
    volatility_ranking: &'a [RankEntry],
    variation_ranking: &'a [RankEntry],
    empty: &'a [String],
    failures: &'a [TickerFailure],
}

impl<'a> ComparisonOutput<'a> {
    fn from_report(report: &'a ComparisonReport) -> Self {
        Self {
            period: report.period,
            cumulative_returns: MatrixOutput::from_matrix(&report.cumulative_returns),
            correlation: rounded_correlation(&report.correlation),
            cumulative_ranking: &report.cumulative_ranking,
            volatility_ranking: &report.volatility_ranking,
            variation_ranking: &report.variation_ranking,
            empty: &report.empty,
            failures: &report.failures,
        }
    }
}

#[derive(Serialize)]
struct UniverseOutput<'a> {
    tickers: &'a [String],
    defaults: &'a [String],
    periods: &'a [Period],
    default_period: Period,
}

fn rounded_stats(stats: &StatBundle) -> StatBundle {
    StatBundle {
        volatility: round2(stats.volatility),
        cumulative_return: round2(stats.cumulative_return),
        high: round2(stats.high),
        low: round2(stats.low),
        median: round2(stats.median),
        mean: round2(stats.mean),
        std_dev: round2(stats.std_dev),
        coefficient_variation: round2(stats.coefficient_variation),
    }
}

fn rounded_correlation(matrix: &CorrelationMatrix) -> CorrelationMatrix {
    CorrelationMatrix {
        tickers: matrix.tickers.clone(),
        values: matrix
            .values
            .iter()
            .map(|row| row.iter().map(|c| c.map(round2)).collect())
            .collect(),
    }
}

fn build_quote_rows(quote: &QuoteSnapshot) -> Vec<MetricRow> {
    vec![
        metric("Change %", format_pct(quote.pct_today)),
        metric("Last Price", format_brl(quote.last_price)),
        metric("Previous Close", format_brl(quote.previous_close)),
        metric("Open Price", format_brl(quote.open)),
        metric("Day High", format_brl(quote.day_high)),
        metric("Day Low", format_brl(quote.day_low)),
    ]
}

fn build_stat_rows(stats: &StatBundle) -> Vec<MetricRow> {
    vec![
        metric("Cumulative Return", format_pct(stats.cumulative_return)),
        metric("Annualized Volatility", format_pct(stats.volatility)),
        metric("Average Price", format_brl(stats.mean)),
        metric("Median Price", format_brl(stats.median)),
        metric("Standard Deviation", format_brl(stats.std_dev)),
        metric("Coefficient Variation", format_pct(stats.coefficient_variation)),
        metric("High Price", format_brl(stats.high)),
        metric("Low Price", format_brl(stats.low)),
    ]
}

fn metric(name: &str, value: String) -> MetricRow {
    MetricRow {
        metric: name.to_string(),
        value,
    }
}

fn build_bar_rows(bars: &[PriceBar]) -> Vec<BarRow> {
    bars.iter()
        .map(|b| BarRow {
            date: b.date.to_string(),
            open: format!("{:.2}", b.open),
            high: format!("{:.2}", b.high),
            low: format!("{:.2}", b.low),
            close: format!("{:.2}", b.close),
            volume: b.volume.max(0.0).round() as u64,
        })
        .collect()
}

fn build_close_rows(bars: &[PriceBar]) -> Vec<CloseRow> {
    bars.iter()
        .map(|b| CloseRow {
            date: b.date.to_string(),
            close: format_brl(b.close),
        })
        .collect()
}

fn build_rank_rows(entries: &[RankEntry], format: fn(f64) -> String) -> Vec<RankRow> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| RankRow {
            rank: i + 1,
            ticker: e.ticker.clone(),
            value: format(e.value),
        })
        .collect()
}

fn build_ticker_rows(universe: &Universe) -> Vec<TickerRow> {
    universe
        .tickers
        .iter()
        .map(|t| TickerRow {
            ticker: t.clone(),
            default: if universe.defaults.contains(t) {
                "yes".to_string()
            } else {
                String::new()
            },
        })
        .collect()
}

fn render_rows<T: Tabled>(rows: Vec<T>, markdown: bool) -> String {
    let mut table = Table::new(rows);
    if markdown {
        table.with(Style::markdown());
    }
    table.to_string()
}

/// Date by ticker grid; cells missing for a ticker render as "-".
fn render_matrix(matrix: &SeriesMatrix, format: fn(f64) -> String, markdown: bool) -> String {
    let mut builder = Builder::default();
    let mut header = vec!["Date".to_string()];
    header.extend(matrix.tickers().into_iter().map(String::from));
    builder.push_record(header);
    for (date, cells) in matrix.rows() {
        let mut record = vec![date.to_string()];
        record.extend(cells.into_iter().map(|c| format_cell(c, format)));
        builder.push_record(record);
    }
    let mut table = builder.build();
    if markdown {
        table.with(Style::markdown());
    }
    table.to_string()
}

fn render_correlation(matrix: &CorrelationMatrix, markdown: bool) -> String {
    let mut builder = Builder::default();
    let mut header = vec![String::new()];
    header.extend(matrix.tickers.iter().cloned());
    builder.push_record(header);
    for (ticker, row) in matrix.tickers.iter().zip(&matrix.values) {
        let mut record = vec![ticker.clone()];
        record.extend(row.iter().map(|c| format_cell(*c, |v| format!("{:.2}", v))));
        builder.push_record(record);
    }
    let mut table = builder.build();
    if markdown {
        table.with(Style::markdown());
    }
    table.to_string()
}

fn heading(title: &str, markdown: bool) -> String {
    if markdown {
        format!("## {}", title)
    } else {
        title.to_string()
    }
}

fn render_stock_text(view: &StockDashboard, markdown: bool) -> String {
    let mut sections: Vec<String> = Vec::new();

    match &view.quote {
        Ok(quote) => {
            let title = format!("{} ({})", quote.long_name, view.ticker);
            sections.push(if markdown {
                format!("# {}", title)
            } else {
                title
            });
            sections.push(render_rows(build_quote_rows(quote), markdown));

            let mut about = vec![heading("About", markdown)];
            about.extend(quote.summary_sentences());
            if !quote.website.is_empty() {
                about.push(format!("Website: {}", quote.website));
            }
            if !quote.sector.is_empty() || !quote.industry.is_empty() {
                about.push(format!("{} | {}", quote.sector, quote.industry));
            }
            sections.push(about.join("\n"));
        }
        Err(_) => sections.push(if markdown {
            format!("# {}", view.ticker)
        } else {
            view.ticker.clone()
        }),
    }

    if let Some(stats) = &view.statistics {
        sections.push(format!(
            "{}\n{}",
            heading(&format!("Statistics for the period ({})", view.period), markdown),
            render_rows(build_stat_rows(stats), markdown)
        ));
    }

    if let Ok(table) = &view.history {
        if !table.is_empty() {
            sections.push(format!(
                "{}\n{}",
                heading("Close price history", markdown),
                render_rows(build_close_rows(table.bars()), markdown)
            ));
        }
    }

    sections.join("\n\n")
}

fn render_comparison_text(report: &ComparisonReport, markdown: bool) -> String {
    let sections = [
        (
            format!("Cumulative returns, {} (%)", report.period),
            render_matrix(&report.cumulative_returns, format_pct, markdown),
        ),
        (
            "Correlation of daily returns".to_string(),
            render_correlation(&report.correlation, markdown),
        ),
        (
            "Ranking by cumulative return".to_string(),
            render_rows(
                build_rank_rows(&report.cumulative_ranking, format_pct),
                markdown,
            ),
        ),
        (
            "Ranking by annualized volatility".to_string(),
            render_rows(
                build_rank_rows(&report.volatility_ranking, format_pct),
                markdown,
            ),
        ),
        (
            "Ranking by coefficient of variation".to_string(),
            render_rows(
                build_rank_rows(&report.variation_ranking, format_pct),
                markdown,
            ),
        ),
    ];
    sections
        .iter()
        .map(|(title, body)| format!("{}\n{}", heading(title, markdown), body))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_universe_text(universe: &Universe, markdown: bool) -> String {
    let periods: Vec<&str> = universe.periods.iter().map(|p| p.as_str()).collect();
    format!(
        "{}\n\nPeriods: {} (default {})",
        render_rows(build_ticker_rows(universe), markdown),
        periods.join(", "),
        universe.default_period
    )
}

// -- Printers --

pub fn print_stock(view: &StockDashboard, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_stock_text(view, false)),
        OutputFormat::Markdown => println!("{}", render_stock_text(view, true)),
        OutputFormat::Csv => {
            let mut rows = view.quote.as_ref().map(build_quote_rows).unwrap_or_default();
            if let Some(stats) = &view.statistics {
                rows.extend(build_stat_rows(stats));
            }
            write_csv(std::io::stdout(), &rows)?;
        }
        OutputFormat::Json => print_json(&StockOutput::from_view(view))?,
        OutputFormat::Xml => print_xml("stock", &StockOutput::from_view(view))?,
    }
    Ok(())
}

pub fn print_history(table: &PriceTable, period: Period, format: &OutputFormat) -> Result<()> {
    let output = HistoryOutput {
        ticker: table.ticker(),
        period,
        bars: table.bars(),
    };
    match format {
        OutputFormat::Table => println!("{}", render_rows(build_bar_rows(table.bars()), false)),
        OutputFormat::Markdown => println!("{}", render_rows(build_bar_rows(table.bars()), true)),
        OutputFormat::Csv => write_csv(std::io::stdout(), &build_bar_rows(table.bars()))?,
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Xml => print_xml("history", &output)?,
    }
    Ok(())
}

pub fn print_comparison(report: &ComparisonReport, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_comparison_text(report, false)),
        OutputFormat::Markdown => println!("{}", render_comparison_text(report, true)),
        OutputFormat::Csv => write_comparison_csv(std::io::stdout(), report)?,
        OutputFormat::Json => print_json(&ComparisonOutput::from_report(report))?,
        OutputFormat::Xml => print_xml("comparison", &ComparisonOutput::from_report(report))?,
    }
    Ok(())
}

pub fn print_universe(universe: &Universe, format: &OutputFormat) -> Result<()> {
    let output = UniverseOutput {
        tickers: &universe.tickers,
        defaults: &universe.defaults,
        periods: &universe.periods,
        default_period: universe.default_period,
    };
    match format {
        OutputFormat::Table => println!("{}", render_universe_text(universe, false)),
        OutputFormat::Markdown => println!("{}", render_universe_text(universe, true)),
        OutputFormat::Csv => write_csv(std::io::stdout(), &build_ticker_rows(universe))?,
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Xml => print_xml("universe", &output)?,
    }
    Ok(())
}

pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

fn print_xml<T: Serialize>(root_tag: &str, data: &T) -> Result<()> {
    println!("{}", xml_output::to_xml(root_tag, data)?);
    Ok(())
}

fn write_csv<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One line per date with a column per ticker; missing cells are empty.
fn write_matrix_csv<W: Write>(writer: W, matrix: &SeriesMatrix) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header = vec!["Date".to_string()];
    header.extend(matrix.tickers().into_iter().map(String::from));
    wtr.write_record(&header)?;
    for (date, cells) in matrix.rows() {
        let mut record = vec![date.to_string()];
        record.extend(
            cells
                .into_iter()
                .map(|c| c.map(|v| format!("{:.2}", v)).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Cumulative return matrix, rankings and correlation as CSV sections
/// separated by a blank line.
fn write_comparison_csv<W: Write>(mut writer: W, report: &ComparisonReport) -> Result<()> {
    write_matrix_csv(&mut writer, &report.cumulative_returns)?;
    writer.write_all(b"\n")?;
    write_csv(&mut writer, &build_ranking_csv_rows(report))?;
    writer.write_all(b"\n")?;
    write_correlation_csv(&mut writer, &report.correlation)?;
    Ok(())
}

fn build_ranking_csv_rows(report: &ComparisonReport) -> Vec<RankingCsvRow<'_>> {
    [
        ("Cumulative Return", &report.cumulative_ranking),
        ("Annualized Volatility", &report.volatility_ranking),
        ("Coefficient Variation", &report.variation_ranking),
    ]
    .into_iter()
    .flat_map(|(metric, entries)| {
        entries.iter().enumerate().map(move |(i, e)| RankingCsvRow {
            metric,
            rank: i + 1,
            ticker: &e.ticker,
            value: format!("{:.2}", e.value),
        })
    })
    .collect()
}

fn write_correlation_csv<W: Write>(writer: W, matrix: &CorrelationMatrix) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header = vec!["Ticker".to_string()];
    header.extend(matrix.tickers.iter().cloned());
    wtr.write_record(&header)?;
    for (ticker, row) in matrix.tickers.iter().zip(&matrix.values) {
        let mut record = vec![ticker.clone()];
        record.extend(
            row.iter()
                .map(|c| c.map(|v| format!("{:.2}", v)).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// `1234567.891` -> `1,234,567.89`.
fn group_thousands(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && formatted != "0.00" {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac)
}

fn format_brl(value: f64) -> String {
    format!("R$ {}", group_thousands(value))
}

fn format_pct(value: f64) -> String {
    format!("{}%", group_thousands(value))
}

fn format_cell(cell: Option<f64>, format: fn(f64) -> String) -> String {
    cell.map(format).unwrap_or_else(|| "-".to_string())
}
