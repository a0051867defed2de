use crate::error::{BacktestError, BacktestResult};
use crate::models::{PricePoint, PriceSeries};
use chrono::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const MARKET_DATA_SNAPSHOT_VERSION: u32 = 1;
const DATE_COLUMNS: [&str; 3] = ["Date", "date", "timestamp"];
/// Close columns in order of preference; adjusted closes win over raw closes.
pub const CLOSE_COLUMNS: [&str; 5] = ["AdjClose", "Adj Close", "adj_close", "Close", "close"];

/// Source of daily close series, one per ticker.
pub trait PriceSeriesProvider: Send + Sync {
    fn load(&self, ticker: &str) -> BacktestResult<PriceSeries>;
    /// Tickers this provider can serve, sorted.
    fn list_tickers(&self) -> BacktestResult<Vec<String>>;
    fn describe(&self) -> String;
}

/// One `<TICKER>.csv` per security inside a directory.
pub struct CsvDirectoryProvider {
    data_dir: PathBuf,
}

impl CsvDirectoryProvider {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn series_path(&self, ticker: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", ticker))
    }
}

impl PriceSeriesProvider for CsvDirectoryProvider {
    fn load(&self, ticker: &str) -> BacktestResult<PriceSeries> {
        let path = self.series_path(ticker);
        if !path.exists() {
            return Err(BacktestError::NotFound {
                ticker: ticker.to_string(),
            });
        }
        let file = File::open(&path).map_err(|source| BacktestError::Io {
            ticker: ticker.to_string(),
            source,
        })?;
        read_price_csv(ticker, BufReader::new(file))
    }

    fn list_tickers(&self) -> BacktestResult<Vec<String>> {
        let entries = fs::read_dir(&self.data_dir).map_err(|source| BacktestError::Io {
            ticker: self.data_dir.display().to_string(),
            source,
        })?;

        let mut tickers = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_csv = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if !is_csv {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                tickers.push(stem.to_string());
            }
        }
        tickers.sort();
        Ok(tickers)
    }

    fn describe(&self) -> String {
        self.data_dir.display().to_string()
    }
}

/// Parse a `Date,<close>` table. The close column is the first recognized name in
/// [`CLOSE_COLUMNS`]; rows may arrive in any order.
pub fn read_price_csv<R: std::io::Read>(ticker: &str, reader: R) -> BacktestResult<PriceSeries> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|err| invalid_csv(ticker, err))?
        .clone();

    let date_index = headers
        .iter()
        .position(|h| DATE_COLUMNS.contains(&h))
        // Index-style exports leave the date column unnamed.
        .or_else(|| headers.iter().position(|h| h.is_empty()))
        .ok_or_else(|| {
            BacktestError::InvalidInput(format!("{} has no date column", ticker))
        })?;
    let close_index = CLOSE_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h == *name))
        .ok_or_else(|| {
            BacktestError::InvalidInput(format!(
                "{} has no recognized close column (expected one of {})",
                ticker,
                CLOSE_COLUMNS.join(", ")
            ))
        })?;

    let mut points = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|err| invalid_csv(ticker, err))?;
        let raw_date = record.get(date_index).unwrap_or_default();
        let raw_close = record.get(close_index).unwrap_or_default();
        if raw_close.is_empty() {
            // Missing closes are gaps in the source, not prices.
            continue;
        }
        let date = parse_date(raw_date).ok_or_else(|| {
            BacktestError::InvalidInput(format!(
                "{} row {} has an unparseable date '{}'",
                ticker,
                line + 2,
                raw_date
            ))
        })?;
        let close = raw_close.parse::<f64>().map_err(|_| {
            BacktestError::InvalidInput(format!(
                "{} row {} has a non-numeric close '{}'",
                ticker,
                line + 2,
                raw_close
            ))
        })?;
        points.push(PricePoint { date, close });
    }

    PriceSeries::from_unsorted(ticker, points)
}

fn invalid_csv(ticker: &str, err: csv::Error) -> BacktestError {
    BacktestError::InvalidInput(format!("{} is not a readable price table: {}", ticker, err))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Write a series in the layout [`read_price_csv`] accepts.
pub fn write_price_csv<P: AsRef<Path>>(path: P, series: &PriceSeries) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(["Date", "AdjClose"])?;
    for point in series.points() {
        writer.write_record([point.date.format("%Y-%m-%d").to_string(), point.close.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct MarketDataSnapshot {
    version: u32,
    generated_at: DateTime<Utc>,
    series: BTreeMap<String, Vec<PricePoint>>,
}

/// Every series held in memory; backs both snapshot files and tests.
#[derive(Default)]
pub struct InMemoryPriceProvider {
    series: BTreeMap<String, PriceSeries>,
}

impl InMemoryPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.ticker().to_string(), series);
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }

    /// Load every series a provider lists, skipping tickers that fail to load.
    pub fn collect_from(provider: &dyn PriceSeriesProvider) -> BacktestResult<Self> {
        let mut collected = Self::new();
        for ticker in provider.list_tickers()? {
            match provider.load(&ticker) {
                Ok(series) => collected.insert(series),
                Err(err) => log::warn!("Skipping {} while collecting market data: {}", ticker, err),
            }
        }
        Ok(collected)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> BacktestResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            BacktestError::Snapshot(format!(
                "failed to open market data snapshot at {}: {}",
                path.display(),
                err
            ))
        })?;
        let snapshot: MarketDataSnapshot = bincode::deserialize_from(BufReader::new(file))
            .map_err(|err| BacktestError::Snapshot(format!("snapshot decode failed: {}", err)))?;

        if snapshot.version != MARKET_DATA_SNAPSHOT_VERSION {
            return Err(BacktestError::Snapshot(format!(
                "version mismatch (found {}, expected {})",
                snapshot.version, MARKET_DATA_SNAPSHOT_VERSION
            )));
        }

        let mut provider = Self::new();
        for (ticker, points) in snapshot.series {
            provider.insert(PriceSeries::new(ticker, points)?);
        }
        info!(
            "Loaded market data snapshot from {} ({} tickers, generated {})",
            path.display(),
            provider.series.len(),
            snapshot.generated_at.format("%Y-%m-%d %H:%M")
        );
        Ok(provider)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        use anyhow::Context;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create snapshot directory {}", parent.display())
                })?;
            }
        }

        let file = File::create(path).with_context(|| {
            format!(
                "Unable to create market data snapshot at {}",
                path.display()
            )
        })?;
        let mut writer = BufWriter::new(file);
        let snapshot = MarketDataSnapshot {
            version: MARKET_DATA_SNAPSHOT_VERSION,
            generated_at: Utc::now(),
            series: self
                .series
                .iter()
                .map(|(ticker, series)| (ticker.clone(), series.points().to_vec()))
                .collect(),
        };
        bincode::serialize_into(&mut writer, &snapshot)
            .context("Failed to serialize market data snapshot")?;
        writer
            .flush()
            .context("Failed to flush market data snapshot to disk")?;
        Ok(())
    }
}

impl PriceSeriesProvider for InMemoryPriceProvider {
    fn load(&self, ticker: &str) -> BacktestResult<PriceSeries> {
        self.series
            .get(ticker)
            .cloned()
            .ok_or_else(|| BacktestError::NotFound {
                ticker: ticker.to_string(),
            })
    }

    fn list_tickers(&self) -> BacktestResult<Vec<String>> {
        Ok(self.series.keys().cloned().collect())
    }

    fn describe(&self) -> String {
        format!("in-memory market data ({} tickers)", self.series.len())
    }
}

/// Trims surrounding whitespace. Case is kept: tickers name files, and
/// `aapl.csv` must stay reachable as `aapl`.
pub fn normalize_ticker_symbol(value: &str) -> Option<String> {
    let normalized = value.trim().to_string();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Resolve an explicit ticker list, or everything the provider knows about.
pub fn resolve_tickers(
    provider: &dyn PriceSeriesProvider,
    requested: Option<&[String]>,
) -> BacktestResult<Vec<String>> {
    let tickers: Vec<String> = match requested {
        Some(list) => {
            let mut tickers: Vec<String> = list
                .iter()
                .filter_map(|ticker| normalize_ticker_symbol(ticker))
                .collect();
            tickers.sort();
            tickers.dedup();
            tickers
        }
        None => provider.list_tickers()?,
    };

    if tickers.is_empty() {
        return Err(BacktestError::NoTickers(provider.describe()));
    }
    Ok(tickers)
}
