use crate::data_context::write_price_csv;
use crate::models::{PricePoint, PriceSeries};
use anyhow::{ensure, Context, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};

const DAILY_DRIFT: f64 = 0.0003;
const DAILY_SHOCK: f64 = 0.02;
const MIN_PRICE: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
pub struct SampleDataOptions {
    pub tickers: usize,
    pub days: usize,
    pub seed: u64,
    pub start: NaiveDate,
}

impl Default for SampleDataOptions {
    fn default() -> Self {
        Self {
            tickers: 5,
            days: 500,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
        }
    }
}

pub fn sample_ticker(index: usize) -> String {
    format!("SYN{:03}", index + 1)
}

/// Seeded random walk over weekdays; the same seed always yields the same series.
pub fn random_walk(ticker: &str, options: &SampleDataOptions, rng: &mut StdRng) -> Result<PriceSeries> {
    let mut price = rng.gen_range(20.0..200.0);
    let mut date = options.start;
    let mut points = Vec::with_capacity(options.days);

    while points.len() < options.days {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            points.push(PricePoint { date, close: price });
            let shock: f64 = rng.gen_range(-DAILY_SHOCK..DAILY_SHOCK);
            price = (price * (1.0 + DAILY_DRIFT + shock)).max(MIN_PRICE);
        }
        date += Duration::days(1);
    }

    Ok(PriceSeries::new(ticker, points)?)
}

pub fn run(output_dir: &Path, options: &SampleDataOptions) -> Result<Vec<PathBuf>> {
    ensure!(options.tickers > 0, "at least one ticker is required");
    ensure!(options.days > 1, "at least two days are required");

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut written = Vec::with_capacity(options.tickers);
    for index in 0..options.tickers {
        let ticker = sample_ticker(index);
        let series = random_walk(&ticker, options, &mut rng)?;
        let path = output_dir.join(format!("{}.csv", ticker));
        write_price_csv(&path, &series)?;
        written.push(path);
    }

    info!(
        "Wrote {} sample series of {} days to {} (seed {})",
        written.len(),
        options.days,
        output_dir.display(),
        options.seed
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_context::{CsvDirectoryProvider, PriceSeriesProvider};

    #[test]
    fn same_seed_reproduces_the_same_walk() {
        let options = SampleDataOptions {
            days: 30,
            ..Default::default()
        };
        let a = random_walk("X", &options, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = random_walk("X", &options, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 30);
        assert!(a
            .points()
            .iter()
            .all(|p| !matches!(p.date.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn written_files_are_readable_by_the_csv_provider() {
        let dir = tempfile::tempdir().unwrap();
        let options = SampleDataOptions {
            tickers: 2,
            days: 10,
            ..Default::default()
        };
        run(dir.path(), &options).unwrap();

        let provider = CsvDirectoryProvider::new(dir.path());
        assert_eq!(provider.list_tickers().unwrap(), vec!["SYN001", "SYN002"]);
        assert_eq!(provider.load("SYN002").unwrap().len(), 10);
    }
}
