use crate::backtester::Backtester;
use crate::config::BacktestConfig;
use crate::data_context::{CsvDirectoryProvider, InMemoryPriceProvider, PriceSeriesProvider};
use crate::report::ReportWriter;
use anyhow::{anyhow, Result};
use log::info;
use std::path::Path;

/// Configuration plus the price source every command reads from.
pub struct AppContext {
    config: BacktestConfig,
    provider: Box<dyn PriceSeriesProvider>,
}

impl AppContext {
    /// Read from `snapshot` when given, otherwise from the configured CSV directory.
    pub fn initialize(config: BacktestConfig, snapshot: Option<&Path>) -> Result<Self> {
        let provider: Box<dyn PriceSeriesProvider> = match snapshot {
            Some(path) => {
                ensure_market_data_file(path)?;
                Box::new(InMemoryPriceProvider::load_from_file(path)?)
            }
            None => {
                if !config.data_dir.is_dir() {
                    return Err(anyhow!(
                        "Price directory {} not found. Point --data-dir at a folder of <TICKER>.csv files or generate one with `generate-sample-data`.",
                        config.data_dir.display()
                    ));
                }
                Box::new(CsvDirectoryProvider::new(&config.data_dir))
            }
        };
        info!("Using price data from {}", provider.describe());
        Ok(Self::with_provider(config, provider))
    }

    pub fn with_provider(config: BacktestConfig, provider: Box<dyn PriceSeriesProvider>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn provider(&self) -> &dyn PriceSeriesProvider {
        self.provider.as_ref()
    }

    pub fn backtester(&self) -> Backtester<'_> {
        Backtester::new(self.provider(), &self.config)
    }

    pub fn report_writer(&self) -> ReportWriter {
        ReportWriter::new(&self.config.output_dir, self.config.baseline_capital)
    }
}

pub fn ensure_market_data_file(path: &Path) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }

    Err(anyhow!(
        "Market data snapshot not found at {}. Generate it with `export-market-data` before running this command.",
        path.display()
    ))
}
