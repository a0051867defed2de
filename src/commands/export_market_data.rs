use crate::data_context::{CsvDirectoryProvider, InMemoryPriceProvider, PriceSeriesProvider};
use anyhow::{ensure, Result};
use log::info;
use std::path::Path;

/// Pack a directory of `<TICKER>.csv` files into one snapshot file.
pub fn run(data_dir: &Path, output_path: &Path) -> Result<usize> {
    info!(
        "Generating market data snapshot at {} from {}",
        output_path.display(),
        data_dir.display()
    );

    let source = CsvDirectoryProvider::new(data_dir);
    let market_data = InMemoryPriceProvider::collect_from(&source)?;
    let tickers = market_data.list_tickers()?.len();
    ensure!(
        tickers > 0,
        "no readable price series found in {}",
        data_dir.display()
    );

    market_data.save_to_file(output_path)?;
    info!(
        "Market data snapshot successfully written to {} ({} tickers)",
        output_path.display(),
        tickers
    );

    Ok(tickers)
}
