use crate::context::AppContext;
use crate::report::StrategyTimingSummary;
use crate::strategy::STRATEGY_NAMES;
use anyhow::{anyhow, Result};
use log::{info, warn};

/// Run every registered strategy over the same universe. A strategy that fails
/// is logged and skipped; the others still produce reports.
pub fn run(app: &AppContext, tickers: Option<&[String]>) -> Result<Vec<StrategyTimingSummary>> {
    let writer = app.report_writer();
    let mut summaries = Vec::with_capacity(STRATEGY_NAMES.len());
    let mut failed = Vec::new();

    for name in STRATEGY_NAMES {
        let outcome = app
            .backtester()
            .run(name, tickers)
            .map_err(anyhow::Error::from)
            .and_then(|run| {
                writer.write_strategy_run(&run)?;
                writer.log_summary(&run);
                Ok(run)
            });

        match outcome {
            Ok(run) => summaries.push(StrategyTimingSummary::from_run(&run)),
            Err(err) => {
                warn!("{} did not complete: {:#}", name, err);
                failed.push(name);
            }
        }
    }

    if summaries.is_empty() {
        return Err(anyhow!("every strategy failed: {}", failed.join(", ")));
    }

    let path = writer.write_timing_summary(&summaries)?;
    info!(
        "Compared {} strategies ({} failed); timing summary at {}",
        summaries.len(),
        failed.len(),
        path.display()
    );
    Ok(summaries)
}
