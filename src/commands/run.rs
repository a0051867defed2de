use crate::backtester::StrategyRun;
use crate::context::AppContext;
use anyhow::Result;
use log::info;

pub fn run(app: &AppContext, strategy: &str, tickers: Option<&[String]>) -> Result<StrategyRun> {
    let run = app.backtester().run(strategy, tickers)?;

    let writer = app.report_writer();
    let paths = writer.write_strategy_run(&run)?;
    writer.log_summary(&run);
    info!(
        "Signals for {} written under {}",
        run.strategy,
        paths.signals_dir.display()
    );

    Ok(run)
}
