use crate::aggregator::PortfolioAggregator;
use crate::config::BacktestConfig;
use crate::data_context::{resolve_tickers, PriceSeriesProvider};
use crate::error::{BacktestError, BacktestResult};
use crate::models::{
    AggregatePortfolio, PortfolioState, SecurityFailure, SecurityTiming, SignalSeries,
};
use crate::retry::retry_load_operation;
use crate::simulator::SingleAssetSimulator;
use crate::strategy::{canonical_strategy_name, create_strategy, Strategy};
use crate::timing::{Phase, TimingRecorder};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use std::time::Instant;
use uuid::Uuid;

/// Signals and trajectory of one security that made it through the pipeline.
#[derive(Debug, Clone)]
pub struct SecurityRun {
    pub ticker: String,
    pub signals: SignalSeries,
    pub trajectory: Vec<PortfolioState>,
}

#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub run_id: Uuid,
    /// Registered class name, whichever spelling was requested.
    pub strategy: String,
    pub template_id: String,
    pub aggregate: AggregatePortfolio,
    pub securities: Vec<SecurityRun>,
    pub failures: Vec<SecurityFailure>,
    pub timings: Vec<SecurityTiming>,
    pub duration_seconds: f64,
}

impl StrategyRun {
    pub fn completed_tickers(&self) -> Vec<&str> {
        self.securities.iter().map(|s| s.ticker.as_str()).collect()
    }
}

/// Runs one strategy over a universe: load, signal and simulate each security in
/// parallel, then fold the trajectories into one portfolio.
pub struct Backtester<'a> {
    provider: &'a dyn PriceSeriesProvider,
    config: &'a BacktestConfig,
}

impl<'a> Backtester<'a> {
    pub fn new(provider: &'a dyn PriceSeriesProvider, config: &'a BacktestConfig) -> Self {
        Self { provider, config }
    }

    pub fn run(&self, strategy_name: &str, tickers: Option<&[String]>) -> BacktestResult<StrategyRun> {
        let strategy = create_strategy(strategy_name, self.config.strategy_parameters())?;
        let strategy_name = canonical_strategy_name(strategy_name).unwrap_or(strategy_name);
        let tickers = resolve_tickers(self.provider, tickers)?;
        let started = Instant::now();

        info!(
            "Running {} over {} tickers from {} (calendar policy: {})",
            strategy_name,
            tickers.len(),
            self.provider.describe(),
            self.config.calendar_policy.label()
        );

        let timing = TimingRecorder::new();
        let progress = self.progress_bar(tickers.len());
        let simulator = SingleAssetSimulator::new(self.config.initial_cash);
        let strategy_ref: &(dyn Strategy + Send + Sync) = strategy.as_ref();

        let outcomes: Vec<(String, BacktestResult<SecurityRun>)> =
            self.with_thread_pool(|| {
                tickers
                    .par_iter()
                    .map(|ticker| {
                        let outcome = self.run_security(strategy_ref, &simulator, ticker, &timing);
                        progress.inc(1);
                        (ticker.clone(), outcome)
                    })
                    .collect()
            });
        progress.finish_and_clear();

        let mut securities = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (ticker, outcome) in outcomes {
            match outcome {
                Ok(run) => securities.push(run),
                Err(err) => {
                    warn!("{} failed for {}: {}", strategy_name, ticker, err);
                    failures.push(SecurityFailure {
                        ticker,
                        strategy: strategy_name.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if securities.is_empty() {
            return Err(BacktestError::AllSecuritiesFailed {
                strategy: strategy_name.to_string(),
                failed: failures.len(),
            });
        }

        let mut aggregator = PortfolioAggregator::new(self.config.calendar_policy);
        for security in &securities {
            aggregator.add(&security.ticker, &security.trajectory)?;
        }
        let aggregate = aggregator.finish();

        let duration_seconds = started.elapsed().as_secs_f64();
        info!(
            "{} completed for {}/{} tickers in {:.2}s ({} aggregate dates)",
            strategy_name,
            securities.len(),
            tickers.len(),
            duration_seconds,
            aggregate.len()
        );

        Ok(StrategyRun {
            run_id: Uuid::new_v4(),
            strategy: strategy_name.to_string(),
            template_id: strategy.get_template_id().to_string(),
            aggregate,
            securities,
            failures,
            timings: timing.snapshot(),
            duration_seconds,
        })
    }

    fn run_security(
        &self,
        strategy: &(dyn Strategy + Send + Sync),
        simulator: &SingleAssetSimulator,
        ticker: &str,
        timing: &TimingRecorder,
    ) -> BacktestResult<SecurityRun> {
        let series = timing.time(ticker, Phase::Load, || {
            retry_load_operation!(
                ticker,
                self.config.load_max_attempts,
                self.config.load_retry_delay_ms,
                self.provider.load(ticker)
            )
        })?;
        let signals = timing.time(ticker, Phase::Signal, || strategy.generate_signals(&series))?;
        let trajectory = timing.time(ticker, Phase::Simulate, || simulator.run(&signals))?;

        Ok(SecurityRun {
            ticker: ticker.to_string(),
            signals,
            trajectory,
        })
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }

    fn with_thread_pool<T, F>(&self, operation: F) -> T
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads.max(1))
            .build()
        {
            Ok(pool) => pool.install(operation),
            Err(err) => {
                warn!("Falling back to the global thread pool: {}", err);
                operation()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalendarPolicy;
    use crate::data_context::InMemoryPriceProvider;
    use crate::models::{PricePoint, PriceSeries};
    use chrono::{Duration, NaiveDate};

    fn series(ticker: &str, start_offset: i64, closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(start_offset);
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + Duration::days(i as i64),
                close,
            })
            .collect();
        PriceSeries::new(ticker, points).unwrap()
    }

    fn test_config() -> BacktestConfig {
        BacktestConfig {
            benchmark_quantity: 2,
            show_progress: false,
            threads: 2,
            load_retry_delay_ms: 0,
            ..Default::default()
        }
    }

    #[test]
    fn benchmark_portfolio_sums_securities() {
        let provider = InMemoryPriceProvider::new()
            .with_series(series("AAA", 0, &[100.0, 105.0, 95.0]))
            .with_series(series("BBB", 0, &[10.0, 11.0, 12.0]));
        let config = test_config();
        let run = Backtester::new(&provider, &config)
            .run("BenchmarkStrategy", None)
            .unwrap();

        assert!(run.failures.is_empty());
        assert_eq!(run.completed_tickers(), vec!["AAA", "BBB"]);
        let totals: Vec<f64> = run.aggregate.points.iter().map(|(_, p)| p.total_assets).collect();
        assert_eq!(totals, vec![0.0, 12.0, -6.0]);
        assert_eq!(run.timings.len(), 2);
    }

    #[test]
    fn missing_security_is_reported_and_excluded() {
        let provider = InMemoryPriceProvider::new().with_series(series("AAA", 0, &[100.0, 101.0]));
        let config = test_config();
        let requested = vec!["AAA".to_string(), "GONE".to_string()];
        let run = Backtester::new(&provider, &config)
            .run("benchmark", Some(&requested))
            .unwrap();

        assert_eq!(run.strategy, "BenchmarkStrategy");
        assert_eq!(run.completed_tickers(), vec!["AAA"]);
        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failures[0].ticker, "GONE");
        assert!(run.failures[0].reason.contains("GONE"));
    }

    #[test]
    fn calendar_mismatch_fails_strict_runs_only() {
        let provider = InMemoryPriceProvider::new()
            .with_series(series("AAA", 0, &[100.0, 101.0, 102.0]))
            .with_series(series("NEW", 1, &[50.0, 51.0]));

        let strict = test_config();
        assert!(matches!(
            Backtester::new(&provider, &strict).run("BenchmarkStrategy", None),
            Err(BacktestError::CalendarMismatch { .. })
        ));

        let carry = BacktestConfig {
            calendar_policy: CalendarPolicy::CarryForward,
            ..test_config()
        };
        let run = Backtester::new(&provider, &carry)
            .run("BenchmarkStrategy", None)
            .unwrap();
        assert_eq!(run.aggregate.len(), 3);
    }

    #[test]
    fn unknown_strategy_and_empty_universe_are_fatal() {
        let provider = InMemoryPriceProvider::new();
        let config = test_config();
        let backtester = Backtester::new(&provider, &config);
        assert!(matches!(
            backtester.run("Nope", None),
            Err(BacktestError::UnknownStrategy(_))
        ));
        assert!(matches!(
            backtester.run("BenchmarkStrategy", None),
            Err(BacktestError::NoTickers(_))
        ));
    }

    #[test]
    fn all_failures_surface_as_an_error() {
        let provider = InMemoryPriceProvider::new();
        let config = test_config();
        let requested = vec!["X".to_string()];
        assert!(matches!(
            Backtester::new(&provider, &config).run("BenchmarkStrategy", Some(&requested)),
            Err(BacktestError::AllSecuritiesFailed { failed: 1, .. })
        ));
    }
}
