use crate::backtester::StrategyRun;
use crate::models::{AggregatePortfolio, SecurityFailure, SecurityTiming, SignalSeries};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioReportRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Cash")]
    pub cash: f64,
    #[serde(rename = "Holdings")]
    pub holdings: f64,
    #[serde(rename = "Total Assets")]
    pub total_assets: f64,
    #[serde(rename = "PnL")]
    pub pnl: f64,
}

#[derive(Debug, Serialize)]
struct SignalReportRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "ClosePrice")]
    close_price: f64,
    signal: i64,
}

#[derive(Debug, Serialize)]
struct TimingReportRow<'a> {
    ticker: &'a str,
    load_seconds: f64,
    signal_seconds: f64,
    simulate_seconds: f64,
    total_seconds: f64,
}

/// One line of `timing_summary.csv`. Phase totals and the mean cover the
/// completed securities only, the same population as `securities`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyTimingSummary {
    pub strategy: String,
    pub securities: usize,
    pub failures: usize,
    pub load_seconds: f64,
    pub signal_seconds: f64,
    pub simulate_seconds: f64,
    pub mean_security_seconds: f64,
    pub wall_seconds: f64,
}

impl StrategyTimingSummary {
    pub fn from_run(run: &StrategyRun) -> Self {
        let completed = run.completed_tickers();
        let timings: Vec<&SecurityTiming> = run
            .timings
            .iter()
            .filter(|t| completed.contains(&t.ticker.as_str()))
            .collect();
        let sum = |phase: fn(&SecurityTiming) -> f64| -> f64 { timings.iter().map(|t| phase(t)).sum() };
        let load_seconds = sum(|t| t.load.as_secs_f64());
        let signal_seconds = sum(|t| t.signal.as_secs_f64());
        let simulate_seconds = sum(|t| t.simulate.as_secs_f64());
        let mean_security_seconds = if timings.is_empty() {
            0.0
        } else {
            (load_seconds + signal_seconds + simulate_seconds) / timings.len() as f64
        };

        Self {
            strategy: run.strategy.clone(),
            securities: run.securities.len(),
            failures: run.failures.len(),
            load_seconds,
            signal_seconds,
            simulate_seconds,
            mean_security_seconds,
            wall_seconds: run.duration_seconds,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunManifest<'a> {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub strategy: &'a str,
    pub template_id: &'a str,
    pub baseline_capital: f64,
    pub tickers: Vec<&'a str>,
    pub failures: &'a [SecurityFailure],
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub final_total_assets: Option<f64>,
    pub final_pnl: Option<f64>,
    pub duration_seconds: f64,
}

/// Every file written for one strategy run.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub portfolio: PathBuf,
    pub signals_dir: PathBuf,
    pub timing: PathBuf,
    pub manifest: PathBuf,
}

/// Shift the aggregate by the reporting baseline and derive PnL against the first date.
///
/// The baseline is presentation only: it lands in Cash and Total Assets but
/// never in Holdings or PnL.
pub fn portfolio_rows(aggregate: &AggregatePortfolio, baseline_capital: f64) -> Vec<PortfolioReportRow> {
    let Some((_, first)) = aggregate.first() else {
        return Vec::new();
    };
    let initial_total = first.total_assets;

    aggregate
        .points
        .iter()
        .map(|(date, point)| PortfolioReportRow {
            date: *date,
            cash: point.cash + baseline_capital,
            holdings: point.holdings_value,
            total_assets: point.total_assets + baseline_capital,
            pnl: point.total_assets - initial_total,
        })
        .collect()
}

pub struct ReportWriter {
    output_dir: PathBuf,
    baseline_capital: f64,
}

impl ReportWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P, baseline_capital: f64) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            baseline_capital,
        }
    }

    pub fn write_strategy_run(&self, run: &StrategyRun) -> Result<ReportPaths> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("failed to create output directory {}", self.output_dir.display())
        })?;

        let paths = ReportPaths {
            portfolio: self.write_portfolio_csv(run)?,
            signals_dir: self.write_signal_csvs(run)?,
            timing: self.write_timing_csv(run)?,
            manifest: self.write_manifest(run)?,
        };
        info!(
            "Wrote {} report to {}",
            run.strategy,
            paths.portfolio.display()
        );
        Ok(paths)
    }

    pub fn write_portfolio_csv(&self, run: &StrategyRun) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{}.csv", run.strategy));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        for row in portfolio_rows(&run.aggregate, self.baseline_capital) {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(path)
    }

    pub fn write_signal_csvs(&self, run: &StrategyRun) -> Result<PathBuf> {
        let dir = self.output_dir.join("signals").join(&run.strategy);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create signal directory {}", dir.display()))?;
        for security in &run.securities {
            write_signal_csv(&dir.join(format!("{}.csv", security.ticker)), &security.signals)?;
        }
        Ok(dir)
    }

    pub fn write_timing_csv(&self, run: &StrategyRun) -> Result<PathBuf> {
        let dir = self.output_dir.join("timing");
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create timing directory {}", dir.display()))?;
        let path = dir.join(format!("{}.csv", run.strategy));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        for timing in &run.timings {
            writer.serialize(TimingReportRow {
                ticker: &timing.ticker,
                load_seconds: timing.load.as_secs_f64(),
                signal_seconds: timing.signal.as_secs_f64(),
                simulate_seconds: timing.simulate.as_secs_f64(),
                total_seconds: timing.total().as_secs_f64(),
            })?;
        }
        writer.flush()?;
        Ok(path)
    }

    pub fn write_manifest(&self, run: &StrategyRun) -> Result<PathBuf> {
        let path = self
            .output_dir
            .join(format!("{}.manifest.json", run.strategy));
        let rows = portfolio_rows(&run.aggregate, self.baseline_capital);
        let manifest = RunManifest {
            run_id: run.run_id,
            generated_at: Utc::now(),
            strategy: &run.strategy,
            template_id: &run.template_id,
            baseline_capital: self.baseline_capital,
            tickers: run.completed_tickers(),
            failures: &run.failures,
            first_date: rows.first().map(|row| row.date),
            last_date: rows.last().map(|row| row.date),
            final_total_assets: rows.last().map(|row| row.total_assets),
            final_pnl: rows.last().map(|row| row.pnl),
            duration_seconds: run.duration_seconds,
        };

        let file = File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &manifest)?;
        Ok(path)
    }

    pub fn write_timing_summary(&self, summaries: &[StrategyTimingSummary]) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join("timing_summary.csv");
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        for summary in summaries {
            writer.serialize(summary)?;
        }
        writer.flush()?;
        Ok(path)
    }

    pub fn log_summary(&self, run: &StrategyRun) {
        let rows = portfolio_rows(&run.aggregate, self.baseline_capital);
        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            info!("{}: no portfolio dates", run.strategy);
            return;
        };
        info!(
            "{}: {} securities, {} failed, {} to {}, final total assets {:.2}, PnL {:.2}",
            run.strategy,
            run.securities.len(),
            run.failures.len(),
            first.date,
            last.date,
            last.total_assets,
            last.pnl
        );
    }
}

fn write_signal_csv(path: &Path, signals: &SignalSeries) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in &signals.rows {
        writer.serialize(SignalReportRow {
            date: row.date,
            close_price: row.close,
            signal: row.signal,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AggregatePoint;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn aggregate(points: &[(u32, f64, f64)]) -> AggregatePortfolio {
        AggregatePortfolio {
            tickers: vec!["AAA".to_string()],
            points: points
                .iter()
                .map(|&(d, cash, holdings)| {
                    (
                        day(d),
                        AggregatePoint {
                            cash,
                            holdings_value: holdings,
                            total_assets: cash + holdings,
                        },
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn baseline_shifts_cash_and_total_but_not_pnl() {
        let rows = portfolio_rows(&aggregate(&[(1, -200.0, 200.0), (2, -200.0, 210.0)]), 1_000_000.0);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cash, 999_800.0);
        assert_eq!(rows[0].holdings, 200.0);
        assert_eq!(rows[0].total_assets, 1_000_000.0);
        assert_eq!(rows[0].pnl, 0.0);
        assert_eq!(rows[1].total_assets, 1_000_010.0);
        assert_eq!(rows[1].pnl, 10.0);
    }

    #[test]
    fn timing_summary_covers_completed_securities_only() {
        use crate::backtester::{SecurityRun, StrategyRun};
        use crate::models::{SecurityFailure, SignalSeries};
        use std::time::Duration;

        let timing = |ticker: &str, secs: u64| SecurityTiming {
            ticker: ticker.to_string(),
            load: Duration::from_secs(secs),
            ..Default::default()
        };
        let run = StrategyRun {
            run_id: Uuid::new_v4(),
            strategy: "BenchmarkStrategy".to_string(),
            template_id: "benchmark".to_string(),
            aggregate: aggregate(&[(1, 0.0, 0.0)]),
            securities: vec![
                SecurityRun {
                    ticker: "AAA".to_string(),
                    signals: SignalSeries {
                        ticker: "AAA".to_string(),
                        template_id: "benchmark".to_string(),
                        rows: Vec::new(),
                    },
                    trajectory: Vec::new(),
                },
                SecurityRun {
                    ticker: "BBB".to_string(),
                    signals: SignalSeries {
                        ticker: "BBB".to_string(),
                        template_id: "benchmark".to_string(),
                        rows: Vec::new(),
                    },
                    trajectory: Vec::new(),
                },
            ],
            failures: vec![SecurityFailure {
                ticker: "BAD".to_string(),
                strategy: "BenchmarkStrategy".to_string(),
                reason: "no local price data for BAD".to_string(),
            }],
            timings: vec![timing("AAA", 2), timing("BAD", 30), timing("BBB", 4)],
            duration_seconds: 1.0,
        };

        let summary = StrategyTimingSummary::from_run(&run);
        assert_eq!(summary.securities, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.load_seconds, 6.0);
        assert_eq!(summary.mean_security_seconds, 3.0);
    }

    #[test]
    fn empty_aggregate_has_no_rows() {
        assert!(portfolio_rows(&AggregatePortfolio::default(), 1_000_000.0).is_empty());
    }

    #[test]
    fn portfolio_csv_uses_report_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut writer = csv::Writer::from_path(&path).unwrap();
        for row in portfolio_rows(&aggregate(&[(1, 0.0, 0.0)]), 5.0) {
            writer.serialize(row).unwrap();
        }
        writer.flush().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Date,Cash,Holdings,Total Assets,PnL"));
        assert_eq!(lines.next(), Some("2024-03-01,5.0,0.0,5.0,0.0"));
    }
}
