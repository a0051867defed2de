use crate::error::{BacktestError, BacktestResult};
use crate::models::{PortfolioState, SignalSeries};

/// Replays a signal series as unit trades at each date's close.
///
/// Cash may go negative and the position is never capped; every date in the
/// series produces exactly one state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleAssetSimulator {
    initial_cash: f64,
}

impl SingleAssetSimulator {
    pub fn new(initial_cash: f64) -> Self {
        Self { initial_cash }
    }

    pub fn run(&self, signals: &SignalSeries) -> BacktestResult<Vec<PortfolioState>> {
        if let Some(pair) = signals.rows.windows(2).find(|pair| pair[1].date <= pair[0].date) {
            return Err(BacktestError::InvalidInput(format!(
                "signal series for {} is not in ascending date order ({} then {})",
                signals.ticker, pair[0].date, pair[1].date
            )));
        }

        let mut cash = self.initial_cash;
        let mut shares_held: i64 = 0;
        let mut states = Vec::with_capacity(signals.rows.len());

        for row in &signals.rows {
            if row.signal != 0 {
                cash -= row.signal as f64 * row.close;
                shares_held += row.signal;
            }
            let holdings_value = shares_held as f64 * row.close;
            let total_assets = cash + holdings_value;

            if !total_assets.is_finite() {
                return Err(BacktestError::Computation(format!(
                    "{} portfolio value became non-finite on {}",
                    signals.ticker, row.date
                )));
            }

            states.push(PortfolioState {
                date: row.date,
                cash,
                shares_held,
                holdings_value,
                total_assets,
            });
        }

        Ok(states)
    }
}
