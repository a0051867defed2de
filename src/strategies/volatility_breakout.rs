use crate::error::BacktestResult;
use crate::indicators;
use crate::models::*;
use crate::param_utils::get_usize_param_min;
use crate::strategy_utils::{lag_and_trim, position_when, validate_input};
use std::collections::HashMap;

/// Buys after a daily return exceeds the rolling standard deviation of returns.
pub struct VolatilityBreakoutStrategy {
    pub template_id: String,
    window: usize,
}

impl VolatilityBreakoutStrategy {
    pub fn new(parameters: HashMap<String, f64>) -> Self {
        let window = get_usize_param_min(&parameters, "window", 20, 2);
        Self {
            template_id: "volatility_breakout".to_string(),
            window,
        }
    }
}

impl super::Strategy for VolatilityBreakoutStrategy {
    fn get_template_id(&self) -> &str {
        &self.template_id
    }

    fn generate_signals(&self, series: &PriceSeries) -> BacktestResult<SignalSeries> {
        validate_input(series)?;
        let prices = series.closes();
        let returns = indicators::calculate_pct_change(&prices);
        let volatility = indicators::calculate_rolling_std(&returns, self.window);
        let positions = position_when(&returns, &volatility);

        Ok(lag_and_trim(series, &self.template_id, &positions, |i| {
            returns[i].is_finite() && volatility[i].is_finite()
        }))
    }

    fn get_min_data_points(&self) -> usize {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Strategy;
    use chrono::{Duration, NaiveDate};

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + Duration::days(i as i64),
                close,
            })
            .collect();
        PriceSeries::new("VOL", points).unwrap()
    }

    #[test]
    fn first_row_needs_a_full_window_of_returns() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 2) as f64).collect();
        let strategy = VolatilityBreakoutStrategy::new(HashMap::new());
        let out = strategy.generate_signals(&series(&closes)).unwrap();
        assert_eq!(out.rows.len(), 10);
        assert_eq!(out.rows[0].date, series(&closes).points()[20].date);
        assert_eq!(out.rows[0].signal, 0);
    }

    #[test]
    fn breakout_day_signals_on_the_following_row() {
        let mut closes: Vec<f64> = (0..25).map(|i| 100.0 + (i % 2) as f64 * 0.5).collect();
        // A +10% jump on index 22 dwarfs the alternating noise.
        closes[22] = closes[21] * 1.10;
        closes[23] = closes[22];
        closes[24] = closes[23];
        let out = VolatilityBreakoutStrategy::new(HashMap::new())
            .generate_signals(&series(&closes))
            .unwrap();
        let signal_at = |index: usize| out.rows[index - 20].signal;
        assert_eq!(signal_at(22), 0);
        assert_eq!(signal_at(23), 1);
        assert_eq!(signal_at(24), 0);
    }
}
