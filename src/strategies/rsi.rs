use crate::error::BacktestResult;
use crate::indicators;
use crate::models::*;
use crate::param_utils::{get_param_f64, get_usize_param_min};
use crate::strategy_utils::{lag_and_trim, validate_input};
use std::collections::HashMap;

pub struct RSIStrategy {
    pub template_id: String,
    period: usize,
    oversold_level: f64,
}

impl RSIStrategy {
    pub fn new(parameters: HashMap<String, f64>) -> Self {
        let period = get_usize_param_min(&parameters, "period", 14, 1);
        let oversold_level = get_param_f64(&parameters, "oversoldLevel", 30.0);
        Self {
            template_id: "rsi".to_string(),
            period,
            oversold_level,
        }
    }
}

impl super::Strategy for RSIStrategy {
    fn get_template_id(&self) -> &str {
        &self.template_id
    }

    fn generate_signals(&self, series: &PriceSeries) -> BacktestResult<SignalSeries> {
        validate_input(series)?;
        let prices = series.closes();
        let rsi = indicators::calculate_rsi(&prices, self.period);

        // Buy signal: RSI is oversold
        let positions: Vec<Option<i64>> = rsi
            .iter()
            .map(|&value| {
                if value.is_nan() {
                    None
                } else if value < self.oversold_level {
                    Some(1)
                } else {
                    Some(0)
                }
            })
            .collect();

        Ok(lag_and_trim(series, &self.template_id, &positions, |i| {
            !rsi[i].is_nan()
        }))
    }

    fn get_min_data_points(&self) -> usize {
        self.period.saturating_sub(1).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Strategy;
    use chrono::{Duration, NaiveDate};

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + Duration::days(i as i64),
                close,
            })
            .collect();
        PriceSeries::new("RSI", points).unwrap()
    }

    #[test]
    fn warm_up_rows_are_dropped() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 3) as f64).collect();
        let strategy = RSIStrategy::new(HashMap::new());
        let out = strategy.generate_signals(&series(&closes)).unwrap();

        assert_eq!(out.rows.len(), 30 - 13);
        assert_eq!(out.rows[0].date, series(&closes).points()[13].date);
        assert_eq!(strategy.get_min_data_points(), 13);
        // The first retained row looks back at an undefined RSI.
        assert_eq!(out.rows[0].signal, 0);
    }

    #[test]
    fn falling_prices_signal_oversold_one_day_later() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let out = RSIStrategy::new(HashMap::new())
            .generate_signals(&series(&closes))
            .unwrap();
        // RSI is 0 from index 13 on, so rows from index 14 carry a buy.
        assert_eq!(out.rows[0].signal, 0);
        assert!(out.rows[1..].iter().all(|r| r.signal == 1));
    }

    #[test]
    fn rising_prices_never_signal() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let out = RSIStrategy::new(HashMap::new())
            .generate_signals(&series(&closes))
            .unwrap();
        assert!(out.rows.iter().all(|r| r.signal == 0));
    }
}
