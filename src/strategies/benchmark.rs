use crate::error::BacktestResult;
use crate::models::*;
use crate::param_utils::get_rounded_param;
use crate::strategy_utils::validate_input;
use std::collections::HashMap;

pub struct BenchmarkStrategy {
    template_id: String,
    quantity: i64,
}

impl BenchmarkStrategy {
    pub fn new(parameters: HashMap<String, f64>) -> Self {
        let quantity = get_rounded_param(&parameters, "quantity", 1);
        Self {
            template_id: "benchmark".to_string(),
            quantity,
        }
    }
}

impl super::Strategy for BenchmarkStrategy {
    fn get_template_id(&self) -> &str {
        &self.template_id
    }

    fn generate_signals(&self, series: &PriceSeries) -> BacktestResult<SignalSeries> {
        validate_input(series)?;
        // Buy once on the first available close and hold; no lag and no warm-up.
        let rows = series
            .points()
            .iter()
            .enumerate()
            .map(|(i, point)| SignalRow {
                date: point.date,
                close: point.close,
                signal: if i == 0 { self.quantity } else { 0 },
            })
            .collect();

        Ok(SignalSeries {
            ticker: series.ticker().to_string(),
            template_id: self.template_id.clone(),
            rows,
        })
    }

    fn get_min_data_points(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Strategy;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn buys_configured_quantity_on_first_date_only() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let points = [100.0, 105.0, 95.0]
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + Duration::days(i as i64),
                close,
            })
            .collect();
        let series = PriceSeries::new("AAA", points).unwrap();

        let mut params = HashMap::new();
        params.insert("quantity".to_string(), 2.0);
        let signals = BenchmarkStrategy::new(params)
            .generate_signals(&series)
            .unwrap();

        assert_eq!(signals.signals(), vec![2, 0, 0]);
        assert_eq!(signals.first_date(), Some(start));
    }
}
