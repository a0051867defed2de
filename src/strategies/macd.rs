use crate::error::BacktestResult;
use crate::indicators;
use crate::models::*;
use crate::param_utils::get_usize_param_min;
use crate::strategy_utils::{lag_and_trim, position_when, validate_input};
use std::collections::HashMap;

/// Buys on the day after the MACD line crosses above its signal line.
pub struct MACDStrategy {
    pub template_id: String,
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl MACDStrategy {
    pub fn new(parameters: HashMap<String, f64>) -> Self {
        let fast_period = get_usize_param_min(&parameters, "fastPeriod", 12, 1);
        let slow_period = get_usize_param_min(&parameters, "slowPeriod", 26, 1);
        let signal_period = get_usize_param_min(&parameters, "signalPeriod", 9, 1);
        Self {
            template_id: "macd".to_string(),
            fast_period,
            slow_period,
            signal_period,
        }
    }
}

/// 1 only where the position switches from 0 to 1.
pub(crate) fn rising_edges(positions: &[Option<i64>]) -> Vec<Option<i64>> {
    let mut edges = Vec::with_capacity(positions.len());
    for i in 0..positions.len() {
        let edge = match (i.checked_sub(1).and_then(|p| positions[p]), positions[i]) {
            (Some(0), Some(1)) => 1,
            _ => 0,
        };
        edges.push(Some(edge));
    }
    edges
}

impl super::Strategy for MACDStrategy {
    fn get_template_id(&self) -> &str {
        &self.template_id
    }

    fn generate_signals(&self, series: &PriceSeries) -> BacktestResult<SignalSeries> {
        validate_input(series)?;
        let prices = series.closes();
        let macd = indicators::calculate_macd(
            &prices,
            self.fast_period,
            self.slow_period,
            self.signal_period,
        );
        let positions = position_when(&macd.macd_line, &macd.signal_line);
        let edges = rising_edges(&positions);

        Ok(lag_and_trim(series, &self.template_id, &edges, |_| true))
    }

    fn get_min_data_points(&self) -> usize {
        1
    }
}
