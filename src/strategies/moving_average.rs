use crate::error::BacktestResult;
use crate::indicators;
use crate::models::*;
use crate::param_utils::get_usize_param_min;
use crate::strategy_utils::{lag_and_trim, position_when, validate_input};
use std::collections::HashMap;

/// Long while the short SMA is above the long SMA.
pub struct MovingAverageStrategy {
    pub template_id: String,
    short_window: usize,
    long_window: usize,
}

impl MovingAverageStrategy {
    pub fn new(parameters: HashMap<String, f64>) -> Self {
        let short_window = get_usize_param_min(&parameters, "shortWindow", 20, 1);
        let long_window = get_usize_param_min(&parameters, "longWindow", 50, 1);
        Self {
            template_id: "moving_average".to_string(),
            short_window,
            long_window,
        }
    }
}

impl super::Strategy for MovingAverageStrategy {
    fn get_template_id(&self) -> &str {
        &self.template_id
    }

    fn generate_signals(&self, series: &PriceSeries) -> BacktestResult<SignalSeries> {
        validate_input(series)?;
        let prices = series.closes();
        let short_sma = indicators::calculate_sma(&prices, self.short_window);
        let long_sma = indicators::calculate_sma(&prices, self.long_window);
        let positions = position_when(&short_sma, &long_sma);

        Ok(lag_and_trim(series, &self.template_id, &positions, |_| true))
    }

    fn get_min_data_points(&self) -> usize {
        1
    }
}
