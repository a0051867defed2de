use crate::error::{BacktestError, BacktestResult};
use crate::models::{PriceSeries, SignalSeries};
use std::collections::HashMap;

pub trait Strategy {
    fn get_template_id(&self) -> &str;
    /// Turn a price series into a lagged, warm-up-trimmed signal series.
    fn generate_signals(&self, series: &PriceSeries) -> BacktestResult<SignalSeries>;
    /// Number of leading rows the strategy drops before its first signal.
    fn get_min_data_points(&self) -> usize;
}

#[path = "strategies/benchmark.rs"]
pub mod benchmark;

pub use benchmark::BenchmarkStrategy;

#[path = "strategies/moving_average.rs"]
pub mod moving_average;

pub use moving_average::MovingAverageStrategy;

#[path = "strategies/macd.rs"]
pub mod macd;

pub use macd::MACDStrategy;

#[path = "strategies/rsi.rs"]
pub mod rsi;

pub use rsi::RSIStrategy;

#[path = "strategies/volatility_breakout.rs"]
pub mod volatility_breakout;

pub use volatility_breakout::VolatilityBreakoutStrategy;

pub const STRATEGY_NAMES: [&str; 5] = [
    "BenchmarkStrategy",
    "MovingAverageStrategy",
    "VolatilityBreakoutStrategy",
    "MACDStrategy",
    "RSIStrategy",
];

/// Registered class name for either accepted spelling of a strategy.
pub fn canonical_strategy_name(name: &str) -> Option<&'static str> {
    match name {
        "BenchmarkStrategy" | "benchmark" => Some("BenchmarkStrategy"),
        "MovingAverageStrategy" | "moving_average" => Some("MovingAverageStrategy"),
        "MACDStrategy" | "macd" => Some("MACDStrategy"),
        "RSIStrategy" | "rsi" => Some("RSIStrategy"),
        "VolatilityBreakoutStrategy" | "volatility_breakout" => {
            Some("VolatilityBreakoutStrategy")
        }
        _ => None,
    }
}

pub fn create_strategy(
    name: &str,
    parameters: HashMap<String, f64>,
) -> BacktestResult<Box<dyn Strategy + Send + Sync>> {
    match canonical_strategy_name(name) {
        Some("BenchmarkStrategy") => Ok(Box::new(BenchmarkStrategy::new(parameters))),
        Some("MovingAverageStrategy") => Ok(Box::new(MovingAverageStrategy::new(parameters))),
        Some("MACDStrategy") => Ok(Box::new(MACDStrategy::new(parameters))),
        Some("RSIStrategy") => Ok(Box::new(RSIStrategy::new(parameters))),
        Some("VolatilityBreakoutStrategy") => {
            Ok(Box::new(VolatilityBreakoutStrategy::new(parameters)))
        }
        _ => Err(BacktestError::UnknownStrategy(name.to_string())),
    }
}
