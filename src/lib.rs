pub mod aggregator;
pub mod backtester;
pub mod commands;
pub mod config;
pub mod context;
pub mod data_context;
pub mod error;
pub mod indicators;
pub mod models;
pub mod param_utils;
pub mod report;
pub mod retry;
pub mod simulator;
pub mod strategy;
pub mod strategy_utils;
pub mod timing;

pub use aggregator::{aggregate, PortfolioAggregator};
pub use backtester::{Backtester, SecurityRun, StrategyRun};
pub use config::{BacktestConfig, CalendarPolicy};
pub use data_context::{CsvDirectoryProvider, InMemoryPriceProvider, PriceSeriesProvider};
pub use error::{BacktestError, BacktestResult};
pub use simulator::SingleAssetSimulator;
pub use strategy::{create_strategy, Strategy, STRATEGY_NAMES};
pub use timing::TimingRecorder;
