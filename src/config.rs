use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_DATA_DIR: &str = "sp500_prices";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_BASELINE_CAPITAL: f64 = 1_000_000.0;
pub const DEFAULT_BENCHMARK_QUANTITY: i64 = 1;

/// How the aggregator treats securities whose trading dates differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarPolicy {
    /// Every security must share one calendar; a mismatch fails the run.
    #[default]
    Strict,
    /// Union of calendars, repeating each security's last state across gaps.
    CarryForward,
}

impl CalendarPolicy {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "strict" => Ok(Self::Strict),
            "carry-forward" | "carryforward" | "union" => Ok(Self::CarryForward),
            other => Err(anyhow!(
                "CALENDAR_POLICY must be strict or carry-forward (value: {})",
                other
            )),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::CarryForward => "carry-forward",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub initial_cash: f64,
    /// Added to cash and total assets when writing reports.
    pub baseline_capital: f64,
    pub benchmark_quantity: i64,
    pub calendar_policy: CalendarPolicy,
    pub load_max_attempts: u32,
    pub load_retry_delay_ms: u64,
    pub threads: usize,
    pub show_progress: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            initial_cash: 0.0,
            baseline_capital: DEFAULT_BASELINE_CAPITAL,
            benchmark_quantity: DEFAULT_BENCHMARK_QUANTITY,
            calendar_policy: CalendarPolicy::Strict,
            load_max_attempts: 3,
            load_retry_delay_ms: 250,
            threads: num_cpus::get(),
            show_progress: true,
        }
    }
}

impl BacktestConfig {
    /// Build from a settings map (usually the process environment); absent keys keep defaults.
    pub fn from_settings_map(settings: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();

        let initial_cash = optional_setting_f64(settings, "BACKTEST_INITIAL_CASH", None)?
            .unwrap_or(defaults.initial_cash);
        let baseline_capital =
            optional_setting_f64(settings, "REPORT_BASELINE_CAPITAL", Some(0.0))?
                .unwrap_or(defaults.baseline_capital);
        let benchmark_quantity = optional_setting_i64(settings, "BENCHMARK_QUANTITY")?
            .unwrap_or(defaults.benchmark_quantity);
        let calendar_policy = match optional_setting(settings, "CALENDAR_POLICY") {
            Some(raw) => CalendarPolicy::parse(raw)?,
            None => defaults.calendar_policy,
        };
        let load_max_attempts = optional_setting_unsigned(settings, "LOAD_MAX_ATTEMPTS", 1u32)?
            .unwrap_or(defaults.load_max_attempts);
        let load_retry_delay_ms =
            optional_setting_unsigned(settings, "LOAD_RETRY_DELAY_MS", 0u64)?
                .unwrap_or(defaults.load_retry_delay_ms);
        let threads = optional_setting_unsigned(settings, "BACKTEST_THREADS", 1usize)?
            .unwrap_or(defaults.threads);

        Ok(Self {
            initial_cash,
            baseline_capital,
            benchmark_quantity,
            calendar_policy,
            load_max_attempts,
            load_retry_delay_ms,
            threads,
            ..defaults
        })
    }

    pub fn from_env() -> Result<Self> {
        let settings: HashMap<String, String> = std::env::vars().collect();
        Self::from_settings_map(&settings)
    }

    /// Per-strategy parameters derived from the run configuration.
    pub fn strategy_parameters(&self) -> HashMap<String, f64> {
        let mut parameters = HashMap::new();
        parameters.insert("quantity".to_string(), self.benchmark_quantity as f64);
        parameters
    }
}

fn optional_setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn optional_setting_f64(
    settings: &HashMap<String, String>,
    key: &str,
    min: Option<f64>,
) -> Result<Option<f64>> {
    let Some(raw) = optional_setting(settings, key) else {
        return Ok(None);
    };
    let value = raw
        .parse::<f64>()
        .map_err(|_| anyhow!("Setting {} must be a number (value: {})", key, raw))?;
    if !value.is_finite() {
        return Err(anyhow!("Setting {} must be finite (value: {})", key, raw));
    }
    if let Some(min_value) = min {
        if value < min_value {
            return Err(anyhow!(
                "Setting {} must be >= {} (value: {})",
                key,
                min_value,
                raw
            ));
        }
    }
    Ok(Some(value))
}

fn optional_setting_i64(settings: &HashMap<String, String>, key: &str) -> Result<Option<i64>> {
    let Some(raw) = optional_setting(settings, key) else {
        return Ok(None);
    };
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| anyhow!("Setting {} must be an integer (value: {})", key, raw))
}

/// Parses into the setting's own integer type; out-of-range values are errors.
fn optional_setting_unsigned<T>(
    settings: &HashMap<String, String>,
    key: &str,
    min: T,
) -> Result<Option<T>>
where
    T: FromStr + PartialOrd + Display,
{
    let Some(raw) = optional_setting(settings, key) else {
        return Ok(None);
    };
    let value = raw
        .parse::<T>()
        .map_err(|_| anyhow!("Setting {} must be a non-negative integer (value: {})", key, raw))?;
    if value < min {
        return Err(anyhow!(
            "Setting {} must be >= {} (value: {})",
            key,
            min,
            raw
        ));
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_settings_keep_defaults() {
        let config = BacktestConfig::from_settings_map(&HashMap::new()).unwrap();
        assert_eq!(config.initial_cash, 0.0);
        assert_eq!(config.baseline_capital, DEFAULT_BASELINE_CAPITAL);
        assert_eq!(config.benchmark_quantity, 1);
        assert_eq!(config.calendar_policy, CalendarPolicy::Strict);
        assert_eq!(config.load_max_attempts, 3);
    }

    #[test]
    fn parses_overrides() {
        let config = BacktestConfig::from_settings_map(&settings(&[
            ("BACKTEST_INITIAL_CASH", "500"),
            ("REPORT_BASELINE_CAPITAL", "0"),
            ("BENCHMARK_QUANTITY", "10"),
            ("CALENDAR_POLICY", "Carry_Forward"),
            ("LOAD_MAX_ATTEMPTS", "5"),
            ("BACKTEST_THREADS", "2"),
        ]))
        .unwrap();
        assert_eq!(config.initial_cash, 500.0);
        assert_eq!(config.baseline_capital, 0.0);
        assert_eq!(config.benchmark_quantity, 10);
        assert_eq!(config.calendar_policy, CalendarPolicy::CarryForward);
        assert_eq!(config.load_max_attempts, 5);
        assert_eq!(config.threads, 2);
        assert_eq!(config.strategy_parameters().get("quantity"), Some(&10.0));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(BacktestConfig::from_settings_map(&settings(&[("BENCHMARK_QUANTITY", "two")]))
            .is_err());
        assert!(BacktestConfig::from_settings_map(&settings(&[("CALENDAR_POLICY", "loose")]))
            .is_err());
        assert!(BacktestConfig::from_settings_map(&settings(&[("LOAD_MAX_ATTEMPTS", "0")]))
            .is_err());
        assert!(
            BacktestConfig::from_settings_map(&settings(&[("LOAD_MAX_ATTEMPTS", "4294967297")]))
                .is_err()
        );
        assert!(
            BacktestConfig::from_settings_map(&settings(&[("REPORT_BASELINE_CAPITAL", "-1")]))
                .is_err()
        );
    }
}
