//! Price indicators used by the signal strategies.
//!
//! Every function returns a vector aligned index-for-index with its input.
//! Values that are not yet defined (warm-up) are `f64::NAN`; value `i` only
//! ever depends on inputs `0..=i`.

use statrs::statistics::Statistics;

/// Simple moving average that averages over the available prefix until the
/// window fills.
///
/// Each window is summed afresh as offsets from its first value, so a window of
/// identical prices averages to exactly that price whatever its length.
pub fn calculate_sma(prices: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    let mut sma_values = Vec::with_capacity(prices.len());

    for i in 0..prices.len() {
        let count = (i + 1).min(period);
        let window = &prices[i + 1 - count..=i];
        let base = window[0];
        let offset_sum: f64 = window.iter().map(|price| price - base).sum();
        sma_values.push(base + offset_sum / count as f64);
    }

    sma_values
}

pub fn calculate_ema(prices: &[f64], period: usize) -> Vec<f64> {
    if prices.is_empty() {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema_values = Vec::with_capacity(prices.len());
    ema_values.push(prices[0]);

    for i in 1..prices.len() {
        let ema = (prices[i] * multiplier) + (ema_values[i - 1] * (1.0 - multiplier));
        ema_values.push(ema);
    }

    ema_values
}

pub struct MacdOutput {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
}

pub fn calculate_macd(
    prices: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> MacdOutput {
    let fast_ema = calculate_ema(prices, fast_period);
    let slow_ema = calculate_ema(prices, slow_period);

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(fast, slow)| fast - slow)
        .collect();
    let signal_line = calculate_ema(&macd_line, signal_period);

    MacdOutput {
        macd_line,
        signal_line,
    }
}

/// Bias-corrected exponential mean with smoothing `1 / (1 + center_of_mass)`,
/// undefined until `min_periods` observations have been seen.
pub fn calculate_ewm_mean(values: &[f64], center_of_mass: f64, min_periods: usize) -> Vec<f64> {
    let alpha = 1.0 / (1.0 + center_of_mass.max(0.0));
    let decay = 1.0 - alpha;
    let mut weighted_sum = 0.0f64;
    let mut weight_total = 0.0f64;
    let mut output = Vec::with_capacity(values.len());

    for (i, value) in values.iter().enumerate() {
        weighted_sum = value + decay * weighted_sum;
        weight_total = 1.0 + decay * weight_total;
        if i + 1 >= min_periods.max(1) {
            output.push(weighted_sum / weight_total);
        } else {
            output.push(f64::NAN);
        }
    }

    output
}

/// A zero average loss means no down moves in the window, which reads as
/// maximal strength.
pub fn rsi_from_avgs(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

pub fn calculate_rsi(prices: &[f64], period: usize) -> Vec<f64> {
    if prices.is_empty() {
        return Vec::new();
    }
    let period = period.max(1);

    let mut gains = Vec::with_capacity(prices.len());
    let mut losses = Vec::with_capacity(prices.len());
    gains.push(0.0);
    losses.push(0.0);
    for pair in prices.windows(2) {
        let delta = pair[1] - pair[0];
        gains.push(if delta > 0.0 { delta } else { 0.0 });
        losses.push(if delta < 0.0 { -delta } else { 0.0 });
    }

    let center_of_mass = period as f64 - 1.0;
    let avg_gains = calculate_ewm_mean(&gains, center_of_mass, period);
    let avg_losses = calculate_ewm_mean(&losses, center_of_mass, period);

    avg_gains
        .iter()
        .zip(avg_losses.iter())
        .map(|(&gain, &loss)| {
            if gain.is_nan() || loss.is_nan() {
                f64::NAN
            } else {
                rsi_from_avgs(gain, loss)
            }
        })
        .collect()
}

/// Fractional change from the previous close; undefined for the first value.
pub fn calculate_pct_change(prices: &[f64]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(prices.len());
    for i in 0..prices.len() {
        if i == 0 || prices[i - 1] == 0.0 {
            returns.push(f64::NAN);
        } else {
            returns.push(prices[i] / prices[i - 1] - 1.0);
        }
    }
    returns
}

/// Rolling sample standard deviation, defined only over full windows of
/// defined values.
pub fn calculate_rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let mut output = vec![f64::NAN; values.len()];
    if window < 2 {
        return output;
    }

    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().all(|v| v.is_finite()) {
            output[i] = slice.iter().std_dev();
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn sma_windows_of_equal_prices_agree_exactly() {
        let mut prices: Vec<f64> = (0..60).map(|i| 110.0 + (i as f64 * 0.7).sin() * 3.3).collect();
        prices.extend(std::iter::repeat(101.3).take(80));
        let short = calculate_sma(&prices, 20);
        let long = calculate_sma(&prices, 50);

        for i in 110..prices.len() {
            assert_eq!(short[i], 101.3, "short window at {}", i);
            assert_eq!(long[i], 101.3, "long window at {}", i);
        }
    }

    #[test]
    fn sma_uses_partial_windows_at_the_start() {
        let sma = calculate_sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_close(sma[0], 1.0);
        assert_close(sma[1], 1.5);
        assert_close(sma[2], 2.0);
        assert_close(sma[3], 3.0);
        assert_close(sma[4], 4.0);
    }

    #[test]
    fn ema_is_seeded_with_first_value() {
        let ema = calculate_ema(&[10.0, 20.0], 3);
        assert_close(ema[0], 10.0);
        assert_close(ema[1], 15.0);
    }

    #[test]
    fn ewm_mean_is_bias_corrected_and_respects_min_periods() {
        // center of mass 1 -> alpha 0.5, weights 1, 0.5
        let ewm = calculate_ewm_mean(&[2.0, 4.0, 8.0], 1.0, 2);
        assert!(ewm[0].is_nan());
        assert_close(ewm[1], (4.0 + 0.5 * 2.0) / 1.5);
        assert_close(ewm[2], (8.0 + 0.5 * 4.0 + 0.25 * 2.0) / 1.75);
    }

    #[test]
    fn rsi_without_losses_is_one_hundred() {
        assert_close(rsi_from_avgs(1.5, 0.0), 100.0);
        assert_close(rsi_from_avgs(0.0, 0.0), 100.0);
        assert_close(rsi_from_avgs(1.0, 1.0), 50.0);

        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let rsi = calculate_rsi(&rising, 14);
        assert!(rsi[12].is_nan());
        assert_close(rsi[13], 100.0);
        assert_close(rsi[19], 100.0);
    }

    #[test]
    fn rsi_of_falling_prices_is_zero() {
        let falling: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let rsi = calculate_rsi(&falling, 14);
        assert_close(rsi[15], 0.0);
    }

    #[test]
    fn rolling_std_needs_a_full_window_of_returns() {
        let returns = calculate_pct_change(&[100.0, 110.0, 99.0, 99.0]);
        assert!(returns[0].is_nan());
        assert_close(returns[1], 0.1);

        let std = calculate_rolling_std(&returns, 2);
        assert!(std[0].is_nan());
        assert!(std[1].is_nan());
        let expected = {
            let a = 0.1f64;
            let b = 99.0 / 110.0 - 1.0;
            let mean = (a + b) / 2.0;
            (((a - mean).powi(2) + (b - mean).powi(2)) / 1.0).sqrt()
        };
        assert_close(std[2], expected);
    }
}
