use crate::error::{BacktestError, BacktestResult};
use crate::models::{PriceSeries, SignalRow, SignalSeries};

/// Reject inputs no strategy can produce a signal series from.
pub fn validate_input(series: &PriceSeries) -> BacktestResult<()> {
    if series.is_empty() {
        return Err(BacktestError::InvalidInput(format!(
            "price series for {} is empty",
            series.ticker()
        )));
    }
    Ok(())
}

/// Apply the one-day execution lag to a raw position series and drop warm-up rows.
///
/// `signal[i] = raw[i - 1]` (an undefined raw value counts as 0). Row `i` is kept
/// only when `i >= 1` and `defined(i)` holds for the indicators behind row `i`.
pub fn lag_and_trim<F>(
    series: &PriceSeries,
    template_id: &str,
    raw_positions: &[Option<i64>],
    defined: F,
) -> SignalSeries
where
    F: Fn(usize) -> bool,
{
    let points = series.points();
    let mut rows = Vec::with_capacity(points.len().saturating_sub(1));

    for i in 1..points.len() {
        if !defined(i) {
            continue;
        }
        let signal = raw_positions.get(i - 1).copied().flatten().unwrap_or(0);
        rows.push(SignalRow {
            date: points[i].date,
            close: points[i].close,
            signal,
        });
    }

    SignalSeries {
        ticker: series.ticker().to_string(),
        template_id: template_id.to_string(),
        rows,
    }
}

/// Raw long/flat position: 1 where `lhs > rhs`, undefined where either side is NaN.
pub fn position_when(lhs: &[f64], rhs: &[f64]) -> Vec<Option<i64>> {
    lhs.iter()
        .zip(rhs.iter())
        .map(|(&a, &b)| {
            if a.is_nan() || b.is_nan() {
                None
            } else if a > b {
                Some(1)
            } else {
                Some(0)
            }
        })
        .collect()
}
