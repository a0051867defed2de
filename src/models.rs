use crate::error::{BacktestError, BacktestResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily adjusted closes for one security, strictly increasing by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> BacktestResult<Self> {
        let ticker = ticker.into();
        for point in &points {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(BacktestError::InvalidInput(format!(
                    "{} has a non-positive close {} on {}",
                    ticker, point.close, point.date
                )));
            }
        }
        if let Some(pair) = points.windows(2).find(|pair| pair[1].date <= pair[0].date) {
            return Err(BacktestError::InvalidInput(format!(
                "{} dates are not strictly increasing ({} then {})",
                ticker, pair[0].date, pair[1].date
            )));
        }
        Ok(Self { ticker, points })
    }

    /// Sorts by date before validating, for sources that do not guarantee order.
    pub fn from_unsorted(
        ticker: impl Into<String>,
        mut points: Vec<PricePoint>,
    ) -> BacktestResult<Self> {
        points.sort_by_key(|point| point.date);
        Self::new(ticker, points)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Keeps only the points dated strictly before `cutoff`.
    pub fn truncated_before(&self, cutoff: NaiveDate) -> Self {
        Self {
            ticker: self.ticker.clone(),
            points: self
                .points
                .iter()
                .copied()
                .take_while(|p| p.date < cutoff)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub date: NaiveDate,
    pub close: f64,
    pub signal: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    pub ticker: String,
    pub template_id: String,
    pub rows: Vec<SignalRow>,
}

impl SignalSeries {
    pub fn signals(&self) -> Vec<i64> {
        self.rows.iter().map(|r| r.signal).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }
}

/// Account state of one security after the trade (if any) at `date`'s close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub date: NaiveDate,
    pub cash: f64,
    pub shares_held: i64,
    pub holdings_value: f64,
    pub total_assets: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregatePoint {
    pub cash: f64,
    pub holdings_value: f64,
    pub total_assets: f64,
}

impl AggregatePoint {
    pub fn from_state(state: &PortfolioState) -> Self {
        Self {
            cash: state.cash,
            holdings_value: state.holdings_value,
            total_assets: state.total_assets,
        }
    }

    pub fn accumulate(&mut self, other: &AggregatePoint) {
        self.cash += other.cash;
        self.holdings_value += other.holdings_value;
        self.total_assets += other.total_assets;
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregatePortfolio {
    pub tickers: Vec<String>,
    pub points: Vec<(NaiveDate, AggregatePoint)>,
}

impl AggregatePortfolio {
    pub fn get(&self, date: NaiveDate) -> Option<&AggregatePoint> {
        self.points
            .binary_search_by_key(&date, |(d, _)| *d)
            .ok()
            .map(|index| &self.points[index].1)
    }

    pub fn first(&self) -> Option<&(NaiveDate, AggregatePoint)> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&(NaiveDate, AggregatePoint)> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityTiming {
    pub ticker: String,
    pub load: Duration,
    pub signal: Duration,
    pub simulate: Duration,
}

impl SecurityTiming {
    pub fn total(&self) -> Duration {
        self.load + self.signal + self.simulate
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityFailure {
    pub ticker: String,
    pub strategy: String,
    pub reason: String,
}
