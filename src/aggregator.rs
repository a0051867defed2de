use crate::config::CalendarPolicy;
use crate::error::{BacktestError, BacktestResult};
use crate::models::{AggregatePoint, AggregatePortfolio, PortfolioState};
use chrono::NaiveDate;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Date-keyed sum of per-security trajectories.
///
/// Under [`CalendarPolicy::Strict`] the first trajectory fixes the calendar and
/// every later one must carry exactly the same dates. Under
/// [`CalendarPolicy::CarryForward`] the calendars are unioned; a security adds
/// nothing before its first date and repeats its last known state in gaps and
/// after its last date.
pub struct PortfolioAggregator {
    policy: CalendarPolicy,
    tickers: Vec<String>,
    reference_calendar: Option<(String, Vec<NaiveDate>)>,
    totals: BTreeMap<NaiveDate, AggregatePoint>,
    pending: Vec<Vec<PortfolioState>>,
}

impl PortfolioAggregator {
    pub fn new(policy: CalendarPolicy) -> Self {
        Self {
            policy,
            tickers: Vec::new(),
            reference_calendar: None,
            totals: BTreeMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn add(&mut self, ticker: &str, trajectory: &[PortfolioState]) -> BacktestResult<()> {
        match self.policy {
            CalendarPolicy::Strict => {
                let dates: Vec<NaiveDate> = trajectory.iter().map(|s| s.date).collect();
                match &self.reference_calendar {
                    Some((_, reference)) => {
                        if let Some(first_difference) = first_difference(reference, &dates) {
                            return Err(BacktestError::CalendarMismatch {
                                ticker: ticker.to_string(),
                                expected: reference.len(),
                                found: dates.len(),
                                first_difference,
                            });
                        }
                    }
                    None => {
                        debug!("{} fixes the aggregation calendar ({} dates)", ticker, dates.len());
                        self.reference_calendar = Some((ticker.to_string(), dates));
                    }
                }
                for state in trajectory {
                    self.totals
                        .entry(state.date)
                        .or_default()
                        .accumulate(&AggregatePoint::from_state(state));
                }
            }
            CalendarPolicy::CarryForward => {
                self.pending.push(trajectory.to_vec());
            }
        }
        self.tickers.push(ticker.to_string());
        Ok(())
    }

    pub fn finish(self) -> AggregatePortfolio {
        let PortfolioAggregator {
            policy,
            mut tickers,
            mut totals,
            pending,
            ..
        } = self;

        if policy == CalendarPolicy::CarryForward {
            let calendar: BTreeSet<NaiveDate> = pending
                .iter()
                .flat_map(|trajectory| trajectory.iter().map(|s| s.date))
                .collect();
            for trajectory in &pending {
                carry_forward_into(&mut totals, &calendar, trajectory);
            }
        }

        tickers.sort();
        AggregatePortfolio {
            tickers,
            points: totals.into_iter().collect(),
        }
    }
}

fn carry_forward_into(
    totals: &mut BTreeMap<NaiveDate, AggregatePoint>,
    calendar: &BTreeSet<NaiveDate>,
    trajectory: &[PortfolioState],
) {
    let mut cursor = 0usize;
    let mut last_known: Option<AggregatePoint> = None;

    for date in calendar {
        while cursor < trajectory.len() && trajectory[cursor].date <= *date {
            last_known = Some(AggregatePoint::from_state(&trajectory[cursor]));
            cursor += 1;
        }
        let entry = totals.entry(*date).or_default();
        if let Some(point) = last_known.as_ref() {
            entry.accumulate(point);
        }
    }
}

/// Smallest date present in exactly one of two ascending calendars.
fn first_difference(expected: &[NaiveDate], found: &[NaiveDate]) -> Option<NaiveDate> {
    for (a, b) in expected.iter().zip(found.iter()) {
        if a != b {
            return Some(*a.min(b));
        }
    }
    match expected.len().cmp(&found.len()) {
        std::cmp::Ordering::Less => Some(found[expected.len()]),
        std::cmp::Ordering::Greater => Some(expected[found.len()]),
        std::cmp::Ordering::Equal => None,
    }
}

/// Aggregate a batch of trajectories in one call.
pub fn aggregate(
    trajectories: &[(String, Vec<PortfolioState>)],
    policy: CalendarPolicy,
) -> BacktestResult<AggregatePortfolio> {
    let mut aggregator = PortfolioAggregator::new(policy);
    for (ticker, trajectory) in trajectories {
        aggregator.add(ticker, trajectory)?;
    }
    Ok(aggregator.finish())
}
