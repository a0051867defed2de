use crate::models::SecurityTiming;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Load,
    Signal,
    Simulate,
}

/// Per-security phase timings, shared across worker threads.
///
/// Recording never influences the computation it measures.
#[derive(Clone, Default)]
pub struct TimingRecorder {
    records: Arc<DashMap<String, SecurityTiming>>,
}

impl TimingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, ticker: &str, phase: Phase, elapsed: Duration) {
        let mut entry = self
            .records
            .entry(ticker.to_string())
            .or_insert_with(|| SecurityTiming {
                ticker: ticker.to_string(),
                ..Default::default()
            });
        match phase {
            Phase::Load => entry.load += elapsed,
            Phase::Signal => entry.signal += elapsed,
            Phase::Simulate => entry.simulate += elapsed,
        }
    }

    /// Run `operation`, recording its wall time under `phase`.
    pub fn time<T>(&self, ticker: &str, phase: Phase, operation: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let value = operation();
        self.record(ticker, phase, started.elapsed());
        value
    }

    pub fn get(&self, ticker: &str) -> Option<SecurityTiming> {
        self.records.get(ticker).map(|entry| entry.value().clone())
    }

    /// All records ordered by ticker.
    pub fn snapshot(&self) -> Vec<SecurityTiming> {
        let mut records: Vec<SecurityTiming> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
