use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Result of one call against the target, success or not.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOutcome {
    pub success: bool,
    pub latency_ms: f64,
    pub status_code: Option<u16>,
    pub error_label: Option<String>,
}

impl RequestOutcome {
    pub fn success(latency_ms: f64, status_code: u16) -> Self {
        Self {
            success: true,
            latency_ms,
            status_code: Some(status_code),
            error_label: None,
        }
    }

    pub fn failure(latency_ms: f64, status_code: Option<u16>, label: impl Into<String>) -> Self {
        Self {
            success: false,
            latency_ms,
            status_code,
            error_label: Some(label.into()),
        }
    }
}

#[derive(Debug, Default)]
struct StatsState {
    total: u64,
    success: u64,
    failed: u64,
    latencies: Vec<f64>,
    status_codes: HashMap<u16, u64>,
    errors: HashMap<String, u64>,
}

/// Shared sink for every [`RequestOutcome`] of a run.
///
/// All mutation goes through [`StatsAggregator::record`] and all reads through
/// [`StatsAggregator::snapshot`]; both take the same lock, so a snapshot never
/// sees a counter bumped without its latency sample.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    state: Mutex<StatsState>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: RequestOutcome) {
        // Every update below happens under the lock, so a poisoned guard still
        // holds consistent counters.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        state.total += 1;
        if outcome.success {
            state.success += 1;
        } else {
            state.failed += 1;
        }
        state.latencies.push(outcome.latency_ms);
        if let Some(code) = outcome.status_code {
            *state.status_codes.entry(code).or_insert(0) += 1;
        }
        if let Some(label) = outcome.error_label {
            *state.errors.entry(label).or_insert(0) += 1;
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let (total, success, failed, mut latencies, status_codes, errors) = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            (
                state.total,
                state.success,
                state.failed,
                state.latencies.clone(),
                state.status_codes.clone(),
                state.errors.clone(),
            )
        };

        // NOTE: Sorting happens outside the lock on a private copy.
        latencies.sort_by(f64::total_cmp);
        let latency = LatencySummary::from_sorted(&latencies);

        StatsSnapshot {
            total,
            success,
            failed,
            latencies,
            latency,
            status_codes,
            errors,
        }
    }
}

/// Latency figures in milliseconds. All zero when nothing was recorded.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LatencySummary {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl LatencySummary {
    /// `sorted` must be in ascending order.
    pub fn from_sorted(sorted: &[f64]) -> Self {
        let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
            return Self::default();
        };
        let n = sorted.len();

        Self {
            min,
            avg: sorted.iter().sum::<f64>() / n as f64,
            max,
            p50: sorted[percentile_index(n, 0.50)],
            p95: sorted[percentile_index(n, 0.95)],
            p99: if n > 99 {
                sorted[percentile_index(n, 0.99)]
            } else {
                max
            },
        }
    }
}

/// `floor(n * quantile)`, clamped into `0..n`. `n` must be non-zero.
pub fn percentile_index(n: usize, quantile: f64) -> usize {
    ((n as f64 * quantile).floor() as usize).min(n - 1)
}

/// Point-in-time copy of the aggregated statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsSnapshot {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    /// Every recorded latency, ascending.
    pub latencies: Vec<f64>,
    pub latency: LatencySummary,
    pub status_codes: HashMap<u16, u64>,
    pub errors: HashMap<String, u64>,
}

impl StatsSnapshot {
    /// Percentage of successful calls, `0.0` before the first call.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.
        } else {
            self.success as f64 / self.total as f64 * 100.
        }
    }

    /// Calls per second over `elapsed`.
    pub fn throughput(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0. {
            self.total as f64 / secs
        } else {
            0.
        }
    }

    pub fn status_codes_sorted(&self) -> Vec<(u16, u64)> {
        let mut codes: Vec<_> = self.status_codes.iter().map(|(k, v)| (*k, *v)).collect();
        codes.sort_unstable_by_key(|(code, _)| *code);
        codes
    }

    /// The `n` most frequent error labels, most frequent first.
    pub fn top_errors(&self, n: usize) -> Vec<(&str, u64)> {
        let mut errors: Vec<_> = self
            .errors
            .iter()
            .map(|(label, count)| (label.as_str(), *count))
            .collect();
        errors.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        errors.truncate(n);
        errors
    }
}
