//! Per-endpoint statistics for load runs
//!
//! Latencies go into an HDR histogram so percentiles stay accurate under load.

use hdrhistogram::Histogram;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::errors::{HarnessError, Result};

const MAX_LATENCY_US: u64 = 300_000_000; // 5 minutes

/// Latency statistics in milliseconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyStats {
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub stddev_ms: f64,
    pub p50_ms: f64,
    pub p75_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl LatencyStats {
    fn from_histogram(histogram: &Histogram<u64>) -> Self {
        if histogram.is_empty() {
            return Self::default();
        }
        let ms = |us: u64| us as f64 / 1000.0;
        Self {
            min_ms: ms(histogram.min()),
            max_ms: ms(histogram.max()),
            mean_ms: histogram.mean() / 1000.0,
            stddev_ms: histogram.stdev() / 1000.0,
            p50_ms: ms(histogram.value_at_percentile(50.0)),
            p75_ms: ms(histogram.value_at_percentile(75.0)),
            p90_ms: ms(histogram.value_at_percentile(90.0)),
            p95_ms: ms(histogram.value_at_percentile(95.0)),
            p99_ms: ms(histogram.value_at_percentile(99.0)),
        }
    }
}

/// Outcome of one call made by a simulated user
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// Task name, or `login`
    pub name: String,
    pub latency: Duration,
    /// `None` on success
    pub failure: Option<String>,
}

impl CallRecord {
    pub fn success(name: impl Into<String>, latency: Duration) -> Self {
        Self {
            name: name.into(),
            latency,
            failure: None,
        }
    }

    pub fn failure(name: impl Into<String>, latency: Duration, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latency,
            failure: Some(reason.into()),
        }
    }
}

/// Final numbers for one endpoint
#[derive(Debug, Clone)]
pub struct EndpointStats {
    pub name: String,
    pub successes: u64,
    pub failures: u64,
    pub latency: LatencyStats,
    /// Failure reason to count
    pub failure_reasons: BTreeMap<String, u64>,
}

impl EndpointStats {
    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }

    pub fn success_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.successes as f64 / total as f64,
        }
    }
}

struct EndpointCollector {
    histogram: Histogram<u64>,
    successes: u64,
    failures: u64,
    failure_reasons: BTreeMap<String, u64>,
}

impl EndpointCollector {
    fn new() -> Result<Self> {
        let histogram = Histogram::new_with_bounds(1, MAX_LATENCY_US, 3)
            .map_err(|e| HarnessError::InvalidArgument(format!("Failed to create histogram: {}", e)))?;
        Ok(Self {
            histogram,
            successes: 0,
            failures: 0,
            failure_reasons: BTreeMap::new(),
        })
    }
}

/// Collects call records into per-endpoint statistics
#[derive(Default)]
pub struct StatsCollector {
    endpoints: BTreeMap<String, EndpointCollector>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: CallRecord) -> Result<()> {
        let endpoint = match self.endpoints.entry(record.name.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(EndpointCollector::new()?),
        };

        let latency_us = (record.latency.as_micros() as u64).clamp(1, MAX_LATENCY_US);
        let _ = endpoint.histogram.record(latency_us);

        match record.failure {
            None => endpoint.successes += 1,
            Some(reason) => {
                endpoint.failures += 1;
                *endpoint.failure_reasons.entry(reason).or_insert(0) += 1;
            }
        }
        Ok(())
    }

    /// Endpoints in name order
    pub fn finalize(self) -> Vec<EndpointStats> {
        self.endpoints
            .into_iter()
            .map(|(name, endpoint)| EndpointStats {
                name,
                successes: endpoint.successes,
                failures: endpoint.failures,
                latency: LatencyStats::from_histogram(&endpoint.histogram),
                failure_reasons: endpoint.failure_reasons,
            })
            .collect()
    }
}
