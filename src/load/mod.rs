//! Load scenario driver
//!
//! Spawns one task per simulated user. Users report each call over a channel
//! and a single collector folds them into per-endpoint statistics.

pub mod scenario;
pub mod stats;
pub mod user;

pub use scenario::{default_tasks, LoadConfig, LoadTask};
pub use stats::{CallRecord, EndpointStats, LatencyStats, StatsCollector};
pub use user::{classify, SimulatedUser, LOGIN_CALL};

use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::errors::Result;

/// Outcome of a load run
#[derive(Debug)]
pub struct LoadReport {
    pub base_url: String,
    pub users: u32,
    pub duration: Duration,
    pub endpoints: Vec<EndpointStats>,
}

impl LoadReport {
    pub fn endpoint(&self, name: &str) -> Option<&EndpointStats> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    pub fn total_requests(&self) -> u64 {
        self.endpoints.iter().map(EndpointStats::total).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.endpoints.iter().map(|e| e.failures).sum()
    }

    pub fn requests_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_requests() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Run the scenario until every user finishes or `stop` is raised
pub async fn run_load(config: LoadConfig, stop: Arc<AtomicBool>) -> Result<LoadReport> {
    config.validate()?;
    let config = Arc::new(config);
    let start = Instant::now();

    info!(
        base_url = %config.base_url,
        users = config.users,
        iterations = config.iterations,
        "Starting load run"
    );

    let (tx, mut rx) = mpsc::channel::<CallRecord>(config.users as usize * 2);
    let mut handles = Vec::with_capacity(config.users as usize);

    for id in 0..config.users {
        let user = SimulatedUser::new(id, config.clone(), tx.clone(), stop.clone())?;
        handles.push(tokio::spawn(user.run()));
        if !config.spawn_interval.is_zero() {
            tokio::time::sleep(config.spawn_interval).await;
        }
    }

    // Receiver ends once every user has dropped its sender
    drop(tx);

    let mut collector = StatsCollector::new();
    while let Some(record) = rx.recv().await {
        collector.record(record)?;
    }

    for handle in handles {
        if let Err(err) = handle.await {
            warn!(error = %err, "Simulated user task failed");
        }
    }

    let report = LoadReport {
        base_url: config.base_url.clone(),
        users: config.users,
        duration: start.elapsed(),
        endpoints: collector.finalize(),
    };
    info!(
        requests = report.total_requests(),
        failures = report.total_failures(),
        duration_ms = report.duration.as_millis() as u64,
        "Load run finished"
    );
    Ok(report)
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).add_attribute(Attribute::Bold))
        .collect()
}

/// Render the report as tables
pub fn format_results(report: &LoadReport) -> String {
    let mut summary = Table::new();
    summary
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&[
            "Endpoint", "Requests", "Failures", "Success", "Min ms", "Mean ms", "p50 ms", "p90 ms",
            "p95 ms", "p99 ms", "Max ms",
        ]));

    for endpoint in &report.endpoints {
        let latency = &endpoint.latency;
        summary.add_row(vec![
            Cell::new(&endpoint.name),
            Cell::new(endpoint.total()),
            Cell::new(endpoint.failures),
            Cell::new(format!("{:.1}%", endpoint.success_rate() * 100.0)),
            Cell::new(format!("{:.2}", latency.min_ms)),
            Cell::new(format!("{:.2}", latency.mean_ms)),
            Cell::new(format!("{:.2}", latency.p50_ms)),
            Cell::new(format!("{:.2}", latency.p90_ms)),
            Cell::new(format!("{:.2}", latency.p95_ms)),
            Cell::new(format!("{:.2}", latency.p99_ms)),
            Cell::new(format!("{:.2}", latency.max_ms)),
        ]);
    }

    let mut output = format!(
        "Load results for {} ({} users, {:.2}s, {:.2} req/s)\n{}\n",
        report.base_url,
        report.users,
        report.duration.as_secs_f64(),
        report.requests_per_second(),
        summary
    );

    let failures: Vec<_> = report
        .endpoints
        .iter()
        .flat_map(|e| e.failure_reasons.iter().map(move |(reason, count)| (&e.name, reason, count)))
        .collect();

    if !failures.is_empty() {
        let mut table = Table::new();
        table
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header(&["Endpoint", "Reason", "Count"]));
        for (name, reason, count) in failures {
            table.add_row(vec![Cell::new(name), Cell::new(reason), Cell::new(count)]);
        }
        output.push_str(&format!("\nFailures\n{}\n", table));
    }

    output
}
