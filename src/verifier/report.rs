use serde::Serialize;

use crate::verifier::RunResult;

/// Aggregate view over all simulated users of one load run.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub users: usize,
    pub users_passed: usize,
    pub steps_passed: u64,
    pub steps_failed: u64,
    pub error_rate: f64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
}

impl LoadReport {
    pub fn from_runs(runs: &[RunResult]) -> Self {
        let users = runs.len();
        let users_passed = runs.iter().filter(|r| r.all_passed()).count();
        let steps_passed = runs.iter().map(|r| r.steps_passed as u64).sum();
        let steps_failed = runs.iter().map(|r| r.steps_failed as u64).sum();

        let mut latencies: Vec<f64> = runs
            .iter()
            .flat_map(|r| r.steps.iter().map(|s| s.latency_ms as f64))
            .collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let total_steps = steps_passed + steps_failed;
        let error_rate = if total_steps == 0 {
            0.0
        } else {
            steps_failed as f64 / total_steps as f64
        };

        let avg_latency_ms = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<f64>() / latencies.len() as f64
        };
        let p95_latency_ms = if latencies.is_empty() {
            0.0
        } else {
            let rank = (0.95 * latencies.len() as f64).ceil() as usize;
            latencies[rank.saturating_sub(1).min(latencies.len() - 1)]
        };

        Self {
            users,
            users_passed,
            steps_passed,
            steps_failed,
            error_rate,
            avg_latency_ms,
            p95_latency_ms,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.users_passed == self.users
    }
}
