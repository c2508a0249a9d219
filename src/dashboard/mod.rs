pub mod client;
pub mod text;

use std::future::Future;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OpsError;

pub const UPTIME_PERCENT: f64 = 99.8;

/// Read-only metrics snapshot as published by the Sofia summary endpoint.
/// Sequences may be empty; the mapping applies its own fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetrics {
    pub leads_rate: f64,
    pub bookings_rate: f64,
    #[serde(default)]
    pub p95: Vec<P95Point>,
    #[serde(default)]
    pub success_ratio: Vec<RatioSlice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct P95Point {
    pub t: f64,
    pub v: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatioSlice {
    pub label: String,
    pub value: f64,
}

/// Fixed KPI schema the dashboard widgets render.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub new_leads: f64,
    pub active_conversations: f64,
    pub response_time: f64,
    pub error_rate: f64,
    pub uptime: f64,
    pub last_update: String,
    pub mock_data: bool,
}

/// Pure mapping from a summary snapshot to the dashboard schema. The scale
/// factors and fallback numbers are wire-compatible with the existing
/// dashboard and must not change.
pub fn map_summary_to_dashboard(summary: &SummaryMetrics) -> DashboardStats {
    let response_time = summary.p95.last().map(|p| p.v).unwrap_or(1.44);
    let error_rate = summary
        .success_ratio
        .first()
        .map(|s| (100.0 - s.value) / 100.0)
        .filter(|r| r.is_finite() && *r != 0.0)
        .unwrap_or(0.02);

    DashboardStats {
        new_leads: summary.leads_rate * 10.0,
        active_conversations: summary.bookings_rate * 15.0,
        response_time,
        error_rate,
        uptime: UPTIME_PERCENT,
        last_update: timestamp(),
        mock_data: false,
    }
}

/// Snapshot served when no metrics source is configured at all.
pub fn unconfigured_stats() -> DashboardStats {
    DashboardStats {
        new_leads: 30.0,
        active_conversations: 30.0,
        response_time: 1.9,
        error_rate: 0.08,
        uptime: UPTIME_PERCENT,
        last_update: timestamp(),
        mock_data: true,
    }
}

/// Snapshot served when the configured source is unreachable or unparsable.
pub fn unreachable_stats() -> DashboardStats {
    DashboardStats {
        new_leads: 42.0,
        active_conversations: 156.0,
        response_time: 1.44,
        error_rate: 0.02,
        uptime: UPTIME_PERCENT,
        last_update: timestamp(),
        mock_data: true,
    }
}

pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Live,
    Fallback,
}

/// A value plus where it came from: the real upstream or the default.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Fetched<T> {
    pub fn is_fallback(&self) -> bool {
        self.provenance == Provenance::Fallback
    }
}

/// Wraps an upstream call so failure degrades to a default instead of
/// propagating. Every dashboard fetch goes through this: observability must
/// never break the display layer.
pub async fn fetch_with_fallback<T, Fut>(call: Fut, fallback: impl FnOnce() -> T) -> Fetched<T>
where
    Fut: Future<Output = Result<T, OpsError>>,
{
    match call.await {
        Ok(value) => Fetched {
            value,
            provenance: Provenance::Live,
        },
        Err(err) => {
            tracing::warn!(error = %err, "upstream fetch failed, serving fallback");
            Fetched {
                value: fallback(),
                provenance: Provenance::Fallback,
            }
        }
    }
}
