use once_cell::sync::Lazy;
use regex::Regex;

use crate::dashboard::{timestamp, DashboardStats, UPTIME_PERCENT};

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?").unwrap());

/// Fields recovered from the flat text export. Absent means the export did
/// not carry the line; no zero-fill, the caller picks its own defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextExportStats {
    pub new_leads: Option<f64>,
    pub conversations: Option<f64>,
    pub response_time: Option<f64>,
    pub error_rate: Option<f64>,
}

impl TextExportStats {
    /// Dashboard rendering of a text export: counters default to zero, the
    /// gauge fields reuse the summary mapping's fallback numbers.
    pub fn into_stats(self) -> DashboardStats {
        DashboardStats {
            new_leads: self.new_leads.unwrap_or(0.0),
            active_conversations: self.conversations.unwrap_or(0.0),
            response_time: self.response_time.unwrap_or(1.44),
            error_rate: self.error_rate.unwrap_or(0.02),
            uptime: UPTIME_PERCENT,
            last_update: timestamp(),
            mock_data: false,
        }
    }
}

/// Parses the four recognized `sofia_*` fields out of a flat metrics export.
/// A line counts only if it starts with the exact prefix; the first numeric
/// match after the prefix is the value. Everything else is skipped.
pub fn parse_text_export(text: &str) -> TextExportStats {
    let mut stats = TextExportStats::default();

    for line in text.lines() {
        let target = if let Some(rest) = line.strip_prefix("sofia_new_leads_total") {
            (&mut stats.new_leads, rest)
        } else if let Some(rest) = line.strip_prefix("sofia_conversations_total") {
            (&mut stats.conversations, rest)
        } else if let Some(rest) = line.strip_prefix("sofia_response_time_seconds") {
            (&mut stats.response_time, rest)
        } else if let Some(rest) = line.strip_prefix("sofia_error_rate") {
            (&mut stats.error_rate, rest)
        } else {
            continue;
        };

        let (slot, rest) = target;
        if slot.is_none() {
            *slot = NUMBER
                .find(rest)
                .and_then(|m| m.as_str().parse::<f64>().ok());
        }
    }

    stats
}
