use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Totals across every record in the window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    /// Calls explicitly flagged as failed. Calls without a flag are not counted.
    pub failed_calls: u64,
    pub apollo_calls: u64,
    pub lusha_calls: u64,
    pub phone_found_total: u64,
    pub phone_not_found_total: u64,
    pub apollo_phone_found_total: u64,
    pub lusha_phone_found_total: u64,
}

/// Per-user counters.
///
/// Unlike [`OverallStats::failed_calls`], `failed` here counts every call
/// that was not a success, including calls without a success flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub lusha_calls: u64,
    pub lusha_phone_found: u64,
    pub apollo_calls: u64,
    pub apollo_phone_found: u64,
    pub phone_found: u64,
}

/// Result of analysing a window of call records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub overall: OverallStats,
    /// Ordered by user name.
    pub users: BTreeMap<String, UserStats>,
}

impl Analysis {
    pub fn is_empty(&self) -> bool {
        self.overall.total_calls == 0
    }

    /// Share of successful calls in percent.
    pub fn success_rate(&self) -> Option<f64> {
        percent(self.overall.successful_calls, self.overall.total_calls)
    }

    /// Share of calls that found a phone number in percent.
    pub fn phone_hit_rate(&self) -> Option<f64> {
        percent(self.overall.phone_found_total, self.overall.total_calls)
    }
}

fn percent(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 * 100.0 / whole as f64)
    }
}
