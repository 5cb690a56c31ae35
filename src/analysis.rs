//! Aggregation of call records into report statistics.

use crate::models::{Analysis, CallRecord, OverallStats, Provider, UserStats};

/// Aggregate a window of records.
///
/// Overall `failed_calls` counts only explicit failures while the per-user
/// `failed` counter treats every non-success as failed. Both are reported
/// as-is; consumers of the CSV rely on the two definitions.
pub fn analyze_records(records: &[CallRecord]) -> Analysis {
    let mut analysis = Analysis::default();

    for record in records {
        tally_overall(&mut analysis.overall, record);
        let stats = analysis.users.entry(record.user_name.clone()).or_default();
        tally_user(stats, record);
    }

    analysis
}

fn tally_overall(overall: &mut OverallStats, record: &CallRecord) {
    overall.total_calls += 1;

    if record.is_success() {
        overall.successful_calls += 1;
    }
    if record.is_failure() {
        overall.failed_calls += 1;
    }

    match record.provider() {
        Provider::Apollo => overall.apollo_calls += 1,
        Provider::Lusha => overall.lusha_calls += 1,
    }

    if record.has_phone() {
        overall.phone_found_total += 1;
        match record.provider() {
            Provider::Apollo => overall.apollo_phone_found_total += 1,
            Provider::Lusha => overall.lusha_phone_found_total += 1,
        }
    }
    if record.phone_missing() {
        overall.phone_not_found_total += 1;
    }
}

fn tally_user(stats: &mut UserStats, record: &CallRecord) {
    stats.total += 1;

    if record.is_success() {
        stats.success += 1;
    } else {
        stats.failed += 1;
    }

    let phone_found = record.has_phone();
    if phone_found {
        stats.phone_found += 1;
    }

    match record.provider() {
        Provider::Apollo => {
            stats.apollo_calls += 1;
            if phone_found {
                stats.apollo_phone_found += 1;
            }
        }
        Provider::Lusha => {
            stats.lusha_calls += 1;
            if phone_found {
                stats.lusha_phone_found += 1;
            }
        }
    }
}
