//! Plain-text rendering for the terminal.

use crate::models::{Analysis, CallRecord};

use super::USER_HEADER;

/// Render the summary and the per-user table.
///
/// Example output:
/// ```text
/// API PERFORMANCE REPORT (last 24h)
///
/// Total API Calls     3
/// Successful Calls    2 (66.7%)
/// ...
///
/// User   Total  Success  Failed  Lusha  Lusha Ph  Apollo  Apollo Ph  Total Ph
/// alice      2        2       0      1         1       1          0         1
/// bob        1        0       1      1         0       0          0         0
/// ```
pub fn render_report(analysis: &Analysis, window_hours: u32) -> String {
    let o = &analysis.overall;
    let mut output = format!("API PERFORMANCE REPORT (last {}h)\n\n", window_hours);

    let rows = [
        ("Total API Calls", o.total_calls, None),
        ("Successful Calls", o.successful_calls, analysis.success_rate()),
        ("Failed Calls", o.failed_calls, None),
        ("Apollo Calls", o.apollo_calls, None),
        ("Lusha Calls", o.lusha_calls, None),
        ("Phone Found Total", o.phone_found_total, analysis.phone_hit_rate()),
        ("Apollo Phone Found", o.apollo_phone_found_total, None),
        ("Lusha Phone Found", o.lusha_phone_found_total, None),
        ("Phone Not Found", o.phone_not_found_total, None),
    ];
    let label_width = rows.iter().map(|(label, _, _)| label.len()).max().unwrap_or(0);

    for (label, value, rate) in rows {
        output.push_str(&format!("{:<width$}  {}", label, value, width = label_width));
        if let Some(rate) = rate {
            output.push_str(&format!(" ({:.1}%)", rate));
        }
        output.push('\n');
    }

    if analysis.users.is_empty() {
        return output;
    }

    output.push('\n');

    let user_width = analysis
        .users
        .keys()
        .map(|name| name.chars().count())
        .chain(std::iter::once(USER_HEADER[0].len()))
        .max()
        .unwrap_or(0);

    output.push_str(&format!("{:<width$}", USER_HEADER[0], width = user_width));
    for title in &USER_HEADER[1..] {
        output.push_str("  ");
        output.push_str(title);
    }
    output.push('\n');

    for (name, stats) in &analysis.users {
        let counts = [
            stats.total,
            stats.success,
            stats.failed,
            stats.lusha_calls,
            stats.lusha_phone_found,
            stats.apollo_calls,
            stats.apollo_phone_found,
            stats.phone_found,
        ];
        output.push_str(&format!("{:<width$}", name, width = user_width));
        for (title, count) in USER_HEADER[1..].iter().zip(counts) {
            output.push_str(&format!("  {:>width$}", count, width = title.len()));
        }
        output.push('\n');
    }

    output
}

pub fn print_report(analysis: &Analysis, window_hours: u32) {
    print!("{}", render_report(analysis, window_hours));
}

/// Listing of records whose phone number is still not found, one per line.
pub fn render_not_found(records: &[CallRecord]) -> String {
    let mut output = format!(
        "{} record{} with phone still not found\n",
        records.len(),
        if records.len() == 1 { "" } else { "s" }
    );

    let user_width = records
        .iter()
        .map(|r| r.user_name.chars().count())
        .max()
        .unwrap_or(0);

    for record in records {
        let when = record
            .created_at
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "  {:<16}  {:<width$}  {}\n",
            when,
            record.user_name,
            record.provider(),
            width = user_width
        ));
    }

    output
}
