use chrono::{DateTime, Local};

use crate::models::Analysis;

pub fn email_subject(now: DateTime<Local>) -> String {
    format!("API Performance Report - {}", now.format("%Y-%m-%d %H:%M"))
}

/// Plain-text body accompanying the CSV attachment.
pub fn email_body(analysis: &Analysis, window_hours: u32) -> String {
    let o = &analysis.overall;
    format!(
        "Hello,

Please find attached the {}-hour API Performance Report.

SUMMARY:
- Total API Calls: {}
- Successful: {} | Failed: {}
- Apollo Calls: {} | Lusha Calls: {}
- Phone Numbers Found: {} (Apollo: {}, Lusha: {})

Detailed report is attached as CSV file.

Best regards,
API Performance Monitor
",
        window_hours,
        o.total_calls,
        o.successful_calls,
        o.failed_calls,
        o.apollo_calls,
        o.lusha_calls,
        o.phone_found_total,
        o.apollo_phone_found_total,
        o.lusha_phone_found_total,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OverallStats;
    use chrono::TimeZone;

    #[test]
    fn test_subject() {
        let now = Local.with_ymd_and_hms(2025, 3, 1, 7, 5, 9).unwrap();
        assert_eq!(email_subject(now), "API Performance Report - 2025-03-01 07:05");
    }

    #[test]
    fn test_body_summarises_totals() {
        let analysis = Analysis {
            overall: OverallStats {
                total_calls: 12,
                successful_calls: 9,
                failed_calls: 2,
                apollo_calls: 4,
                lusha_calls: 8,
                phone_found_total: 6,
                phone_not_found_total: 5,
                apollo_phone_found_total: 2,
                lusha_phone_found_total: 4,
            },
            users: Default::default(),
        };

        let body = email_body(&analysis, 24);
        assert!(body.starts_with("Hello,\n\n"));
        assert!(body.contains("attached the 24-hour API Performance Report."));
        assert!(body.contains("- Total API Calls: 12\n"));
        assert!(body.contains("- Successful: 9 | Failed: 2\n"));
        assert!(body.contains("- Apollo Calls: 4 | Lusha Calls: 8\n"));
        assert!(body.contains("- Phone Numbers Found: 6 (Apollo: 2, Lusha: 4)\n"));
        assert!(body.ends_with("API Performance Monitor\n"));
    }

    #[test]
    fn test_body_names_the_window() {
        let body = email_body(&Analysis::default(), 48);
        assert!(body.contains("attached the 48-hour API Performance Report."));
        assert!(!body.contains("24-hour"));
    }
}
