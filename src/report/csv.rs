//! CSV export of an [`Analysis`].

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::models::Analysis;

const SEP: char = ',';
const LINE_END: &str = "\r\n";

pub const USER_HEADER: [&str; 9] = [
    "User",
    "Total",
    "Success",
    "Failed",
    "Lusha",
    "Lusha Ph",
    "Apollo",
    "Apollo Ph",
    "Total Ph",
];

/// `api_performance_report_YYYYMMDD_HHMMSS.csv`
pub fn report_filename(now: DateTime<Local>) -> String {
    format!("api_performance_report_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write one row. Fields that need it are quoted with doubled inner quotes.
pub fn write_row<W: Write, S: AsRef<str>>(w: &mut W, row: &[S]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        let cell = cell.as_ref();
        if !first {
            write!(w, "{}", SEP)?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(LINE_END.as_bytes())
}

/// Overall summary section, a blank line, then one row per user by name.
pub fn write_csv<W: Write>(w: &mut W, analysis: &Analysis) -> io::Result<()> {
    let overall = &analysis.overall;

    write_row(w, &["OVERALL SUMMARY"])?;
    write_row(w, &["Metric", "Value"])?;
    let metrics = [
        ("Total API Calls", overall.total_calls),
        ("Successful Calls", overall.successful_calls),
        ("Failed Calls", overall.failed_calls),
        ("Apollo Calls", overall.apollo_calls),
        ("Lusha Calls", overall.lusha_calls),
        ("Phone Found Total", overall.phone_found_total),
        ("Apollo Phone Found", overall.apollo_phone_found_total),
        ("Lusha Phone Found", overall.lusha_phone_found_total),
        ("Phone Not Found", overall.phone_not_found_total),
    ];
    for (label, value) in metrics {
        write_row(w, &[label.to_string(), value.to_string()])?;
    }
    write_row::<_, &str>(w, &[])?;

    write_row(w, &["USER-WISE PERFORMANCE"])?;
    write_row(w, &USER_HEADER)?;
    for (user, stats) in &analysis.users {
        write_row(
            w,
            &[
                user.clone(),
                stats.total.to_string(),
                stats.success.to_string(),
                stats.failed.to_string(),
                stats.lusha_calls.to_string(),
                stats.lusha_phone_found.to_string(),
                stats.apollo_calls.to_string(),
                stats.apollo_phone_found.to_string(),
                stats.phone_found.to_string(),
            ],
        )?;
    }

    Ok(())
}

/// Write the report into `dir` (created if missing) and return the file path.
pub fn generate_csv(dir: &Path, analysis: &Analysis, now: DateTime<Local>) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory {}", dir.display()))?;

    let path = dir.join(report_filename(now));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut writer = BufWriter::new(file);
    write_csv(&mut writer, analysis)?;
    writer.flush()?;

    tracing::info!("Wrote CSV report {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(cells: &[&str]) -> String {
        let mut out = Vec::new();
        write_row(&mut out, cells).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_plain_row() {
        assert_eq!(row(&["a", "b", "3"]), "a,b,3\r\n");
    }

    #[test]
    fn test_empty_row() {
        assert_eq!(row(&[]), "\r\n");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(row(&["Doe, Jane", "x"]), "\"Doe, Jane\",x\r\n");
        assert_eq!(row(&["say \"hi\""]), "\"say \"\"hi\"\"\"\r\n");
        assert_eq!(row(&["two\nlines"]), "\"two\nlines\"\r\n");
    }

    #[test]
    fn test_report_filename() {
        let now = Local.with_ymd_and_hms(2025, 3, 1, 7, 5, 9).unwrap();
        assert_eq!(report_filename(now), "api_performance_report_20250301_070509.csv");
    }
}
