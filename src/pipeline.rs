//! The reporting job: fetch a window, analyze it, write the CSV and mail it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, Utc};

use crate::analysis::analyze_records;
use crate::config::SmtpConfig;
use crate::db::{window_start, RecordStore};
use crate::mail::{Attachment, EmailService, OutgoingEmail};
use crate::models::{Analysis, CallRecord};
use crate::report;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub window_hours: u32,
    pub out_dir: PathBuf,
    pub send_email: bool,
    /// Also print the report to stdout.
    pub print: bool,
}

/// Records created inside the last `window_hours`.
pub async fn fetch_window(store: &RecordStore, window_hours: u32) -> Result<Vec<CallRecord>> {
    let cutoff = window_start(Utc::now(), window_hours)?;
    let records = store.fetch_since(cutoff).await?;
    tracing::info!(
        "Fetched {} record(s) since {}",
        records.len(),
        cutoff.to_rfc3339()
    );
    Ok(records)
}

/// Run the whole job. Returns the CSV path, or `None` when the window was
/// empty, in which case nothing is written and nothing is sent.
///
/// The CSV stays on disk when only the email step fails.
pub async fn run_report(
    store: &RecordStore,
    smtp: &SmtpConfig,
    options: &RunOptions,
) -> Result<Option<PathBuf>> {
    let records = fetch_window(store, options.window_hours).await?;
    let analysis = analyze_records(&records);
    if analysis.is_empty() {
        tracing::info!(
            "No records in the last {}h; nothing to report",
            options.window_hours
        );
        return Ok(None);
    }

    if options.print {
        report::print_report(&analysis, options.window_hours);
    }

    let csv_path = report::generate_csv(&options.out_dir, &analysis, Local::now())?;

    if options.send_email {
        email_report(smtp, &csv_path, &analysis, options.window_hours).await?;
    }

    Ok(Some(csv_path))
}

async fn email_report(
    smtp: &SmtpConfig,
    csv_path: &Path,
    analysis: &Analysis,
    window_hours: u32,
) -> Result<()> {
    let service = EmailService::new(smtp.require()?);

    let data = std::fs::read(csv_path)
        .with_context(|| format!("Failed to read {}", csv_path.display()))?;
    let filename = csv_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| report::report_filename(Local::now()));

    let email = OutgoingEmail::new(
        service.settings().recipient.clone(),
        report::email_subject(Local::now()),
        report::email_body(analysis, window_hours),
    )
    .with_attachment(Attachment::csv(filename, data));

    service.send(&email).await?;
    Ok(())
}
