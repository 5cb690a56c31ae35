mod mongo;
mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::models::*;

pub use mongo::MongoStore;

/// Start of a reporting window ending at `now`. Fails when the window
/// reaches past the representable date range.
pub fn window_start(now: DateTime<Utc>, hours: u32) -> Result<DateTime<Utc>> {
    Duration::try_hours(i64::from(hours))
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| anyhow::anyhow!("Reporting window of {} hours is out of range", hours))
}

/// Where call records are read from.
pub enum RecordStore {
    Mongo(MongoStore),
    Sqlite(Database),
}

impl RecordStore {
    pub fn backend(&self) -> &'static str {
        match self {
            RecordStore::Mongo(_) => "mongodb",
            RecordStore::Sqlite(_) => "sqlite",
        }
    }

    /// All records created at or after `cutoff`.
    pub async fn fetch_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<CallRecord>> {
        match self {
            RecordStore::Mongo(store) => store.fetch_since(cutoff).await,
            RecordStore::Sqlite(db) => db.fetch_since(cutoff),
        }
    }

    /// Records created at or after `cutoff` whose phone number is still not found.
    pub async fn fetch_not_found(&self, cutoff: DateTime<Utc>) -> Result<Vec<CallRecord>> {
        match self {
            RecordStore::Mongo(store) => store.fetch_not_found(cutoff).await,
            RecordStore::Sqlite(db) => db.fetch_not_found(cutoff),
        }
    }
}

/// Local SQLite mirror of the call records collection.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "api-perf-report")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("records.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Writes
    // ============================================================

    /// Insert a record, assigning a fresh id when it has none.
    pub fn insert_record(&self, record: &CallRecord) -> Result<CallRecord> {
        let conn = self.conn.lock().expect("database lock poisoned");
        insert_with(&conn, record)
    }

    /// Insert records in one transaction. Returns how many were written.
    pub fn insert_records(&self, records: &[CallRecord]) -> Result<usize> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        for record in records {
            insert_with(&tx, record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Import a JSON array of records, as exported from the source collection.
    pub fn import_json(&self, json: &str) -> Result<usize> {
        let records: Vec<CallRecord> =
            serde_json::from_str(json).context("Failed to parse call records")?;
        self.insert_records(&records)
    }

    // ============================================================
    // Reads
    // ============================================================

    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM call_records", [], |row| {
            row.get(0)
        })?;
        Ok(count as u64)
    }

    /// Records created at or after `cutoff`, oldest first. Records without a
    /// timestamp never fall inside a window.
    pub fn fetch_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<CallRecord>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, user_name, lusha_api_success, phone_found, enrichment_source, created_at
             FROM call_records
             WHERE created_at IS NOT NULL AND created_at >= ?
             ORDER BY created_at",
        )?;

        let records = stmt
            .query_map([format_timestamp(cutoff)], map_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn fetch_not_found(&self, cutoff: DateTime<Utc>) -> Result<Vec<CallRecord>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, user_name, lusha_api_success, phone_found, enrichment_source, created_at
             FROM call_records
             WHERE phone_found = 0 AND created_at IS NOT NULL AND created_at >= ?
             ORDER BY created_at",
        )?;

        let records = stmt
            .query_map([format_timestamp(cutoff)], map_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn insert_with(conn: &Connection, record: &CallRecord) -> Result<CallRecord> {
    let id = record
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    conn.execute(
        "INSERT INTO call_records (id, user_name, lusha_api_success, phone_found, enrichment_source, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        (
            &id,
            &record.user_name,
            record.lusha_api_success,
            record.phone_found,
            &record.enrichment_source,
            record.created_at.map(format_timestamp),
        ),
    )
    .with_context(|| format!("Failed to insert record {}", id))?;

    Ok(CallRecord {
        id: Some(id),
        ..record.clone()
    })
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<CallRecord> {
    Ok(CallRecord {
        id: row.get(0)?,
        user_name: row
            .get::<_, Option<String>>(1)?
            .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        lusha_api_success: row.get(2)?,
        phone_found: row.get(3)?,
        enrichment_source: row.get(4)?,
        created_at: row.get::<_, Option<String>>(5)?.and_then(|s| parse_timestamp(&s)),
    })
}

/// Fixed-width UTC form, so lexical order matches chronological order.
fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_start() {
        let now = Utc.with_ymd_and_hms(2025, 3, 2, 12, 0, 0).unwrap();
        assert_eq!(
            window_start(now, 24).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_window_start_out_of_range() {
        let err = window_start(Utc::now(), u32::MAX).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_format_timestamp_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let b = a + Duration::microseconds(1500);
        assert_eq!(format_timestamp(a), "2025-03-01T09:00:00.000000Z");
        assert_eq!(format_timestamp(a).len(), format_timestamp(b).len());
        assert!(format_timestamp(a) < format_timestamp(b));
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2025-03-01T09:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01T11:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01T09:30:00.000000"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01 09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
