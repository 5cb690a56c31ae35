//! MongoDB record source.
//!
//! The calling service has written `created_at` both as a BSON datetime and
//! as an ISO-8601 string over time, so window queries match either form.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::{Client, Collection};

use super::parse_timestamp;
use crate::config::MongoConfig;
use crate::models::{CallRecord, UNKNOWN_USER};

pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connect and ping the server so a bad URI or unreachable cluster fails here.
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .context("Invalid MongoDB connection string")?;
        let db = client.database(&config.database);

        db.run_command(doc! { "ping": 1 })
            .await
            .context("Error connecting to MongoDB")?;

        tracing::info!(
            "Connected to MongoDB {}.{}",
            config.database,
            config.collection
        );

        Ok(Self {
            collection: db.collection(&config.collection),
        })
    }

    pub async fn fetch_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<CallRecord>> {
        self.find(window_filter(cutoff)).await
    }

    pub async fn fetch_not_found(&self, cutoff: DateTime<Utc>) -> Result<Vec<CallRecord>> {
        self.find(not_found_filter(cutoff)).await
    }

    async fn find(&self, filter: Document) -> Result<Vec<CallRecord>> {
        tracing::debug!("MongoDB find: {}", filter);

        let mut cursor = self
            .collection
            .find(filter)
            .await
            .context("MongoDB query failed")?;

        let mut records = Vec::new();
        while cursor.advance().await? {
            let document = cursor.deserialize_current()?;
            records.push(record_from_document(&document));
        }

        Ok(records)
    }
}

/// `created_at >= cutoff`, as either a BSON datetime or an ISO-8601 string.
pub(crate) fn window_filter(cutoff: DateTime<Utc>) -> Document {
    let as_bson = BsonDateTime::from_millis(cutoff.timestamp_millis());
    let as_string = cutoff.to_rfc3339_opts(SecondsFormat::Micros, false);

    doc! {
        "$or": [
            { "created_at": { "$gte": as_bson } },
            { "created_at": { "$gte": as_string } }
        ]
    }
}

pub(crate) fn not_found_filter(cutoff: DateTime<Utc>) -> Document {
    let mut filter = window_filter(cutoff);
    filter.insert("phone_found", false);
    filter
}

/// Convert a raw document. Flags only count when stored as booleans.
pub(crate) fn record_from_document(document: &Document) -> CallRecord {
    let id = match document.get("_id") {
        Some(Bson::ObjectId(oid)) => Some(oid.to_hex()),
        Some(Bson::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
        None => None,
    };

    let user_name = match document.get("user_name") {
        Some(Bson::String(s)) => s.clone(),
        None | Some(Bson::Null) => UNKNOWN_USER.to_string(),
        Some(other) => other.to_string(),
    };

    let created_at = match document.get("created_at") {
        Some(Bson::DateTime(dt)) => DateTime::from_timestamp_millis(dt.timestamp_millis()),
        Some(Bson::String(s)) => parse_timestamp(s),
        _ => None,
    };

    CallRecord {
        id,
        user_name,
        lusha_api_success: document.get_bool("lusha_api_success").ok(),
        phone_found: document.get_bool("phone_found").ok(),
        enrichment_source: document
            .get_str("enrichment_source")
            .ok()
            .map(str::to_string),
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use chrono::TimeZone;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn test_window_filter_matches_both_representations() {
        let cutoff = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let filter = window_filter(cutoff);

        let branches = filter.get_array("$or").unwrap();
        assert_eq!(branches.len(), 2);

        let first = branches[0].as_document().unwrap();
        let bound = first.get_document("created_at").unwrap();
        assert_eq!(
            bound.get_datetime("$gte").unwrap().timestamp_millis(),
            cutoff.timestamp_millis()
        );

        let second = branches[1].as_document().unwrap();
        let bound = second.get_document("created_at").unwrap();
        assert_eq!(
            bound.get_str("$gte").unwrap(),
            "2025-03-01T09:00:00.000000+00:00"
        );
    }

    #[test]
    fn test_not_found_filter_adds_phone_flag() {
        let cutoff = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let filter = not_found_filter(cutoff);
        assert_eq!(filter.get_bool("phone_found").ok(), Some(false));
        assert!(filter.contains_key("$or"));
    }

    #[test]
    fn test_record_from_full_document() {
        let oid = ObjectId::new();
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 10, 15, 0).unwrap();
        let document = doc! {
            "_id": oid,
            "user_name": "alice",
            "lusha_api_success": true,
            "phone_found": false,
            "enrichment_source": "APOLLO",
            "created_at": BsonDateTime::from_millis(created.timestamp_millis()),
        };

        let record = record_from_document(&document);
        assert_eq!(record.id, Some(oid.to_hex()));
        assert_eq!(record.user_name, "alice");
        assert!(record.is_success());
        assert!(record.phone_missing());
        assert_eq!(record.provider(), Provider::Apollo);
        assert_eq!(record.created_at, Some(created));
    }

    #[test]
    fn test_record_from_sparse_document() {
        let document = doc! {
            "user_name": Bson::Null,
            "lusha_api_success": "yes",
            "phone_found": 1,
            "created_at": "2025-03-01T10:15:00.123456+00:00",
        };

        let record = record_from_document(&document);
        assert_eq!(record.id, None);
        assert_eq!(record.user_name, "Unknown");
        assert_eq!(record.lusha_api_success, None);
        assert_eq!(record.phone_found, None);
        assert_eq!(record.provider(), Provider::Lusha);
        assert!(record.created_at.is_some());
    }
}
