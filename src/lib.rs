//! Enrichment API performance reporting.
//!
//! Reads call records for a time window from MongoDB (or a local SQLite
//! mirror), aggregates them into overall and per-user statistics, writes a
//! CSV report and mails it to the configured recipient.

pub mod analysis;
pub mod config;
pub mod db;
pub mod mail;
pub mod models;
pub mod pipeline;
pub mod report;
