use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// User name assigned to records that carry no usable `user_name`.
pub const UNKNOWN_USER: &str = "Unknown";

/// Source tag written by the calling service for Apollo lookups.
pub const APOLLO_SOURCE: &str = "APOLLO";

/// Enrichment provider that served a call.
///
/// Only an exact `"APOLLO"` source tag maps to Apollo. Everything else,
/// including a missing tag, was served by Lusha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Apollo,
    Lusha,
}

impl Provider {
    pub fn from_source(source: Option<&str>) -> Self {
        match source {
            Some(APOLLO_SOURCE) => Provider::Apollo,
            _ => Provider::Lusha,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Apollo => "Apollo",
            Provider::Lusha => "Lusha",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single enrichment API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Backend identifier (Mongo `ObjectId` hex or SQLite UUID).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default = "unknown_user", deserialize_with = "user_name_or_unknown")]
    pub user_name: String,
    /// Whether the Lusha API answered successfully. `None` when not recorded.
    #[serde(default)]
    pub lusha_api_success: Option<bool>,
    #[serde(default)]
    pub phone_found: Option<bool>,
    /// Raw source tag, e.g. `"APOLLO"`.
    #[serde(default)]
    pub enrichment_source: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn unknown_user() -> String {
    UNKNOWN_USER.to_string()
}

fn user_name_or_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_user))
}

impl CallRecord {
    /// A record for `user_name` with every flag unset.
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            id: None,
            user_name: user_name.into(),
            lusha_api_success: None,
            phone_found: None,
            enrichment_source: None,
            created_at: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.lusha_api_success == Some(true)
    }

    /// True only for an explicit `false`; a missing flag is not a failure.
    pub fn is_failure(&self) -> bool {
        self.lusha_api_success == Some(false)
    }

    pub fn has_phone(&self) -> bool {
        self.phone_found == Some(true)
    }

    /// True only for an explicit `false`.
    pub fn phone_missing(&self) -> bool {
        self.phone_found == Some(false)
    }

    pub fn provider(&self) -> Provider {
        Provider::from_source(self.enrichment_source.as_deref())
    }
}
