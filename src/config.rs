//! Runtime configuration.
//!
//! Everything is read from environment variables, after loading a `.env`
//! file from the working directory if one exists:
//! - `MONGO_URI`, `DB_NAME`, `COLLECTION_NAME` - record source (MongoDB backend)
//! - `SMTP_SERVER`, `SMTP_PORT` (default `587`) - mail relay
//! - `DEFAULT_FROM_EMAIL` - sender address, also used as the SMTP username
//! - `SMTP_PASSWORD`, `RECIPIENT_EMAIL`
//! - `REPORT_OUTPUT_DIR` (default `.`), `REPORT_WINDOW_HOURS` (default `24`)

use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_WINDOW_HOURS: u32 = 24;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing MongoDB configuration: {0} is not set")]
    MissingMongo(&'static str),

    #[error("Missing email configuration. Required: SMTP_PASSWORD, DEFAULT_FROM_EMAIL, RECIPIENT_EMAIL")]
    MissingEmail,

    #[error("SMTP_SERVER is not set")]
    MissingSmtpServer,

    #[error("Invalid SMTP_PORT: {0}")]
    InvalidPort(String),

    #[error("Invalid REPORT_WINDOW_HOURS: {0}")]
    InvalidWindow(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

/// SMTP settings as read from the environment. Fields stay optional until
/// [`SmtpConfig::require`] is called, so commands that never send mail run
/// without them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmtpConfig {
    pub server: Option<String>,
    pub port: u16,
    pub from_email: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
}

/// Validated SMTP settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    /// Sender address; doubles as the login name.
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub recipient: String,
}

impl SmtpConfig {
    pub fn require(&self) -> Result<SmtpSettings, ConfigError> {
        let (Some(password), Some(from_email), Some(recipient)) =
            (&self.password, &self.from_email, &self.recipient)
        else {
            return Err(ConfigError::MissingEmail);
        };
        let server = self.server.clone().ok_or(ConfigError::MissingSmtpServer)?;

        Ok(SmtpSettings {
            server,
            port: self.port,
            username: from_email.clone(),
            password: password.clone(),
            from_email: from_email.clone(),
            recipient: recipient.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub window_hours: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            window_hours: DEFAULT_WINDOW_HOURS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `Err` is kept rather than failing eagerly: the SQLite backend does not need Mongo.
    pub mongo: Result<MongoConfig, ConfigError>,
    pub smtp: SmtpConfig,
    pub report: ReportConfig,
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mongo = match (get("MONGO_URI"), get("DB_NAME"), get("COLLECTION_NAME")) {
            (None, _, _) => Err(ConfigError::MissingMongo("MONGO_URI")),
            (_, None, _) => Err(ConfigError::MissingMongo("DB_NAME")),
            (_, _, None) => Err(ConfigError::MissingMongo("COLLECTION_NAME")),
            (Some(uri), Some(database), Some(collection)) => Ok(MongoConfig {
                uri,
                database,
                collection,
            }),
        };

        let port = match get("SMTP_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_SMTP_PORT,
        };

        let smtp = SmtpConfig {
            server: get("SMTP_SERVER"),
            port,
            from_email: get("DEFAULT_FROM_EMAIL"),
            password: get("SMTP_PASSWORD"),
            recipient: get("RECIPIENT_EMAIL"),
        };

        let mut report = ReportConfig::default();
        if let Some(dir) = get("REPORT_OUTPUT_DIR") {
            report.output_dir = PathBuf::from(dir);
        }
        if let Some(raw) = get("REPORT_WINDOW_HOURS") {
            report.window_hours = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or(ConfigError::InvalidWindow(raw))?;
        }

        Ok(Self {
            mongo,
            smtp,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.smtp.port, 587);
        assert_eq!(cfg.report.window_hours, 24);
        assert_eq!(cfg.report.output_dir, PathBuf::from("."));
        assert_eq!(cfg.mongo, Err(ConfigError::MissingMongo("MONGO_URI")));
    }

    #[test]
    fn test_mongo_requires_all_keys() {
        let cfg = config(&[("MONGO_URI", "mongodb://localhost"), ("DB_NAME", "crm")]).unwrap();
        assert_eq!(cfg.mongo, Err(ConfigError::MissingMongo("COLLECTION_NAME")));

        let cfg = config(&[
            ("MONGO_URI", "mongodb://localhost"),
            ("DB_NAME", "crm"),
            ("COLLECTION_NAME", "lookups"),
        ])
        .unwrap();
        assert_eq!(cfg.mongo.unwrap().collection, "lookups");
    }

    #[test]
    fn test_empty_value_is_unset() {
        let cfg = config(&[("MONGO_URI", "  "), ("DB_NAME", "crm")]).unwrap();
        assert_eq!(cfg.mongo, Err(ConfigError::MissingMongo("MONGO_URI")));
    }

    #[test]
    fn test_invalid_port() {
        let err = config(&[("SMTP_PORT", "smtp")]).unwrap_err();
        assert_eq!(err, ConfigError::InvalidPort("smtp".to_string()));
    }

    #[test]
    fn test_invalid_window() {
        assert!(config(&[("REPORT_WINDOW_HOURS", "0")]).is_err());
        let cfg = config(&[("REPORT_WINDOW_HOURS", "48")]).unwrap();
        assert_eq!(cfg.report.window_hours, 48);
    }

    #[test]
    fn test_smtp_require() {
        let cfg = config(&[("SMTP_SERVER", "smtp.example.com"), ("SMTP_PORT", "2525")]).unwrap();
        assert_eq!(cfg.smtp.require(), Err(ConfigError::MissingEmail));

        let cfg = config(&[
            ("SMTP_SERVER", "smtp.example.com"),
            ("SMTP_PORT", "2525"),
            ("DEFAULT_FROM_EMAIL", "reports@example.com"),
            ("SMTP_PASSWORD", "secret"),
            ("RECIPIENT_EMAIL", "ops@example.com"),
        ])
        .unwrap();
        let settings = cfg.smtp.require().unwrap();
        assert_eq!(settings.port, 2525);
        assert_eq!(settings.username, "reports@example.com");
        assert_eq!(settings.recipient, "ops@example.com");
    }

    #[test]
    fn test_smtp_require_server() {
        let cfg = config(&[
            ("DEFAULT_FROM_EMAIL", "reports@example.com"),
            ("SMTP_PASSWORD", "secret"),
            ("RECIPIENT_EMAIL", "ops@example.com"),
        ])
        .unwrap();
        assert_eq!(cfg.smtp.require(), Err(ConfigError::MissingSmtpServer));
    }
}
