use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub sheets: SheetsConfig,
    pub session: SessionConfig,
    pub sync: SyncConfig,
    pub booking: BookingConfig,
    pub lang: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    /// Root of the Sheets REST API, without trailing slash.
    pub api_base_url: String,
    pub request_timeout_seconds: u64,
    pub tables: TableNames,
}

/// Titles of the three sheets inside the spreadsheet.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TableNames {
    pub class_days: String,
    pub bookings: String,
    pub roster: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// JSON file holding the persisted access token, spreadsheet id and auto-sync flag.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub auto_sync_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Optional capacity per class day. `None` means unlimited.
    pub max_students_per_class: Option<usize>,
    /// Refuse to close a class day while bookings still reference it.
    pub close_class_requires_empty: bool,
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or(defaults.server.host),
                port: match env::var("PORT") {
                    Ok(v) => v
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                    Err(_) => defaults.server.port,
                },
                frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.server.frontend_url),
            },
            sheets: SheetsConfig {
                api_base_url: env::var("SHEETS_API_BASE_URL")
                    .map(|v| v.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.sheets.api_base_url),
                request_timeout_seconds: env::var("SHEETS_REQUEST_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.sheets.request_timeout_seconds),
                tables: TableNames {
                    class_days: env::var("SHEET_CLASS_DAYS")
                        .unwrap_or(defaults.sheets.tables.class_days),
                    bookings: env::var("SHEET_BOOKINGS").unwrap_or(defaults.sheets.tables.bookings),
                    roster: env::var("SHEET_ROSTER").unwrap_or(defaults.sheets.tables.roster),
                },
            },
            session: SessionConfig {
                path: env::var("SESSION_FILE").unwrap_or(defaults.session.path),
            },
            sync: SyncConfig {
                auto_sync_interval_seconds: match env::var("AUTO_SYNC_INTERVAL_SECONDS") {
                    Ok(v) => match v.parse::<u64>() {
                        Ok(secs) if secs > 0 => secs,
                        _ => {
                            return Err(ConfigError::InvalidValue(
                                "AUTO_SYNC_INTERVAL_SECONDS".to_string(),
                            ))
                        }
                    },
                    Err(_) => defaults.sync.auto_sync_interval_seconds,
                },
            },
            booking: BookingConfig {
                max_students_per_class: match env::var("MAX_STUDENTS_PER_CLASS") {
                    Ok(v) if !v.trim().is_empty() => Some(v.trim().parse().map_err(|_| {
                        ConfigError::InvalidValue("MAX_STUDENTS_PER_CLASS".to_string())
                    })?),
                    _ => None,
                },
                close_class_requires_empty: env::var("CLOSE_CLASS_REQUIRES_EMPTY")
                    .ok()
                    .and_then(|v| parse_flag(&v))
                    .unwrap_or(defaults.booking.close_class_requires_empty),
            },
            lang: env::var("APP_LANG").unwrap_or(defaults.lang),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for TableNames {
    fn default() -> Self {
        TableNames {
            class_days: "開課日期".to_string(),
            bookings: "學生預約".to_string(),
            roster: "學生名冊".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
            },
            sheets: SheetsConfig {
                api_base_url: "https://sheets.googleapis.com/v4".to_string(),
                request_timeout_seconds: 30,
                tables: TableNames::default(),
            },
            session: SessionConfig {
                path: "data/session.json".to_string(),
            },
            sync: SyncConfig {
                // five minutes
                auto_sync_interval_seconds: 300,
            },
            booking: BookingConfig {
                max_students_per_class: None,
                close_class_requires_empty: false,
            },
            lang: "zh".to_string(),
        }
    }
}
