//! Sync tuning resolution
//!
//! Each value is resolved with priority Database → ENV → TOML → compiled
//! default. Invalid values at one tier are logged and skipped.

use attsync_common::config::TomlConfig;
use attsync_common::db::get_setting;
use attsync_common::time::{format_utc_offset, parse_utc_offset};
use attsync_common::Result;
use chrono::{FixedOffset, Offset, Utc};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Records requested per page (`maxResults`)
pub const DEFAULT_PAGE_SIZE: u32 = 30;
/// Offset appended to device search bounds
pub const DEFAULT_UTC_OFFSET: &str = "+06:00";
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;
/// Upper bound for one queued job
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 3000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Resolved sync settings
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub page_size: u32,
    pub utc_offset: FixedOffset,
    pub interval: Duration,
    pub job_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            utc_offset: parse_utc_offset(DEFAULT_UTC_OFFSET).unwrap_or_else(|_| Utc.fix()),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            job_timeout: Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// One value's candidates, highest priority first
struct Tiers<T> {
    key: &'static str,
    database: Option<String>,
    environment: Option<String>,
    toml: Option<T>,
}

impl<T: Clone> Tiers<T> {
    fn resolve(self, parse: impl Fn(&str) -> Option<T>, default: T) -> T {
        if let Some(raw) = &self.database {
            match parse(raw) {
                Some(value) => {
                    info!("{} loaded from database", self.key);
                    return value;
                }
                None => warn!("Ignoring invalid {} in database: {}", self.key, raw),
            }
        }

        if let Some(raw) = &self.environment {
            match parse(raw) {
                Some(value) => {
                    info!("{} loaded from environment variable", self.key);
                    return value;
                }
                None => warn!("Ignoring invalid {} in environment: {}", self.key, raw),
            }
        }

        if let Some(value) = self.toml {
            info!("{} loaded from TOML config", self.key);
            return value;
        }

        default
    }
}

fn env_var_name(key: &str) -> String {
    format!("ATTSYNC_{}", key.to_uppercase())
}

async fn tiers<T>(pool: &SqlitePool, key: &'static str, toml: Option<T>) -> Result<Tiers<T>> {
    Ok(Tiers {
        key,
        database: get_setting(pool, key).await?,
        environment: std::env::var(env_var_name(key)).ok(),
        toml,
    })
}

fn positive<T: FromStr + PartialOrd + Default>(raw: &str) -> Option<T> {
    raw.trim().parse::<T>().ok().filter(|v| *v > T::default())
}

impl SyncSettings {
    /// Resolve every sync setting
    pub async fn resolve(pool: &SqlitePool, toml_config: &TomlConfig) -> Result<Self> {
        let defaults = Self::default();
        let sync = &toml_config.sync;

        let toml_offset = match sync.utc_offset.as_deref().map(parse_utc_offset) {
            Some(Ok(offset)) => Some(offset),
            Some(Err(e)) => {
                warn!("Ignoring TOML utc_offset: {}", e);
                None
            }
            None => None,
        };

        let page_size = tiers(pool, "sync_page_size", sync.page_size.filter(|v| *v > 0))
            .await?
            .resolve(positive::<u32>, defaults.page_size);

        let utc_offset = tiers(pool, "device_utc_offset", toml_offset)
            .await?
            .resolve(|raw| parse_utc_offset(raw).ok(), defaults.utc_offset);

        let interval_secs = tiers(pool, "sync_interval_secs", sync.interval_secs.filter(|v| *v > 0))
            .await?
            .resolve(positive::<u64>, DEFAULT_INTERVAL_SECS);

        let job_timeout_secs = tiers(pool, "job_timeout_secs", sync.job_timeout_secs.filter(|v| *v > 0))
            .await?
            .resolve(positive::<u64>, DEFAULT_JOB_TIMEOUT_SECS);

        let request_timeout_secs = tiers(
            pool,
            "device_request_timeout_secs",
            sync.request_timeout_secs.filter(|v| *v > 0),
        )
        .await?
        .resolve(positive::<u64>, DEFAULT_REQUEST_TIMEOUT_SECS);

        let settings = Self {
            page_size,
            utc_offset,
            interval: Duration::from_secs(interval_secs),
            job_timeout: Duration::from_secs(job_timeout_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
        };

        info!(
            page_size = settings.page_size,
            utc_offset = %format_utc_offset(settings.utc_offset),
            interval_secs,
            job_timeout_secs,
            request_timeout_secs,
            "Sync settings resolved"
        );

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attsync_common::config::SyncConfig;
    use attsync_common::db::{init_database, set_setting};

    #[test]
    fn test_defaults() {
        let settings = SyncSettings::default();
        assert_eq!(settings.page_size, 30);
        assert_eq!(format_utc_offset(settings.utc_offset), "+06:00");
        assert_eq!(settings.interval, Duration::from_secs(3600));
        assert_eq!(settings.job_timeout, Duration::from_secs(3000));
    }

    #[test]
    fn test_positive_rejects_zero_and_garbage() {
        assert_eq!(positive::<u32>("25"), Some(25));
        assert_eq!(positive::<u32>(" 7 "), Some(7));
        assert_eq!(positive::<u32>("0"), None);
        assert_eq!(positive::<u32>("many"), None);
    }

    #[tokio::test]
    async fn test_database_beats_toml() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("attsync.db")).await.unwrap();

        let toml_config = TomlConfig {
            sync: SyncConfig {
                page_size: Some(50),
                utc_offset: Some("+05:30".to_string()),
                ..SyncConfig::default()
            },
            ..TomlConfig::default()
        };

        set_setting(&pool, "sync_page_size", "10").await.unwrap();

        let settings = SyncSettings::resolve(&pool, &toml_config).await.unwrap();
        assert_eq!(settings.page_size, 10);
        assert_eq!(format_utc_offset(settings.utc_offset), "+05:30");
    }

    #[tokio::test]
    async fn test_invalid_database_value_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("attsync.db")).await.unwrap();

        set_setting(&pool, "device_utc_offset", "Asia/Dhaka").await.unwrap();
        set_setting(&pool, "sync_interval_secs", "0").await.unwrap();

        let settings = SyncSettings::resolve(&pool, &TomlConfig::default()).await.unwrap();
        assert_eq!(format_utc_offset(settings.utc_offset), "+06:00");
        assert_eq!(settings.interval, Duration::from_secs(3600));
    }
}
