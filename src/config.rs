//! Startup configuration read from the process environment.

use crate::error::ConfigError;
use crate::monitor::StalenessPolicy;

/// Default port if not specified via environment variable.
const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
const DEFAULT_DB_PATH: &str = "sqlite:bizpulse.db?mode=rwc";

const ENV_PORT: &str = "BIZPULSE_PORT";
const ENV_DATABASE_URL: &str = "BIZPULSE_DATABASE_URL";
const ENV_REST_URL: &str = "BIZPULSE_REST_URL";
const ENV_SERVICE_KEY: &str = "BIZPULSE_SERVICE_KEY";
const ENV_SELLER_INTERVAL: &str = "BIZPULSE_SELLER_INTERVAL_DAYS";
const ENV_ADMIN_INTERVAL: &str = "BIZPULSE_ADMIN_INTERVAL_DAYS";

/// Where entities are read from and notifications written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Local SQLite database.
    Sqlite { database_url: String },

    /// The managed platform's REST endpoint, accessed with its service key.
    Rest { base_url: String, service_key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub backend: BackendConfig,
    pub policy: StalenessPolicy,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(ENV_PORT) {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: ENV_PORT,
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let backend = match lookup(ENV_REST_URL).filter(|url| !url.is_empty()) {
            Some(base_url) => {
                let service_key = lookup(ENV_SERVICE_KEY)
                    .filter(|key| !key.is_empty())
                    .ok_or(ConfigError::Missing {
                        name: ENV_REST_URL,
                        missing: ENV_SERVICE_KEY,
                    })?;
                BackendConfig::Rest {
                    base_url,
                    service_key,
                }
            }
            None => BackendConfig::Sqlite {
                database_url: lookup(ENV_DATABASE_URL)
                    .unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            },
        };

        let defaults = StalenessPolicy::default();
        let policy = StalenessPolicy {
            seller_interval_days: interval_days(
                &lookup,
                ENV_SELLER_INTERVAL,
                defaults.seller_interval_days,
            )?,
            admin_interval_days: interval_days(
                &lookup,
                ENV_ADMIN_INTERVAL,
                defaults.admin_interval_days,
            )?,
        };

        Ok(Self {
            port,
            backend,
            policy,
        })
    }
}

fn interval_days<F>(lookup: &F, name: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(name) else {
        return Ok(default);
    };

    match value.parse::<i64>() {
        Ok(days) if days > 0 => Ok(days),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}
