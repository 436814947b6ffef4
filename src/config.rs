use std::env;
use std::str::FromStr;

use super::error::{Error, Result};

const DEFAULT_POOL_SIZE: u32 = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Postgres connection string, from `$DATABASE_URL`.
    pub database_url: String,

    /// Maximum number of pooled connections, from `$DATABASE_POOL_SIZE`.
    pub pool_size: u32,
}

impl Config {
    /// Read the configuration from the process environment.
    ///
    /// Call `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Config> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::Config("DATABASE_URL must be set".into()))?;

        let pool_size = match lookup("DATABASE_POOL_SIZE") {
            Some(size) => u32::from_str(size.trim())
                .ok()
                .filter(|&size| size > 0)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "DATABASE_POOL_SIZE must be a positive integer, got {:?}",
                        size
                    ))
                })?,
            None => {
                debug!("DATABASE_POOL_SIZE not set, using {}", DEFAULT_POOL_SIZE);
                DEFAULT_POOL_SIZE
            }
        };

        Ok(Config {
            database_url,
            pool_size,
        })
    }
}
