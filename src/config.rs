// src/config.rs
use std::{env, fmt::Display, net::IpAddr, str::FromStr};

use tracing::{info, warn};

use crate::error::ServerError;
use crate::services::DEFAULT_RECENT_LIMIT;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    pub recent_limit: u32,
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn load() -> Result<Self, ServerError> {
        if let Err(e) = dotenvy::dotenv() {
            info!("No .env file loaded: {e}");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            host: try_load(&lookup, "HOST", "0.0.0.0")?,
            port: try_load(&lookup, "PORT", "22222")?,
            database_url: try_load(&lookup, "DATABASE_URL", "sqlite://second_game.db")?,
            recent_limit: try_load(&lookup, "RECENT_POLLS_LIMIT", &DEFAULT_RECENT_LIMIT.to_string())?,
        })
    }
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ServerError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ServerError::Config {
                key,
                reason: e.to_string(),
            }
        })
}
