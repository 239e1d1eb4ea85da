// src/config.rs

use std::env;

use thiserror::Error;

use crate::table::ROWS_PER_PAGE_OPTIONS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "AM_API_URL environment variable is not set.\n\n\
         Local development:\n  \
         - create a .env file in the project root\n  \
         - add: AM_API_URL=https://your-api-url.com\n\n\
         Production:\n  \
         - set AM_API_URL in the service environment of your hosting platform"
    )]
    MissingApiUrl,

    #[error("AM_API_URL is not a valid absolute URL ({value}): {reason}")]
    InvalidApiUrl { value: String, reason: String },

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream AM API base URL, never with a trailing slash.
    pub api_url: String,
    pub port: u16,
    pub rows_per_page: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = get("AM_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingApiUrl)?;

        let api_url = raw.trim_end_matches('/').to_string();
        reqwest::Url::parse(&api_url).map_err(|e| ConfigError::InvalidApiUrl {
            value: raw.clone(),
            reason: e.to_string(),
        })?;

        let port = match get("PORT") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::InvalidValue { var: "PORT", value: v })?,
            None => 8080,
        };

        let rows_per_page = match get("ROWS_PER_PAGE") {
            Some(v) => v
                .parse()
                .ok()
                .filter(|n| ROWS_PER_PAGE_OPTIONS.contains(n))
                .ok_or(ConfigError::InvalidValue { var: "ROWS_PER_PAGE", value: v })?,
            None => 25,
        };

        Ok(Self { api_url, port, rows_per_page })
    }
}
