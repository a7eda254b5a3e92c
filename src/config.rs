// src/config.rs

use std::{env, net::SocketAddr};

use dotenvy::dotenv;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    /// Fixed seed for question sampling. Unset means OS entropy.
    pub sampling_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = match env::var("BIND_ADDR") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "BIND_ADDR", value })?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let sampling_seed = match env::var("SAMPLING_SEED") {
            Ok(value) => Some(
                value
                    .parse()
                    .map_err(|_| ConfigError::Invalid { key: "SAMPLING_SEED", value })?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            sampling_seed,
        })
    }
}
