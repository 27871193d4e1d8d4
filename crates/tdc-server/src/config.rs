//! Server Configuration

use std::path::PathBuf;

use tdc_licensing::{LicensingConfig, LicensingError};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LICENSES_FILE: &str = "licenses_issued.json";
pub const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("PORT must be a number between 1 and 65535, got {0:?}")]
    Port(String),

    #[error(transparent)]
    Licensing(#[from] LicensingError),
}

/// Process-wide settings, read once in `main`
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub licenses_file: PathBuf,
    pub static_dir: PathBuf,

    /// Bearer token guarding `/admin`. `None` leaves it open.
    pub admin_token: Option<String>,

    pub licensing: LicensingConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = match non_empty("BIND_ADDR") {
            Some(addr) => addr,
            None => {
                let port = match non_empty("PORT") {
                    Some(raw) => raw
                        .trim()
                        .parse::<u16>()
                        .ok()
                        .filter(|p| *p != 0)
                        .ok_or(ConfigError::Port(raw))?,
                    None => DEFAULT_PORT,
                };
                format!("0.0.0.0:{port}")
            }
        };

        Ok(Self {
            bind_addr,
            licenses_file: non_empty("LICENSES_FILE")
                .unwrap_or_else(|| DEFAULT_LICENSES_FILE.into())
                .into(),
            static_dir: non_empty("STATIC_DIR")
                .unwrap_or_else(|| DEFAULT_STATIC_DIR.into())
                .into(),
            admin_token: non_empty("ADMIN_TOKEN"),
            licensing: LicensingConfig::from_lookup(&lookup)?,
        })
    }
}
