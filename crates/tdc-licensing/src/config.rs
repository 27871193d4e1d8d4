//! Licensing Configuration
//!
//! Values are read once at startup and handed to constructors. Nothing in this
//! crate reads the environment on its own.

use crate::code::{CodeFormat, DEFAULT_PREFIX, DEFAULT_YEAR};
use crate::error::Result;

pub const DEFAULT_PRODUCT_NAME: &str = "Tu Dinero Claro";
pub const DEFAULT_APP_URL: &str = "https://finanzas.tuadministrativa.es";
pub const DEFAULT_RESEND_URL: &str = "https://api.resend.com/emails";
pub const DEFAULT_SENDER_EMAIL: &str = "hola@tuadministrativa.es";
pub const DEFAULT_SENDER_NAME: &str = "Tu Administrativa";

/// Outbound email settings
#[derive(Clone, Debug)]
pub struct EmailConfig {
    /// Bearer credential for the transactional email API
    pub api_key: Option<String>,

    /// Endpoint accepting `POST` of a message
    pub api_url: String,

    pub sender_email: String,
    pub sender_name: String,

    /// Application link embedded in every message
    pub app_url: String,

    /// Product name used in subject and copy
    pub product_name: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_RESEND_URL.into(),
            sender_email: DEFAULT_SENDER_EMAIL.into(),
            sender_name: DEFAULT_SENDER_NAME.into(),
            app_url: DEFAULT_APP_URL.into(),
            product_name: DEFAULT_PRODUCT_NAME.into(),
            timeout_secs: 15,
        }
    }
}

impl EmailConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            api_key: non_empty("RESEND_API_KEY"),
            api_url: non_empty("RESEND_API_URL").unwrap_or(defaults.api_url),
            sender_email: non_empty("SENDER_EMAIL").unwrap_or(defaults.sender_email),
            sender_name: non_empty("SENDER_NAME").unwrap_or(defaults.sender_name),
            app_url: non_empty("APP_URL").unwrap_or(defaults.app_url),
            product_name: non_empty("PRODUCT_NAME").unwrap_or(defaults.product_name),
            timeout_secs: defaults.timeout_secs,
        }
    }
}

/// Everything the licensing side needs
#[derive(Clone, Debug)]
pub struct LicensingConfig {
    pub format: CodeFormat,
    pub product_name: String,
    pub email: EmailConfig,
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            format: CodeFormat::default(),
            product_name: DEFAULT_PRODUCT_NAME.into(),
            email: EmailConfig::default(),
        }
    }
}

impl LicensingConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source, validating the code format
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let format = CodeFormat::new(
            non_empty("LICENSE_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.into()),
            non_empty("LICENSE_YEAR").unwrap_or_else(|| DEFAULT_YEAR.into()),
        )?;
        let email = EmailConfig::from_lookup(&lookup);

        Ok(Self {
            format,
            product_name: email.product_name.clone(),
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = LicensingConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.format, CodeFormat::default());
        assert_eq!(config.product_name, "Tu Dinero Claro");
        assert!(config.email.api_key.is_none());
        assert_eq!(config.email.api_url, DEFAULT_RESEND_URL);
    }

    #[test]
    fn test_overrides() {
        let env = vars(&[
            ("LICENSE_PREFIX", "ABC"),
            ("LICENSE_YEAR", "2026"),
            ("RESEND_API_KEY", "re_test"),
            ("SENDER_NAME", "Soporte"),
        ]);
        let config = LicensingConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.format.prefix(), "ABC");
        assert_eq!(config.format.year(), "2026");
        assert_eq!(config.email.api_key.as_deref(), Some("re_test"));
        assert_eq!(config.email.sender_name, "Soporte");
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let env = vars(&[("RESEND_API_KEY", "  ")]);
        let config = EmailConfig::from_lookup(|k| env.get(k).cloned());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_bad_year_rejected() {
        let env = vars(&[("LICENSE_YEAR", "next")]);
        assert!(LicensingConfig::from_lookup(|k| env.get(k).cloned()).is_err());
    }
}
