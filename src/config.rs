/// Runtime configuration, read from the environment.
use crate::error::{DashError, Result};
use crate::loader::LoadOptions;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SUPERSTORE: &str = "Sample Superstore.xls";
pub const DEFAULT_PURCHASES: &str = "amazon.csv";
pub const DEFAULT_SUGGESTION_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashConfig {
    pub host: String,
    pub port: u16,
    pub superstore_path: PathBuf,
    pub purchases_path: PathBuf,
    pub strict_schema: bool,
    pub suggestion_limit: usize,
}

impl Default for DashConfig {
    fn default() -> Self {
        DashConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            superstore_path: PathBuf::from(DEFAULT_SUPERSTORE),
            purchases_path: PathBuf::from(DEFAULT_PURCHASES),
            strict_schema: false,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

impl DashConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = DashConfig::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = parse("PORT", &port)?;
        }
        if let Some(path) = lookup("EASYDASH_SUPERSTORE") {
            config.superstore_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("EASYDASH_PURCHASES") {
            config.purchases_path = PathBuf::from(path);
        }
        if let Some(strict) = lookup("EASYDASH_STRICT_SCHEMA") {
            config.strict_schema = parse_flag("EASYDASH_STRICT_SCHEMA", &strict)?;
        }
        if let Some(limit) = lookup("EASYDASH_SUGGESTION_LIMIT") {
            config.suggestion_limit = parse("EASYDASH_SUGGESTION_LIMIT", &limit)?;
            if config.suggestion_limit == 0 {
                return Err(DashError::Config(
                    "EASYDASH_SUGGESTION_LIMIT must be at least 1".to_string(),
                ));
            }
        }

        Ok(config)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            strict: self.strict_schema,
        }
    }
}

fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| DashError::Config(format!("{} must be a number, got '{}'", key, raw)))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(DashError::Config(format!("{} must be a boolean, got '{}'", key, raw))),
    }
}
