//! Application configuration loaded from environment variables.

use crate::errors::{GatewayError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database holding world state and the transaction log
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Channel name reported in blocks
    pub channel_name: String,
    /// Contract name reported in transactions
    pub chaincode_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Config {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:./crowdfunding_ledger.db".to_string()),
            api_port: lookup("API_PORT")
                .unwrap_or_else(|| "4000".to_string())
                .parse()
                .map_err(|_| GatewayError::Config("Invalid API_PORT".to_string()))?,
            channel_name: non_empty(lookup("CHANNEL_NAME"), "mychannel", "CHANNEL_NAME")?,
            chaincode_name: non_empty(lookup("CHAINCODE_NAME"), "crowdfunding", "CHAINCODE_NAME")?,
        })
    }
}

fn non_empty(value: Option<String>, default: &str, key: &str) -> Result<String> {
    match value {
        None => Ok(default.to_string()),
        Some(v) if v.trim().is_empty() => Err(GatewayError::Config(format!("{key} must not be empty"))),
        Some(v) => Ok(v),
    }
}
