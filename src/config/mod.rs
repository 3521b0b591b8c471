use std::path::PathBuf;

use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// File backing the local key-value store
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Directory printed invoices are written to
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    /// Log output; the terminal itself belongs to the UI
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("invoice-data.json")
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("invoices")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("invoice-builder.log")
}

impl Config {
    /// Load configuration from `INVOICE_*` environment variables
    pub fn load() -> Result<Self> {
        let config = envy::prefixed("INVOICE_").from_env::<Config>()?;

        Ok(config)
    }
}

/// Load the `.env` file if present, then the configuration
pub fn init() -> Result<Config> {
    dotenv().ok();

    Config::load()
}
