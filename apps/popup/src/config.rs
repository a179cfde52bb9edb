use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_SCORE_ENDPOINT: &str = "http://127.0.0.1:8787/score";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Popup configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub score_endpoint: String,
    pub store_path: PathBuf,
    /// `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let score_endpoint = std::env::var("SCORE_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_SCORE_ENDPOINT.to_string());
        reqwest::Url::parse(&score_endpoint)
            .with_context(|| format!("SCORE_ENDPOINT '{score_endpoint}' is not a valid URL"))?;

        let store_path = match std::env::var("POPUP_STORE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_store_path()?,
        };

        let timeout_secs = std::env::var("SCORE_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .context("SCORE_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Config {
            score_endpoint,
            store_path,
            request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// `<data dir>/resumelytics/storage.json`, e.g. `~/.local/share/resumelytics/storage.json`.
fn default_store_path() -> Result<PathBuf> {
    let data = dirs::data_dir().context("Could not determine a data directory for the popup store")?;
    Ok(data.join("resumelytics").join("storage.json"))
}
