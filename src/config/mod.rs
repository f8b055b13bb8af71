use tracing::{error, warn};

pub const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:8080";

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the ZAP daemon.
    pub engine_url: String,
    /// API key sent with every engine call.
    pub engine_api_key: String,
    /// Path to the SQLite store. None disables all data-dependent endpoints.
    pub db_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let engine_url = std::env::var("ZAP_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_ENGINE_URL.to_string());

        let engine_api_key = match std::env::var("ZAP_API_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => {
                warn!("ZAP_API_KEY is not set, using a placeholder");
                "YOUR_API_KEY_GOES_HERE".to_string()
            }
        };

        let db_path = match std::env::var("ZAPDASH_DB") {
            Ok(path) if !path.is_empty() => Some(path),
            _ => {
                error!("ZAPDASH_DB is not set, scan storage will not function");
                None
            }
        };

        Self {
            engine_url,
            engine_api_key,
            db_path,
        }
    }
}
