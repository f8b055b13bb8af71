pub mod zap;

pub use zap::ZapClient;

use crate::errors::ZapdashError;
use async_trait::async_trait;
use serde::Deserialize;

/// Raw alert as reported by the engine's alerts view.
#[derive(Debug, Clone, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub alert: String,
    #[serde(default)]
    pub riskdesc: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// The operations the orchestrator needs from the external scan engine.
/// Implemented by [`ZapClient`] in production and by scripted mocks in tests.
#[async_trait]
pub trait ScanEngine: Send + Sync {
    /// Asks the engine to access the target once, seeding its site tree.
    async fn access_url(&self, url: &str) -> Result<(), ZapdashError>;

    /// Starts a spider (discovery) job. Returns the engine's job id.
    async fn start_spider(&self, url: &str) -> Result<String, ZapdashError>;

    /// Reported spider progress, 0-100.
    async fn spider_status(&self, job_id: &str) -> Result<u32, ZapdashError>;

    /// Starts a recursive active-probe job. Returns the engine's job id.
    async fn start_active_scan(&self, url: &str) -> Result<String, ZapdashError>;

    /// Reported active-scan progress, 0-100.
    async fn active_scan_status(&self, job_id: &str) -> Result<u32, ZapdashError>;

    /// All alerts recorded for the given base URL.
    async fn alerts(&self, base_url: &str) -> Result<Vec<Alert>, ZapdashError>;
}
