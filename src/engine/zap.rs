use super::{Alert, ScanEngine};
use crate::errors::ZapdashError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// HTTP client for a ZAP daemon's JSON API. Every call carries the API key
/// as a query parameter; a transport failure or non-2xx response is a
/// connectivity error. No retries: one failed call aborts the caller's step.
pub struct ZapClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ZapClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn api_request(
        &self,
        component: &str,
        kind: &str,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, ZapdashError> {
        let url = format!("{}/JSON/{}/{}/{}", self.base_url, component, kind, name);
        let mut query: Vec<(&str, &str)> = vec![("apikey", self.api_key.as_str())];
        query.extend_from_slice(params);

        debug!(component, name, "Engine API request");

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                ZapdashError::Engine(format!(
                    "Failed to connect to scan engine. Is ZAP running in daemon mode? ({})",
                    e
                ))
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ZapdashError::Engine(format!(
                "Scan engine returned HTTP {} for {}/{}",
                status, component, name
            )));
        }

        resp.json()
            .await
            .map_err(|e| ZapdashError::Engine(format!("Failed to parse engine response: {}", e)))
    }

    /// Pulls the job id out of a scan-start response (`{"scan": "0"}`).
    fn job_id(data: &Value, operation: &str) -> Result<String, ZapdashError> {
        match data.get("scan") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(ZapdashError::Engine(format!(
                "No job id in {} response",
                operation
            ))),
        }
    }

    /// Pulls the 0-100 progress out of a status response (`{"status": "45"}`).
    fn job_progress(data: &Value, operation: &str) -> Result<u32, ZapdashError> {
        let raw = data.get("status").ok_or_else(|| {
            ZapdashError::Engine(format!("No status in {} response", operation))
        })?;
        match raw {
            Value::String(s) => s.parse().map_err(|_| {
                ZapdashError::Engine(format!(
                    "Non-numeric status {:?} in {} response",
                    s, operation
                ))
            }),
            Value::Number(n) => n.as_u64().map(|p| p as u32).ok_or_else(|| {
                ZapdashError::Engine(format!(
                    "Non-numeric status {} in {} response",
                    n, operation
                ))
            }),
            _ => Err(ZapdashError::Engine(format!(
                "Malformed status in {} response",
                operation
            ))),
        }
    }
}

#[async_trait]
impl ScanEngine for ZapClient {
    async fn access_url(&self, url: &str) -> Result<(), ZapdashError> {
        self.api_request("core", "action", "accessUrl", &[("url", url)])
            .await?;
        Ok(())
    }

    async fn start_spider(&self, url: &str) -> Result<String, ZapdashError> {
        let data = self
            .api_request("spider", "action", "scan", &[("url", url)])
            .await?;
        Self::job_id(&data, "spider scan")
    }

    async fn spider_status(&self, job_id: &str) -> Result<u32, ZapdashError> {
        let data = self
            .api_request("spider", "view", "status", &[("scanId", job_id)])
            .await?;
        Self::job_progress(&data, "spider status")
    }

    async fn start_active_scan(&self, url: &str) -> Result<String, ZapdashError> {
        let data = self
            .api_request(
                "ascan",
                "action",
                "scan",
                &[("url", url), ("recurse", "true")],
            )
            .await?;
        Self::job_id(&data, "active scan")
    }

    async fn active_scan_status(&self, job_id: &str) -> Result<u32, ZapdashError> {
        let data = self
            .api_request("ascan", "view", "status", &[("scanId", job_id)])
            .await?;
        Self::job_progress(&data, "active scan status")
    }

    async fn alerts(&self, base_url: &str) -> Result<Vec<Alert>, ZapdashError> {
        let data = self
            .api_request("core", "view", "alerts", &[("baseurl", base_url)])
            .await?;
        let alerts = data
            .get("alerts")
            .cloned()
            .ok_or_else(|| ZapdashError::Engine("No alerts in engine response".to_string()))?;
        serde_json::from_value(alerts)
            .map_err(|e| ZapdashError::Engine(format!("Malformed alerts response: {}", e)))
    }
}
