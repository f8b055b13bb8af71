use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct ScanRequest {
    /// Optional so that a missing field is handled as a 400, not a
    /// deserialization rejection.
    pub url: Option<String>,
}

#[derive(Serialize)]
pub struct ScanResponse {
    pub message: String,
    pub scan_id: String,
}
