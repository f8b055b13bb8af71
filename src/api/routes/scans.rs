use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::api::models::{ScanRequest, ScanResponse};
use crate::api::AppState;
use crate::scanner::{spawn_scan, ScanRunner};

type ApiError = (StatusCode, Json<Value>);

fn store_unavailable() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Database connection failed."})),
    )
}

fn internal_error(e: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
}

pub async fn start_scan(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let Some(db) = state.db.clone() else {
        return Err(store_unavailable());
    };

    let Some(target_url) = req.url.filter(|u| !u.is_empty()) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "URL not provided."})),
        ));
    };

    let scan_id = uuid::Uuid::new_v4().to_string();
    db.create_scan(&scan_id, &target_url)
        .map_err(internal_error)?;

    // Fire and forget: the response goes out before the scan makes progress
    let runner = ScanRunner::new(state.engine.clone(), db);
    spawn_scan(runner, scan_id.clone(), target_url);

    Ok(Json(ScanResponse {
        message: "Scan initiated.".to_string(),
        scan_id,
    }))
}

pub async fn get_scan_results(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let Some(db) = state.db.as_ref() else {
        return Err(store_unavailable());
    };

    match db.get_scan(&scan_id) {
        Ok(Some(scan)) => Ok(Json(scan)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Scan not found."})),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn get_historical_scans(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let Some(db) = state.db.as_ref() else {
        return Err(store_unavailable());
    };

    let scans = db.list_scans().map_err(internal_error)?;
    Ok(Json(Value::Array(scans)))
}
