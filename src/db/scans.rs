use super::Database;
use crate::errors::ZapdashError;
use crate::models::{ScanStatus, Vulnerability};
use chrono::Utc;
use serde_json::Value;

type ScanRow = (String, String, String, f64, String, Option<String>, String);

fn read_row(row: &rusqlite::Row) -> rusqlite::Result<ScanRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn row_to_json(row: ScanRow) -> Result<Value, ZapdashError> {
    let (scan_id, url, status, progress, vulns_text, error, timestamp) = row;
    let vulnerabilities: Value = serde_json::from_str(&vulns_text)?;
    let mut record = serde_json::json!({
        "scan_id": scan_id,
        "url": url,
        "status": status,
        "progress": progress,
        "vulnerabilities": vulnerabilities,
        "timestamp": timestamp,
    });
    // The error field only exists on failed scans
    if let Some(error) = error {
        record["error"] = Value::String(error);
    }
    Ok(record)
}

impl Database {
    pub fn create_scan(&self, scan_id: &str, url: &str) -> Result<(), ZapdashError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO scans (scan_id, url, status, progress, vulnerabilities, timestamp) VALUES (?1, ?2, 'Starting', 0, '[]', ?3)",
            rusqlite::params![scan_id, url, Utc::now().to_rfc3339()],
        ).map_err(|e| ZapdashError::Database(format!("Failed to create scan: {}", e)))?;
        Ok(())
    }

    /// Writes a phase transition. Progress never regresses: the stored value
    /// is the maximum of the current and the incoming percentage.
    pub fn update_progress(
        &self,
        scan_id: &str,
        status: ScanStatus,
        progress: f64,
    ) -> Result<(), ZapdashError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE scans SET status = ?2, progress = MAX(progress, ?3) WHERE scan_id = ?1",
            rusqlite::params![scan_id, status.as_str(), progress],
        )
        .map_err(|e| ZapdashError::Database(format!("Update failed: {}", e)))?;
        Ok(())
    }

    /// Terminal success: status Completed, progress 100, findings stored.
    pub fn complete_scan(
        &self,
        scan_id: &str,
        vulnerabilities: &[Vulnerability],
    ) -> Result<(), ZapdashError> {
        let vulns_text = serde_json::to_string(vulnerabilities)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE scans SET status = 'Completed', progress = 100, vulnerabilities = ?2 WHERE scan_id = ?1",
            rusqlite::params![scan_id, vulns_text],
        ).map_err(|e| ZapdashError::Database(format!("Update failed: {}", e)))?;
        Ok(())
    }

    /// Terminal failure: status Failed, progress 100, error text captured.
    /// Whatever was written before the failure stays as-is.
    pub fn fail_scan(&self, scan_id: &str, error: &str) -> Result<(), ZapdashError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE scans SET status = 'Failed', progress = 100, error_message = ?2 WHERE scan_id = ?1",
            rusqlite::params![scan_id, error],
        )
        .map_err(|e| ZapdashError::Database(format!("Update failed: {}", e)))?;
        Ok(())
    }

    pub fn get_scan(&self, scan_id: &str) -> Result<Option<Value>, ZapdashError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT scan_id, url, status, progress, vulnerabilities, error_message, timestamp FROM scans WHERE scan_id = ?1"
        ).map_err(|e| ZapdashError::Database(format!("Query failed: {}", e)))?;

        match stmt.query_row(rusqlite::params![scan_id], read_row) {
            Ok(row) => Ok(Some(row_to_json(row)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ZapdashError::Database(format!("Query error: {}", e))),
        }
    }

    pub fn list_scans(&self) -> Result<Vec<Value>, ZapdashError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT scan_id, url, status, progress, vulnerabilities, error_message, timestamp FROM scans ORDER BY timestamp DESC"
        ).map_err(|e| ZapdashError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt
            .query_map([], read_row)
            .map_err(|e| ZapdashError::Database(format!("Query error: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let row = row.map_err(|e| ZapdashError::Database(format!("Row error: {}", e)))?;
            results.push(row_to_json(row)?);
        }
        Ok(results)
    }
}
