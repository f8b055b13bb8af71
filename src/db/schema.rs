pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS scans (
    scan_id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Starting',
    progress REAL NOT NULL DEFAULT 0,
    vulnerabilities TEXT NOT NULL DEFAULT '[]',
    error_message TEXT,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scans_timestamp ON scans(timestamp);
CREATE INDEX IF NOT EXISTS idx_scans_status ON scans(status);
";
