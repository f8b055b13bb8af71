use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use crate::db::Database;
use crate::engine::ScanEngine;
use crate::errors::ZapdashError;
use crate::models::{ScanStatus, Vulnerability};

/// Discovery jobs report quickly, so they are polled on a tighter interval
/// than active probing.
pub const SPIDER_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const ASCAN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Drives one scan through the engine's two phases, writing every state
/// transition to the record store as it happens. A reader can observe any
/// phase at any time; there is no in-memory-only intermediate state.
pub struct ScanRunner {
    engine: Arc<dyn ScanEngine>,
    db: Database,
    spider_poll_interval: Duration,
    ascan_poll_interval: Duration,
}

impl ScanRunner {
    pub fn new(engine: Arc<dyn ScanEngine>, db: Database) -> Self {
        Self {
            engine,
            db,
            spider_poll_interval: SPIDER_POLL_INTERVAL,
            ascan_poll_interval: ASCAN_POLL_INTERVAL,
        }
    }

    /// Overrides the per-phase poll intervals. The two phases keep distinct
    /// intervals; tests shrink them to milliseconds.
    pub fn with_poll_intervals(mut self, spider: Duration, ascan: Duration) -> Self {
        self.spider_poll_interval = spider;
        self.ascan_poll_interval = ascan;
        self
    }

    /// Runs the scan to successful completion. Any error aborts the current
    /// step and is turned into a terminal Failed write by [`spawn_scan`].
    pub async fn run(&self, scan_id: &str, target_url: &str) -> Result<(), ZapdashError> {
        info!(scan_id = %scan_id, target = %target_url, "Scan started");

        self.engine.access_url(target_url).await?;

        // Phase 1: discovery, mapped onto the first half of overall progress
        let spider_id = self.engine.start_spider(target_url).await?;
        info!(scan_id = %scan_id, job_id = %spider_id, "Spider scan started");

        loop {
            let reported = self.engine.spider_status(&spider_id).await?;
            self.db
                .update_progress(scan_id, ScanStatus::Spidering, f64::from(reported) / 2.0)?;
            if reported >= 100 {
                break;
            }
            sleep(self.spider_poll_interval).await;
        }
        info!(scan_id = %scan_id, "Spider scan completed");

        // Phase 2: active probing, mapped onto the second half
        let ascan_id = self.engine.start_active_scan(target_url).await?;
        info!(scan_id = %scan_id, job_id = %ascan_id, "Active scan started");

        loop {
            let reported = self.engine.active_scan_status(&ascan_id).await?;
            self.db.update_progress(
                scan_id,
                ScanStatus::Scanning,
                50.0 + f64::from(reported) / 2.0,
            )?;
            if reported >= 100 {
                break;
            }
            sleep(self.ascan_poll_interval).await;
        }
        info!(scan_id = %scan_id, "Active scan completed");

        let alerts = self.engine.alerts(target_url).await?;
        let vulnerabilities: Vec<Vulnerability> = alerts
            .into_iter()
            .map(|a| Vulnerability {
                name: a.alert,
                risk: Vulnerability::risk_from_riskdesc(&a.riskdesc),
                url: a.url,
                description: a.description,
            })
            .collect();

        self.db.complete_scan(scan_id, &vulnerabilities)?;
        info!(scan_id = %scan_id, findings = vulnerabilities.len(), "Scan completed");
        Ok(())
    }
}

/// Detaches a scan as a background task, independent of the HTTP request
/// that triggered it. The inner task does the work; the outer task is a
/// completion guard that turns any error, including a panic, into a terminal
/// Failed write so no record is left stuck mid-progress.
pub fn spawn_scan(
    runner: ScanRunner,
    scan_id: String,
    target_url: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let db = runner.db.clone();
        let id = scan_id.clone();
        let worker = tokio::spawn(async move { runner.run(&scan_id, &target_url).await });

        let message = match worker.await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("Scan task panicked: {}", e),
        };

        error!(scan_id = %id, error = %message, "Scan failed");
        if let Err(e) = db.fail_scan(&id, &message) {
            error!(scan_id = %id, error = %e, "Failed to record scan failure");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Alert;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted engine that snapshots the scan record at the start of every
    /// call, so tests can assert what a concurrent reader would have seen.
    struct MockEngine {
        db: Database,
        scan_id: String,
        spider_seq: Mutex<VecDeque<u32>>,
        ascan_seq: Mutex<VecDeque<u32>>,
        alerts: Vec<Alert>,
        fail_ascan_status: bool,
        panic_on_spider: bool,
        snapshots: Mutex<Vec<(String, String, f64)>>,
    }

    impl MockEngine {
        fn new(db: Database, scan_id: &str) -> Self {
            Self {
                db,
                scan_id: scan_id.to_string(),
                spider_seq: Mutex::new(VecDeque::from([100])),
                ascan_seq: Mutex::new(VecDeque::from([100])),
                alerts: Vec::new(),
                fail_ascan_status: false,
                panic_on_spider: false,
                snapshots: Mutex::new(Vec::new()),
            }
        }

        fn snap(&self, call: &str) {
            let record = self
                .db
                .get_scan(&self.scan_id)
                .unwrap()
                .expect("record exists");
            self.snapshots.lock().unwrap().push((
                call.to_string(),
                record["status"].as_str().unwrap().to_string(),
                record["progress"].as_f64().unwrap(),
            ));
        }

        fn next(seq: &Mutex<VecDeque<u32>>) -> u32 {
            seq.lock().unwrap().pop_front().unwrap_or(100)
        }
    }

    #[async_trait]
    impl ScanEngine for MockEngine {
        async fn access_url(&self, _url: &str) -> Result<(), ZapdashError> {
            self.snap("access_url");
            Ok(())
        }

        async fn start_spider(&self, _url: &str) -> Result<String, ZapdashError> {
            if self.panic_on_spider {
                panic!("spider exploded");
            }
            self.snap("start_spider");
            Ok("1".to_string())
        }

        async fn spider_status(&self, _job_id: &str) -> Result<u32, ZapdashError> {
            self.snap("spider_status");
            Ok(Self::next(&self.spider_seq))
        }

        async fn start_active_scan(&self, _url: &str) -> Result<String, ZapdashError> {
            self.snap("start_active_scan");
            Ok("2".to_string())
        }

        async fn active_scan_status(&self, _job_id: &str) -> Result<u32, ZapdashError> {
            self.snap("active_scan_status");
            if self.fail_ascan_status {
                return Err(ZapdashError::Engine(
                    "Failed to connect to scan engine".to_string(),
                ));
            }
            Ok(Self::next(&self.ascan_seq))
        }

        async fn alerts(&self, _base_url: &str) -> Result<Vec<Alert>, ZapdashError> {
            self.snap("alerts");
            Ok(self.alerts.clone())
        }
    }

    fn fast_runner(engine: Arc<dyn ScanEngine>, db: Database) -> ScanRunner {
        ScanRunner::new(engine, db)
            .with_poll_intervals(Duration::from_millis(1), Duration::from_millis(1))
    }

    fn snapshots_for<'a>(
        snapshots: &'a [(String, String, f64)],
        call: &str,
    ) -> Vec<&'a (String, String, f64)> {
        snapshots.iter().filter(|(c, _, _)| c == call).collect()
    }

    #[tokio::test]
    async fn test_happy_path_progress_mapping() {
        let db = Database::in_memory().unwrap();
        db.create_scan("scan-1", "http://target").unwrap();

        let mut mock = MockEngine::new(db.clone(), "scan-1");
        mock.spider_seq = Mutex::new(VecDeque::from([40, 100]));
        mock.ascan_seq = Mutex::new(VecDeque::from([30, 100]));
        mock.alerts = vec![Alert {
            alert: "SQL Injection".to_string(),
            riskdesc: "High (Medium)".to_string(),
            url: "http://target/login".to_string(),
            description: "Parameter id is injectable".to_string(),
        }];
        let mock = Arc::new(mock);

        fast_runner(mock.clone(), db.clone())
            .run("scan-1", "http://target")
            .await
            .unwrap();

        let snapshots = mock.snapshots.lock().unwrap();

        // Spider phase: reported 40 was visible as 20% / Spidering on the
        // second status poll.
        let spider = snapshots_for(&snapshots, "spider_status");
        assert_eq!(spider[0].1, "Starting");
        assert_eq!(spider[0].2, 0.0);
        assert_eq!(spider[1].1, "Spidering");
        assert_eq!(spider[1].2, 20.0);

        // Spider completion pinned overall progress at the halfway mark.
        let ascan_start = snapshots_for(&snapshots, "start_active_scan");
        assert_eq!(ascan_start[0].1, "Spidering");
        assert_eq!(ascan_start[0].2, 50.0);

        // Active phase: reported 30 mapped to 65%.
        let ascan = snapshots_for(&snapshots, "active_scan_status");
        assert_eq!(ascan[1].1, "Scanning");
        assert_eq!(ascan[1].2, 65.0);

        // Alerts were fetched with the active phase fully written.
        let alerts = snapshots_for(&snapshots, "alerts");
        assert_eq!(alerts[0].1, "Scanning");
        assert_eq!(alerts[0].2, 100.0);

        let record = db.get_scan("scan-1").unwrap().unwrap();
        assert_eq!(record["status"], "Completed");
        assert_eq!(record["progress"], 100.0);
        assert_eq!(record["vulnerabilities"][0]["name"], "SQL Injection");
        assert_eq!(record["vulnerabilities"][0]["risk"], "High");
        assert!(record["error"].is_null());
    }

    #[tokio::test]
    async fn test_alert_normalization() {
        let db = Database::in_memory().unwrap();
        db.create_scan("scan-2", "http://target").unwrap();

        let mut mock = MockEngine::new(db.clone(), "scan-2");
        mock.alerts = vec![
            Alert {
                alert: "X-Content-Type-Options Header Missing".to_string(),
                riskdesc: "Low (Medium)".to_string(),
                url: "http://target/".to_string(),
                description: "Missing anti-MIME-sniffing header".to_string(),
            },
            Alert {
                alert: "Server Leaks Version Information".to_string(),
                riskdesc: "Informational".to_string(),
                url: "http://target/about".to_string(),
                description: "Server header discloses version".to_string(),
            },
        ];
        let mock = Arc::new(mock);

        fast_runner(mock, db.clone())
            .run("scan-2", "http://target")
            .await
            .unwrap();

        let record = db.get_scan("scan-2").unwrap().unwrap();
        let vulns = record["vulnerabilities"].as_array().unwrap();
        assert_eq!(vulns.len(), 2);
        assert_eq!(vulns[0]["risk"], "Low");
        assert_eq!(vulns[1]["risk"], "Informational");
    }

    #[tokio::test]
    async fn test_engine_failure_mid_scan() {
        let db = Database::in_memory().unwrap();
        db.create_scan("scan-3", "http://target").unwrap();

        let mut mock = MockEngine::new(db.clone(), "scan-3");
        mock.fail_ascan_status = true;
        let mock = Arc::new(mock);

        let runner = fast_runner(mock, db.clone());
        spawn_scan(runner, "scan-3".to_string(), "http://target".to_string())
            .await
            .unwrap();

        let record = db.get_scan("scan-3").unwrap().unwrap();
        assert_eq!(record["status"], "Failed");
        assert_eq!(record["progress"], 100.0);
        let error = record["error"].as_str().unwrap();
        assert!(error.contains("scan engine"));
        // No findings were written before the failure.
        assert!(record["vulnerabilities"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panic_still_reaches_failed_state() {
        let db = Database::in_memory().unwrap();
        db.create_scan("scan-4", "http://target").unwrap();

        let mut mock = MockEngine::new(db.clone(), "scan-4");
        mock.panic_on_spider = true;
        let mock = Arc::new(mock);

        let runner = fast_runner(mock, db.clone());
        spawn_scan(runner, "scan-4".to_string(), "http://target".to_string())
            .await
            .unwrap();

        let record = db.get_scan("scan-4").unwrap().unwrap();
        assert_eq!(record["status"], "Failed");
        assert_eq!(record["progress"], 100.0);
        assert!(record["error"].as_str().unwrap().contains("panicked"));
    }
}
