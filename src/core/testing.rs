// src/core/testing.rs

// Scripted in-memory backend shared by the unit tests of the poller, fetcher and session.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};

use crate::core::client::ScanApi;
use crate::core::errors::ApiError;
use crate::core::models::{
    CloudDomain, CloudProvider, DnsRecord, RawResult, RecordType, ScanParams, ScanRecord, ScanStatus,
    ScopeTarget, Tool,
};

pub(crate) fn scan(id: &str, status: ScanStatus) -> ScanRecord {
    ScanRecord {
        scan_id: id.to_string(),
        scope_target_id: Some("target-1".to_string()),
        status,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        execution_time: None,
        error: None,
    }
}

pub(crate) fn dns(domain: &str, record_type: RecordType, record: &str) -> DnsRecord {
    DnsRecord {
        domain: domain.to_string(),
        record_type,
        record: record.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    }
}

fn backend_error(path: &str) -> ApiError {
    ApiError::Status {
        status: 500,
        url: format!("http://fake/{path}"),
    }
}

/// Answers status requests from a script; the last status repeats forever.
pub(crate) struct FakeApi {
    script: Vec<ScanStatus>,
    served: AtomicUsize,
    status_calls: AtomicU32,
    failures_left: AtomicU32,
    latency: Option<Duration>,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,

    pub history: Mutex<Result<Vec<ScanRecord>, u16>>,
    pub scope_target: Mutex<Result<ScopeTarget, u16>>,
    pub dns: Mutex<Result<Vec<DnsRecord>, u16>>,
    pub cloud: Mutex<Result<Vec<CloudDomain>, u16>>,
    pub raw: Mutex<Result<Vec<RawResult>, u16>>,

    pub created: Mutex<Vec<(String, ScanParams)>>,
    pub listed_targets: Mutex<Vec<String>>,
    pub history_calls: AtomicU32,
    pub dns_calls: AtomicU32,
    pub cloud_calls: AtomicU32,
    pub raw_calls: AtomicU32,
}

impl FakeApi {
    pub fn with_statuses(script: &[ScanStatus]) -> Self {
        Self {
            script: script.to_vec(),
            served: AtomicUsize::new(0),
            status_calls: AtomicU32::new(0),
            failures_left: AtomicU32::new(0),
            latency: None,
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
            history: Mutex::new(Ok(Vec::new())),
            scope_target: Mutex::new(Ok(ScopeTarget {
                id: Some("target-1".to_string()),
                scope_target: "*.example.com".to_string(),
                target_type: "Wildcard".to_string(),
                mode: Some("Passive".to_string()),
            })),
            dns: Mutex::new(Ok(vec![
                dns("api.example.com", RecordType::A, "10.0.0.1"),
                dns("www.example.com", RecordType::Cname, "edge.example.net"),
                dns("mail.example.com", RecordType::Mx, "10 mx.example.com"),
            ])),
            cloud: Mutex::new(Ok(vec![CloudDomain {
                domain: "assets.s3.amazonaws.com".to_string(),
                provider: CloudProvider::Aws,
                created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            }])),
            raw: Mutex::new(Ok(vec![RawResult {
                domain: "example.com".to_string(),
                raw_output: "api.example.com [A] [10.0.0.1]".to_string(),
                created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            }])),
            created: Mutex::new(Vec::new()),
            listed_targets: Mutex::new(Vec::new()),
            history_calls: AtomicU32::new(0),
            dns_calls: AtomicU32::new(0),
            cloud_calls: AtomicU32::new(0),
            raw_calls: AtomicU32::new(0),
        }
    }

    pub fn with_status_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn fail_next_status_requests(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_status_calls(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> u32 {
        self.dns_calls.load(Ordering::SeqCst)
            + self.cloud_calls.load(Ordering::SeqCst)
            + self.raw_calls.load(Ordering::SeqCst)
    }
}

impl ScanApi for FakeApi {
    async fn create_scan(
        &self,
        _tool: &Tool,
        scope_target_id: &str,
        params: &ScanParams,
    ) -> Result<String, ApiError> {
        self.created
            .lock()
            .unwrap()
            .push((scope_target_id.to_string(), params.clone()));
        Ok("scan-new".to_string())
    }

    async fn get_status(&self, _tool: &Tool, scan_id: &str) -> Result<ScanRecord, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(backend_error("status"));
        }

        let idx = self.served.fetch_add(1, Ordering::SeqCst);
        let status = self.script[idx.min(self.script.len() - 1)];
        Ok(scan(scan_id, status))
    }

    async fn list_scans(&self, scope_target_id: &str, _tool: &Tool) -> Result<Vec<ScanRecord>, ApiError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.listed_targets.lock().unwrap().push(scope_target_id.to_string());
        self.history.lock().unwrap().clone().map_err(|_| backend_error("scans"))
    }

    async fn get_scope_target(&self, _scope_target_id: &str) -> Result<ScopeTarget, ApiError> {
        self.scope_target.lock().unwrap().clone().map_err(|_| backend_error("scopetarget"))
    }

    async fn dns_records(&self, _tool: &Tool, _scan_id: &str) -> Result<Vec<DnsRecord>, ApiError> {
        self.dns_calls.fetch_add(1, Ordering::SeqCst);
        self.dns.lock().unwrap().clone().map_err(|_| backend_error("dns-records"))
    }

    async fn cloud_domains(&self, _tool: &Tool, _scan_id: &str) -> Result<Vec<CloudDomain>, ApiError> {
        self.cloud_calls.fetch_add(1, Ordering::SeqCst);
        self.cloud.lock().unwrap().clone().map_err(|_| backend_error("cloud-domains"))
    }

    async fn raw_results(&self, _tool: &Tool, _scan_id: &str) -> Result<Vec<RawResult>, ApiError> {
        self.raw_calls.fetch_add(1, Ordering::SeqCst);
        self.raw.lock().unwrap().clone().map_err(|_| backend_error("raw-results"))
    }
}
