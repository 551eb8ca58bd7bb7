// src/core/fetcher.rs

use std::sync::Arc;

use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{error, info};

use crate::core::client::ScanApi;
use crate::core::errors::ApiError;
use crate::core::models::{CloudDomain, DnsRecord, RawResult, Tool};

/// The result collections a finished scan can expose.
/// The string form is the endpoint suffix (`/{tool}/{scan_id}/dns-records`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CollectionKind {
    DnsRecords,
    CloudDomains,
    RawResults,
}

impl CollectionKind {
    pub fn all() -> Vec<CollectionKind> {
        CollectionKind::iter().collect()
    }

    pub fn title(self) -> &'static str {
        match self {
            CollectionKind::DnsRecords => "DNS Records",
            CollectionKind::CloudDomains => "Cloud Domains",
            CollectionKind::RawResults => "Raw Results",
        }
    }
}

/// Result of fetching one collection.
///
/// A failed fetch is kept apart from an empty one so the caller can tell
/// "the scan found nothing" from "the rows could not be loaded". `rows()` hides the
/// difference for callers that only want something to render.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Ok(Vec<T>),
    Failed(String),
}

impl<T> FetchOutcome<T> {
    pub fn rows(&self) -> &[T] {
        match self {
            FetchOutcome::Ok(rows) => rows,
            FetchOutcome::Failed(_) => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            FetchOutcome::Failed(cause) => Some(cause),
            FetchOutcome::Ok(_) => None,
        }
    }

    pub fn into_rows(self) -> Vec<T> {
        match self {
            FetchOutcome::Ok(rows) => rows,
            FetchOutcome::Failed(_) => Vec::new(),
        }
    }
}

impl<T> From<Result<Vec<T>, ApiError>> for FetchOutcome<T> {
    fn from(result: Result<Vec<T>, ApiError>) -> Self {
        match result {
            Ok(rows) => FetchOutcome::Ok(rows),
            Err(e) => FetchOutcome::Failed(e.to_string()),
        }
    }
}

/// Every collection fetched for one scan. Kinds that were not requested stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub scan_id: String,
    pub dns_records: Option<FetchOutcome<DnsRecord>>,
    pub cloud_domains: Option<FetchOutcome<CloudDomain>>,
    pub raw_results: Option<FetchOutcome<RawResult>>,
}

impl ResultSet {
    pub fn len_of(&self, kind: CollectionKind) -> usize {
        match kind {
            CollectionKind::DnsRecords => self.dns_records.as_ref().map_or(0, |o| o.rows().len()),
            CollectionKind::CloudDomains => self.cloud_domains.as_ref().map_or(0, |o| o.rows().len()),
            CollectionKind::RawResults => self.raw_results.as_ref().map_or(0, |o| o.rows().len()),
        }
    }

    pub fn failure_of(&self, kind: CollectionKind) -> Option<&str> {
        match kind {
            CollectionKind::DnsRecords => self.dns_records.as_ref().and_then(FetchOutcome::failure),
            CollectionKind::CloudDomains => self.cloud_domains.as_ref().and_then(FetchOutcome::failure),
            CollectionKind::RawResults => self.raw_results.as_ref().and_then(FetchOutcome::failure),
        }
    }

    pub fn failed_kinds(&self) -> Vec<CollectionKind> {
        CollectionKind::iter()
            .filter(|kind| self.failure_of(*kind).is_some())
            .collect()
    }
}

/// Fetches result collections of finished scans.
///
/// Each collection is an independent request. A failure is logged and recorded for that
/// collection only; the others are unaffected. Nothing is cached, so repeated calls
/// always return what the backend currently holds.
pub struct ResultFetcher<A> {
    api: Arc<A>,
    tool: Tool,
}

impl<A: ScanApi> ResultFetcher<A> {
    pub fn new(api: Arc<A>, tool: Tool) -> Self {
        Self { api, tool }
    }

    pub async fn dns_records(&self, scan_id: &str) -> FetchOutcome<DnsRecord> {
        let result = self.api.dns_records(&self.tool, scan_id).await;
        settle(CollectionKind::DnsRecords, scan_id, result)
    }

    pub async fn cloud_domains(&self, scan_id: &str) -> FetchOutcome<CloudDomain> {
        let result = self.api.cloud_domains(&self.tool, scan_id).await;
        settle(CollectionKind::CloudDomains, scan_id, result)
    }

    pub async fn raw_results(&self, scan_id: &str) -> FetchOutcome<RawResult> {
        let result = self.api.raw_results(&self.tool, scan_id).await;
        settle(CollectionKind::RawResults, scan_id, result)
    }

    /// Fetches the requested kinds concurrently, one request per distinct kind.
    pub async fn fetch_all(&self, scan_id: &str, kinds: &[CollectionKind]) -> ResultSet {
        let wants = |kind| kinds.contains(&kind);

        let (dns_records, cloud_domains, raw_results) = tokio::join!(
            async {
                if wants(CollectionKind::DnsRecords) { Some(self.dns_records(scan_id).await) } else { None }
            },
            async {
                if wants(CollectionKind::CloudDomains) { Some(self.cloud_domains(scan_id).await) } else { None }
            },
            async {
                if wants(CollectionKind::RawResults) { Some(self.raw_results(scan_id).await) } else { None }
            },
        );

        ResultSet {
            scan_id: scan_id.to_string(),
            dns_records,
            cloud_domains,
            raw_results,
        }
    }
}

fn settle<T>(kind: CollectionKind, scan_id: &str, result: Result<Vec<T>, ApiError>) -> FetchOutcome<T> {
    match &result {
        Ok(rows) => info!(%kind, scan_id, rows = rows.len(), "Collection fetched."),
        Err(e) => error!(%kind, scan_id, error = %e, "Failed to fetch collection."),
    }
    result.into()
}
