// src/core/client.rs

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::core::errors::ApiError;
use crate::core::models::{
    CloudDomain, CreatedScan, DnsRecord, RawResult, ScanParams, ScanRecord, ScopeTarget, Tool,
};

/// The backend operations the poller, fetcher and session depend on.
///
/// `HttpScanApi` is the production implementation; tests substitute scripted fakes.
/// Every method is a single request with no retry of its own.
pub trait ScanApi: Send + Sync + 'static {
    /// `POST /{tool}/run/{scope_target_id}`. Returns the new scan id.
    fn create_scan(
        &self,
        tool: &Tool,
        scope_target_id: &str,
        params: &ScanParams,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;

    /// `GET /{tool}/status/{scan_id}`.
    fn get_status(
        &self,
        tool: &Tool,
        scan_id: &str,
    ) -> impl Future<Output = Result<ScanRecord, ApiError>> + Send;

    /// `GET /scopetarget/{scope_target_id}/scans/{tool}`: every scan of that pair.
    fn list_scans(
        &self,
        scope_target_id: &str,
        tool: &Tool,
    ) -> impl Future<Output = Result<Vec<ScanRecord>, ApiError>> + Send;

    /// `GET /scopetarget/{scope_target_id}`.
    fn get_scope_target(
        &self,
        scope_target_id: &str,
    ) -> impl Future<Output = Result<ScopeTarget, ApiError>> + Send;

    fn dns_records(
        &self,
        tool: &Tool,
        scan_id: &str,
    ) -> impl Future<Output = Result<Vec<DnsRecord>, ApiError>> + Send;

    fn cloud_domains(
        &self,
        tool: &Tool,
        scan_id: &str,
    ) -> impl Future<Output = Result<Vec<CloudDomain>, ApiError>> + Send;

    fn raw_results(
        &self,
        tool: &Tool,
        scan_id: &str,
    ) -> impl Future<Output = Result<Vec<RawResult>, ApiError>> + Send;
}

/// JSON-over-HTTP client for the reconnaissance backend.
#[derive(Debug, Clone)]
pub struct HttpScanApi {
    client: Client,
    base: Url,
}

impl HttpScanApi {
    /// Builds a client rooted at `base` (e.g. `http://127.0.0.1:8443/`).
    ///
    /// Without a `timeout` requests wait as long as reqwest's default allows, which
    /// keeps very slow status endpoints from being treated as failures.
    pub fn new(base: Url, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder().user_agent(concat!("scanwatch/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    // Appends path segments one by one so ids containing '/' or '?' stay inside
    // their own segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!(%url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        decode(url, response).await
    }
}

async fn decode<T: DeserializeOwned>(url: Url, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        warn!(%url, status = status.as_u16(), "Backend returned a non-success status.");
        return Err(ApiError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

impl ScanApi for HttpScanApi {
    async fn create_scan(
        &self,
        tool: &Tool,
        scope_target_id: &str,
        params: &ScanParams,
    ) -> Result<String, ApiError> {
        let url = self.endpoint(&[tool.as_str(), "run", scope_target_id])?;
        debug!(%url, "POST");
        let response = self.client.post(url.clone()).json(params).send().await?;
        let created: CreatedScan = decode(url, response).await?;
        Ok(created.scan_id)
    }

    async fn get_status(&self, tool: &Tool, scan_id: &str) -> Result<ScanRecord, ApiError> {
        let url = self.endpoint(&[tool.as_str(), "status", scan_id])?;
        self.get_json(url).await
    }

    async fn list_scans(&self, scope_target_id: &str, tool: &Tool) -> Result<Vec<ScanRecord>, ApiError> {
        let url = self.endpoint(&["scopetarget", scope_target_id, "scans", tool.as_str()])?;
        self.get_json(url).await
    }

    async fn get_scope_target(&self, scope_target_id: &str) -> Result<ScopeTarget, ApiError> {
        let url = self.endpoint(&["scopetarget", scope_target_id])?;
        self.get_json(url).await
    }

    async fn dns_records(&self, tool: &Tool, scan_id: &str) -> Result<Vec<DnsRecord>, ApiError> {
        let url = self.endpoint(&[tool.as_str(), scan_id, "dns-records"])?;
        self.get_json(url).await
    }

    async fn cloud_domains(&self, tool: &Tool, scan_id: &str) -> Result<Vec<CloudDomain>, ApiError> {
        let url = self.endpoint(&[tool.as_str(), scan_id, "cloud-domains"])?;
        self.get_json(url).await
    }

    async fn raw_results(&self, tool: &Tool, scan_id: &str) -> Result<Vec<RawResult>, ApiError> {
        let url = self.endpoint(&[tool.as_str(), scan_id, "raw-results"])?;
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpScanApi {
        HttpScanApi::new(Url::parse(base).unwrap(), None).unwrap()
    }

    #[test]
    fn endpoints_are_joined_onto_the_base_path() {
        let tool = Tool::new("dnsx").unwrap();
        let local = api("http://127.0.0.1:8443/");
        let url = local.endpoint(&[tool.as_str(), "status", "abc-123"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8443/dnsx/status/abc-123");

        let proxied = api("https://recon.local/api/");
        let url = proxied.endpoint(&["scopetarget", "t1", "scans", "amass"]).unwrap();
        assert_eq!(url.as_str(), "https://recon.local/api/scopetarget/t1/scans/amass");
    }

    #[test]
    fn ids_cannot_escape_their_segment() {
        let url = api("http://127.0.0.1:8443/")
            .endpoint(&["dnsx", "status", "../admin?x=1"])
            .unwrap();
        assert_eq!(url.path(), "/dnsx/status/..%2Fadmin%3Fx=1");
    }
}
