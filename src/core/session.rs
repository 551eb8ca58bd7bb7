// src/core/session.rs

//! End-to-end watch of one scan: obtain a scan id, poll it to a terminal state,
//! refresh the target's scan history and fetch the result collections.
//!
//! Progress is reported as `WatchEvent`s on an unbounded channel so a UI loop can
//! drain them without ever blocking the session.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::core::client::ScanApi;
use crate::core::errors::SessionError;
use crate::core::fetcher::{CollectionKind, ResultFetcher, ResultSet};
use crate::core::models::{latest_scan, ScanParams, ScanRecord, ScopeTarget, Tool};
use crate::core::poller::{CancelToken, PollObserver, PollOutcome, PollPolicy, PollRetry, StatusPoller};

#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    ScopeTarget(ScopeTarget),
    /// Sent for every status answer, repeated values included.
    Status(ScanRecord),
    PollRetry { attempt: u32, error: String },
    History(Vec<ScanRecord>),
    Results(ResultSet),
    /// Sent once, after `Results` when the scan succeeded.
    Finished(ScanRecord),
    Cancelled,
}

/// Where the scan to watch comes from.
#[derive(Debug, Clone)]
pub enum ScanSource {
    /// A scan id the caller already knows.
    Existing(String),
    /// Start a new scan of the request's scope target.
    Create(ScanParams),
    /// The newest scan of the request's scope target and tool.
    ResumeLatest,
}

#[derive(Debug, Clone)]
pub struct WatchRequest {
    pub tool: Tool,
    pub scope_target_id: Option<String>,
    pub source: ScanSource,
    pub collections: Vec<CollectionKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Finished(ScanRecord),
    Cancelled,
}

pub struct ScanSession<A> {
    api: Arc<A>,
    policy: PollPolicy,
}

// Forwards poll progress into the session's event channel.
struct ChannelObserver {
    events: UnboundedSender<WatchEvent>,
}

impl PollObserver for ChannelObserver {
    fn on_update(&mut self, record: &ScanRecord) {
        let _ = self.events.send(WatchEvent::Status(record.clone()));
    }

    fn on_retry(&mut self, retry: PollRetry<'_>) {
        let _ = self.events.send(WatchEvent::PollRetry {
            attempt: retry.attempt,
            error: retry.error.to_string(),
        });
    }

    fn on_complete(self, record: ScanRecord) {
        // The session emits `Finished` itself once results are in.
        debug!(status = %record.status, "Poll loop completed.");
    }
}

impl<A: ScanApi> ScanSession<A> {
    pub fn new(api: Arc<A>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    pub async fn run(
        &self,
        request: WatchRequest,
        cancel: CancelToken,
        events: UnboundedSender<WatchEvent>,
    ) -> Result<SessionOutcome, SessionError> {
        let tool = request.tool.clone();

        if let Some(target_id) = request.scope_target_id.as_deref() {
            match self.api.get_scope_target(target_id).await {
                Ok(target) => {
                    let _ = events.send(WatchEvent::ScopeTarget(target));
                }
                Err(e) => warn!(scope_target_id = target_id, error = %e, "Could not load scope target."),
            }
        }

        let terminal = match self.resolve(&request, &events).await? {
            Resolved::Poll(scan_id) => {
                let poller = StatusPoller::new(self.api.clone(), tool.clone(), self.policy);
                let observer = ChannelObserver { events: events.clone() };
                let handle = poller.start_polling(&scan_id, cancel.clone(), observer)?;
                match handle.join().await? {
                    PollOutcome::Completed { record, .. } => record,
                    PollOutcome::Cancelled => {
                        let _ = events.send(WatchEvent::Cancelled);
                        return Ok(SessionOutcome::Cancelled);
                    }
                }
            }
            Resolved::AlreadyTerminal(record) => record,
        };

        if terminal.status.unlocks_results() {
            if cancel.is_cancelled() {
                let _ = events.send(WatchEvent::Cancelled);
                return Ok(SessionOutcome::Cancelled);
            }
            self.refresh_history(&request, &terminal, &events).await;
            let results = ResultFetcher::new(self.api.clone(), tool)
                .fetch_all(&terminal.scan_id, &request.collections)
                .await;
            let _ = events.send(WatchEvent::Results(results));
        } else {
            info!(scan_id = %terminal.scan_id, status = %terminal.status, error = ?terminal.error, "Scan ended without results.");
        }

        let _ = events.send(WatchEvent::Finished(terminal.clone()));
        Ok(SessionOutcome::Finished(terminal))
    }

    async fn resolve(
        &self,
        request: &WatchRequest,
        events: &UnboundedSender<WatchEvent>,
    ) -> Result<Resolved, SessionError> {
        match &request.source {
            ScanSource::Existing(scan_id) => Ok(Resolved::Poll(scan_id.clone())),
            ScanSource::Create(params) => {
                let target_id = required_target(request)?;
                let scan_id = self
                    .api
                    .create_scan(&request.tool, target_id, params)
                    .await
                    .map_err(SessionError::Create)?;
                info!(tool = %request.tool, scope_target_id = target_id, scan_id = %scan_id, "Scan started.");
                Ok(Resolved::Poll(scan_id))
            }
            ScanSource::ResumeLatest => {
                let target_id = required_target(request)?;
                let scans = self
                    .api
                    .list_scans(target_id, &request.tool)
                    .await
                    .map_err(SessionError::History)?;
                let latest = latest_scan(&scans).cloned().ok_or_else(|| SessionError::NoScans {
                    scope_target_id: target_id.to_string(),
                    tool: request.tool.to_string(),
                })?;
                let _ = events.send(WatchEvent::History(scans));

                if latest.status.is_terminal() {
                    info!(scan_id = %latest.scan_id, status = %latest.status, "Latest scan already finished.");
                    let _ = events.send(WatchEvent::Status(latest.clone()));
                    Ok(Resolved::AlreadyTerminal(latest))
                } else {
                    info!(scan_id = %latest.scan_id, "Resuming latest scan.");
                    Ok(Resolved::Poll(latest.scan_id))
                }
            }
        }
    }

    // Other scans of the same target may have finished meanwhile; the whole list is
    // reloaded rather than patched. The record names its owning target when the
    // request did not.
    async fn refresh_history(
        &self,
        request: &WatchRequest,
        terminal: &ScanRecord,
        events: &UnboundedSender<WatchEvent>,
    ) {
        let Some(target_id) = request
            .scope_target_id
            .as_deref()
            .or(terminal.scope_target_id.as_deref())
        else {
            debug!(scan_id = %terminal.scan_id, "No scope target known, history not refreshed.");
            return;
        };
        match self.api.list_scans(target_id, &request.tool).await {
            Ok(scans) => {
                let _ = events.send(WatchEvent::History(scans));
            }
            Err(e) => warn!(scope_target_id = target_id, error = %e, "Could not refresh scan history."),
        }
    }
}

enum Resolved {
    Poll(String),
    AlreadyTerminal(ScanRecord),
}

fn required_target(request: &WatchRequest) -> Result<&str, SessionError> {
    request
        .scope_target_id
        .as_deref()
        .ok_or(SessionError::MissingScopeTarget)
}
