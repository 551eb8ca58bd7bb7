// src/core/poller.rs

//! Status polling for a single scan.
//!
//! A poll loop asks the backend for the scan's status, reports every answer to the
//! caller, and sleeps before asking again. It stops on a terminal status or when its
//! `CancelToken` fires, and never otherwise: transport failures are retried forever
//! because scans may legitimately run for hours.
//!
//! Requests are strictly sequential. The next one is scheduled only after the previous
//! response has been handled, so a slow backend never sees overlapping requests for
//! the same scan.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::core::client::ScanApi;
use crate::core::errors::{ApiError, PollError};
use crate::core::models::{ScanRecord, Tool};

// --- Cancellation ---

/// A clonable, one-way cancellation signal.
///
/// Every clone observes the same state; once cancelled it stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives inside `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

// --- Policy ---

/// Delays between status requests.
///
/// `interval` follows a successful non-terminal answer, `retry_delay` follows a failed
/// request. There is no attempt limit and no backoff growth. When `jitter` is non-zero
/// a uniformly random extra delay in `[0, jitter]` is added to every wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub retry_delay: Duration,
    pub jitter: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            retry_delay: Duration::from_millis(2000),
            jitter: Duration::ZERO,
        }
    }
}

impl PollPolicy {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn delay_after(&self, request_failed: bool) -> Duration {
        let base = if request_failed { self.retry_delay } else { self.interval };
        if self.jitter.is_zero() {
            return base;
        }
        let max = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let extra = rand::thread_rng().gen_range(0..=max);
        base.saturating_add(Duration::from_millis(extra))
    }
}

// --- Poller ---

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// A terminal record was observed after `polls` successful status requests.
    Completed { record: ScanRecord, polls: u32 },
    Cancelled,
}

/// A failed status request, reported before the retry delay starts.
#[derive(Debug)]
pub struct PollRetry<'a> {
    pub attempt: u32,
    pub error: &'a ApiError,
}

/// Callbacks a poll loop reports to.
///
/// `on_update` fires for every successful answer, including repeats of an unchanged
/// status, so implementations must tolerate identical consecutive updates.
/// `on_complete` fires exactly once, with the terminal record, and never for a
/// cancelled loop. Terminal failures (`error`, `failed`) arrive through the same
/// two callbacks as success.
pub trait PollObserver: Send + 'static {
    fn on_update(&mut self, record: &ScanRecord);

    fn on_retry(&mut self, _retry: PollRetry<'_>) {}

    fn on_complete(self, record: ScanRecord);
}

/// Starts poll loops for scans of one tool.
pub struct StatusPoller<A> {
    api: Arc<A>,
    tool: Tool,
    policy: PollPolicy,
}

impl<A: ScanApi> StatusPoller<A> {
    pub fn new(api: Arc<A>, tool: Tool, policy: PollPolicy) -> Self {
        Self { api, tool, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Spawns a poll loop for `scan_id` on the current tokio runtime.
    ///
    /// The loop checks `cancel` before every request and while sleeping. Dropping the
    /// returned handle cancels it as well.
    pub fn start_polling<O: PollObserver>(
        &self,
        scan_id: &str,
        cancel: CancelToken,
        observer: O,
    ) -> Result<PollHandle, PollError> {
        let scan_id = scan_id.trim();
        if scan_id.is_empty() {
            return Err(PollError::EmptyScanId);
        }

        let span = info_span!("poll", tool = %self.tool, scan_id);
        let task = tokio::spawn(
            poll_loop(
                self.api.clone(),
                self.tool.clone(),
                scan_id.to_string(),
                self.policy,
                cancel.clone(),
                observer,
            )
            .instrument(span),
        );

        Ok(PollHandle {
            task: Some(task),
            cancel,
        })
    }
}

async fn poll_loop<A: ScanApi, O: PollObserver>(
    api: Arc<A>,
    tool: Tool,
    scan_id: String,
    policy: PollPolicy,
    cancel: CancelToken,
    mut observer: O,
) -> PollOutcome {
    info!("Polling started.");
    let mut polls: u32 = 0;
    let mut failures: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            info!(polls, "Polling cancelled.");
            return PollOutcome::Cancelled;
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(polls, "Polling cancelled while a request was in flight.");
                return PollOutcome::Cancelled;
            }
            response = api.get_status(&tool, &scan_id) => response,
        };

        let request_failed = match response {
            Ok(record) => {
                polls += 1;
                failures = 0;
                debug!(status = %record.status, polls, "Status received.");
                observer.on_update(&record);

                if record.status.is_terminal() {
                    info!(status = %record.status, polls, "Scan reached a terminal state.");
                    observer.on_complete(record.clone());
                    return PollOutcome::Completed { record, polls };
                }
                false
            }
            Err(error) => {
                failures += 1;
                warn!(attempt = failures, error = %error, "Status request failed, retrying.");
                observer.on_retry(PollRetry {
                    attempt: failures,
                    error: &error,
                });
                true
            }
        };

        let delay = policy.delay_after(request_failed);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(polls, "Polling cancelled.");
                return PollOutcome::Cancelled;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Owner of a running poll loop.
///
/// Dropping the handle cancels the loop; call `detach` to let it run on its own.
#[derive(Debug)]
pub struct PollHandle {
    task: Option<JoinHandle<PollOutcome>>,
    cancel: CancelToken,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the loop to end.
    pub async fn join(mut self) -> Result<PollOutcome, PollError> {
        match self.task.take() {
            Some(task) => Ok(task.await?),
            None => Ok(PollOutcome::Cancelled),
        }
    }

    /// Releases the loop so it keeps running after the handle is gone.
    pub fn detach(mut self) {
        self.task.take();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel.cancel();
        }
    }
}

// --- Closure adapter ---

/// Adapts a pair of closures into a `PollObserver`.
pub struct FnObserver<U, C> {
    on_update: U,
    on_complete: C,
}

impl<U, C> FnObserver<U, C>
where
    U: FnMut(&ScanRecord) + Send + 'static,
    C: FnOnce(ScanRecord) + Send + 'static,
{
    pub fn new(on_update: U, on_complete: C) -> Self {
        Self { on_update, on_complete }
    }
}

impl<U, C> PollObserver for FnObserver<U, C>
where
    U: FnMut(&ScanRecord) + Send + 'static,
    C: FnOnce(ScanRecord) + Send + 'static,
{
    fn on_update(&mut self, record: &ScanRecord) {
        (self.on_update)(record);
    }

    fn on_complete(self, record: ScanRecord) {
        (self.on_complete)(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::FakeApi;
    use crate::core::models::ScanStatus;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn poller(api: &Arc<FakeApi>) -> StatusPoller<FakeApi> {
        StatusPoller::new(api.clone(), Tool::new("dnsx").unwrap(), PollPolicy::default())
    }

    #[derive(Default, Clone)]
    struct Recorder {
        updates: Arc<Mutex<Vec<ScanStatus>>>,
        retries: Arc<AtomicU32>,
        completions: Arc<AtomicU32>,
    }

    impl PollObserver for Recorder {
        fn on_update(&mut self, record: &ScanRecord) {
            self.updates.lock().unwrap().push(record.status);
        }

        fn on_retry(&mut self, _retry: PollRetry<'_>) {
            self.retries.fetch_add(1, Ordering::SeqCst);
        }

        fn on_complete(self, _record: ScanRecord) {
            self.completions.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_success_and_reports_every_tick() {
        use ScanStatus::*;
        let api = Arc::new(FakeApi::with_statuses(&[Pending, Pending, Running, Success]));
        let recorder = Recorder::default();

        let handle = poller(&api)
            .start_polling("scan-1", CancelToken::new(), recorder.clone())
            .unwrap();
        let outcome = handle.join().await.unwrap();

        match outcome {
            PollOutcome::Completed { record, polls } => {
                assert_eq!(record.status, Success);
                assert_eq!(polls, 4);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(*recorder.updates.lock().unwrap(), vec![Pending, Pending, Running, Success]);
        assert_eq!(recorder.completions.load(Ordering::SeqCst), 1);
        assert_eq!(api.status_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_failure_stops_polling_immediately() {
        for terminal in [ScanStatus::Success, ScanStatus::Error, ScanStatus::Failed] {
            let api = Arc::new(FakeApi::with_statuses(&[ScanStatus::Pending, terminal, ScanStatus::Running]));
            let recorder = Recorder::default();
            let handle = poller(&api)
                .start_polling("scan-1", CancelToken::new(), recorder.clone())
                .unwrap();
            handle.join().await.unwrap();

            // Give any stray tick a chance to run.
            tokio::time::sleep(Duration::from_secs(30)).await;
            assert_eq!(api.status_calls(), 2, "no requests after {terminal}");
            assert_eq!(recorder.completions.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_retried_without_limit() {
        let api = Arc::new(FakeApi::with_statuses(&[ScanStatus::Running]));
        api.fail_next_status_requests(25);
        let recorder = Recorder::default();

        let handle = poller(&api)
            .start_polling("scan-1", CancelToken::new(), recorder.clone())
            .unwrap();

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(!handle.is_finished());
        assert_eq!(recorder.retries.load(Ordering::SeqCst), 25);
        assert_eq!(recorder.completions.load(Ordering::SeqCst), 0);
        assert!(recorder.updates.lock().unwrap().iter().all(|s| *s == ScanStatus::Running));
        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn non_terminal_status_never_completes() {
        let api = Arc::new(FakeApi::with_statuses(&[ScanStatus::Pending]));
        let recorder = Recorder::default();
        let handle = poller(&api)
            .start_polling("scan-1", CancelToken::new(), recorder.clone())
            .unwrap();

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(!handle.is_finished());
        assert_eq!(recorder.completions.load(Ordering::SeqCst), 0);
        assert!(api.status_calls() >= 3000);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_loop_without_completion() {
        let api = Arc::new(FakeApi::with_statuses(&[ScanStatus::Running]));
        let recorder = Recorder::default();
        let token = CancelToken::new();
        let handle = poller(&api)
            .start_polling("scan-1", token.clone(), recorder.clone())
            .unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        token.cancel();
        assert_eq!(handle.join().await.unwrap(), PollOutcome::Cancelled);

        let calls = api.status_calls();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.status_calls(), calls);
        assert_eq!(recorder.completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let api = Arc::new(FakeApi::with_statuses(&[ScanStatus::Running]));
        let token = CancelToken::new();
        let handle = poller(&api)
            .start_polling("scan-1", token.clone(), Recorder::default())
            .unwrap();
        drop(handle);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn empty_scan_id_is_rejected() {
        let api = Arc::new(FakeApi::with_statuses(&[ScanStatus::Success]));
        let err = poller(&api)
            .start_polling("  ", CancelToken::new(), Recorder::default())
            .unwrap_err();
        assert!(matches!(err, PollError::EmptyScanId));
        assert_eq!(api.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_never_overlap() {
        let api = Arc::new(
            FakeApi::with_statuses(&[ScanStatus::Running, ScanStatus::Running, ScanStatus::Success])
                .with_status_latency(Duration::from_secs(5)),
        );
        let handle = poller(&api)
            .start_polling("scan-1", CancelToken::new(), Recorder::default())
            .unwrap();
        handle.join().await.unwrap();
        assert_eq!(api.max_concurrent_status_calls(), 1);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = PollPolicy::default().with_jitter(Duration::from_millis(250));
        for _ in 0..200 {
            let d = policy.delay_after(false);
            assert!(d >= Duration::from_millis(1000) && d <= Duration::from_millis(1250));
            let d = policy.delay_after(true);
            assert!(d >= Duration::from_millis(2000) && d <= Duration::from_millis(2250));
        }
        assert_eq!(PollPolicy::default().delay_after(true), Duration::from_millis(2000));
    }

    #[test]
    fn oversized_jitter_saturates_instead_of_wrapping() {
        let policy = PollPolicy::default().with_jitter(Duration::from_secs(u64::MAX));
        for _ in 0..50 {
            assert!(policy.delay_after(false) >= Duration::from_millis(1000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn closure_observer_completes_once() {
        let api = Arc::new(FakeApi::with_statuses(&[ScanStatus::Pending, ScanStatus::Error]));
        let updates = Arc::new(AtomicU32::new(0));
        let finished = Arc::new(Mutex::new(None));

        let u = updates.clone();
        let f = finished.clone();
        let observer = FnObserver::new(
            move |_rec: &ScanRecord| {
                u.fetch_add(1, Ordering::SeqCst);
            },
            move |rec: ScanRecord| {
                *f.lock().unwrap() = Some(rec.status);
            },
        );
        let handle = poller(&api).start_polling("scan-9", CancelToken::new(), observer).unwrap();
        handle.join().await.unwrap();

        assert_eq!(updates.load(Ordering::SeqCst), 2);
        assert_eq!(*finished.lock().unwrap(), Some(ScanStatus::Error));
    }
}
