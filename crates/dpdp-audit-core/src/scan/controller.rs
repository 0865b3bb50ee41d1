use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ScanError, ScanRequest, ScanResult, ScanState, ScanTransport, SubmitError};

/// Upper bound on how long a scan may stay in `Loading`.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(60);

/// How a pending scan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The result was written to the controller; carries the new state.
    Settled(ScanState),
    /// The view was torn down first; nothing was written.
    Abandoned,
}

/// Single-writer owner of the scan lifecycle.
///
/// State changes are published through a watch channel so renderers can
/// follow along without holding a reference to the controller. Dropping the
/// controller (or calling [`ScanController::teardown`]) ends the view
/// lifetime: any scan still in flight resolves to [`ScanOutcome::Abandoned`].
pub struct ScanController<T: ScanTransport> {
    transport: Arc<T>,
    state: Arc<watch::Sender<ScanState>>,
    generation: Arc<AtomicU64>,
    lifetime: CancellationToken,
    timeout: Duration,
}

impl<T: ScanTransport> ScanController<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_timeout(transport, DEFAULT_SCAN_TIMEOUT)
    }

    pub fn with_timeout(transport: Arc<T>, timeout: Duration) -> Self {
        let (state, _) = watch::channel(ScanState::Idle);
        Self {
            transport,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            lifetime: CancellationToken::new(),
            timeout,
        }
    }

    /// Snapshot of the current lifecycle state.
    pub fn state(&self) -> ScanState {
        self.state.borrow().clone()
    }

    /// Whether the submit control must be disabled.
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state.subscribe()
    }

    /// Move to `Loading` and hand back the suspended scan.
    ///
    /// Refuses blank URLs and refuses to start while another scan is in flight;
    /// neither case touches state or the transport.
    pub fn begin(&self, repo_url: &str) -> Result<PendingScan<T>, SubmitError> {
        if self.lifetime.is_cancelled() {
            return Err(SubmitError::TornDown);
        }
        let request = ScanRequest::new(repo_url)?;
        let accepted = self.state.send_if_modified(|state| {
            if state.is_loading() {
                return false;
            }
            *state = ScanState::Loading;
            true
        });
        if !accepted {
            warn!(repo_url = %request.repo_url, "scan rejected while another is in flight");
            return Err(SubmitError::InFlight);
        }

        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(repo_url = %request.repo_url, scan = id, "scan started");
        Ok(PendingScan {
            transport: Arc::clone(&self.transport),
            request,
            state: Arc::clone(&self.state),
            generation: Arc::clone(&self.generation),
            id,
            cancel: self.lifetime.child_token(),
            timeout: self.timeout,
            settled: false,
        })
    }

    /// Begin a scan and wait for it to settle.
    pub async fn submit(&self, repo_url: &str) -> Result<ScanOutcome, SubmitError> {
        let pending = self.begin(repo_url)?;
        Ok(pending.resolve().await)
    }

    /// End the view lifetime while keeping the handle. Outstanding scans are
    /// discarded and later submissions are refused.
    pub fn close(&self) {
        if !self.lifetime.is_cancelled() {
            debug!("scan view closed");
            self.lifetime.cancel();
        }
    }

    /// End the view lifetime and release the controller.
    pub fn teardown(self) {
        self.close();
    }
}

impl<T: ScanTransport> Drop for ScanController<T> {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

/// A scan that has entered `Loading` but has not been resolved yet.
///
/// Dropping it unresolved while the view is alive settles the controller in
/// `Failed` so the submit control never stays disabled.
pub struct PendingScan<T: ScanTransport> {
    transport: Arc<T>,
    request: ScanRequest,
    state: Arc<watch::Sender<ScanState>>,
    generation: Arc<AtomicU64>,
    id: u64,
    cancel: CancellationToken,
    timeout: Duration,
    settled: bool,
}

impl<T: ScanTransport> PendingScan<T> {
    pub fn request(&self) -> &ScanRequest {
        &self.request
    }

    /// Await the service and apply the result to the controller.
    pub async fn resolve(mut self) -> ScanOutcome {
        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            response = tokio::time::timeout(self.timeout, self.transport.scan(&self.request)) => {
                Some(response)
            }
        };
        let Some(response) = response else {
            self.settled = true;
            debug!(scan = self.id, "scan abandoned after teardown");
            return ScanOutcome::Abandoned;
        };
        let result = response.unwrap_or_else(|_| Err(ScanError::Timeout(self.timeout)));
        self.settle(result)
    }

    fn settle(&mut self, result: Result<ScanResult, ScanError>) -> ScanOutcome {
        self.settled = true;
        if self.cancel.is_cancelled() {
            debug!(scan = self.id, "scan abandoned after teardown");
            return ScanOutcome::Abandoned;
        }

        let next = match result {
            Ok(result) => {
                info!(
                    scan = self.id,
                    score = result.score,
                    violations = result.violations.len(),
                    "scan succeeded"
                );
                ScanState::Success(result)
            }
            Err(err) => {
                warn!(scan = self.id, error = %err, "scan failed");
                ScanState::Failed(err.user_message())
            }
        };

        let mut next = Some(next);
        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != self.id || !state.is_loading() {
                return false;
            }
            match next.take() {
                Some(next) => {
                    *state = next;
                    true
                }
                None => false,
            }
        });
        if applied {
            ScanOutcome::Settled(self.state.borrow().clone())
        } else {
            debug!(scan = self.id, "stale scan result discarded");
            ScanOutcome::Abandoned
        }
    }
}

impl<T: ScanTransport> Drop for PendingScan<T> {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(Err(ScanError::Cancelled));
        }
    }
}
