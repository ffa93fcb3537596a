//! Panel snapshots and the handle a page holds while it is visible

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{RefreshError, Result};

/// What a page renders: the last good data plus the outcome of the latest
/// cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState<T> {
    /// Data from the last successful fetch
    pub data: Option<T>,
    /// Message from the latest fetch, cleared by the next success
    pub error: Option<String>,
    /// A fetch is in flight
    pub loading: bool,
    /// Completed fetches, successful or not
    pub cycles: u64,
    /// Time of the last successful fetch
    pub last_updated: Option<DateTime<Utc>>,
}

impl<T> Default for PanelState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: true,
            cycles: 0,
            last_updated: None,
        }
    }
}

impl<T> PanelState<T> {
    /// Whether at least one fetch has completed
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.cycles > 0
    }

    /// Still waiting for the very first result
    #[must_use]
    pub const fn is_initial_load(&self) -> bool {
        self.loading && self.data.is_none() && self.error.is_none()
    }

    pub(crate) fn record_success(&mut self, data: T) {
        self.data = Some(data);
        self.error = None;
        self.loading = false;
        self.cycles += 1;
        self.last_updated = Some(Utc::now());
    }

    pub(crate) fn record_failure(&mut self, message: String) {
        self.error = Some(message);
        self.loading = false;
        self.cycles += 1;
    }
}

/// Shared between a handle and its poller
#[derive(Debug)]
pub(crate) struct PanelControl {
    pub(crate) cancel: CancellationToken,
    pub(crate) trigger: Notify,
    /// Bumped on deactivation; a fetch that started under an older value
    /// must not publish
    pub(crate) generation: AtomicU64,
}

impl PanelControl {
    pub(crate) fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            trigger: Notify::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub(crate) fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// Keeps one panel polling; dropping it stops the poller
#[derive(Debug)]
pub struct PanelHandle<T> {
    key: String,
    rx: watch::Receiver<PanelState<T>>,
    control: Arc<PanelControl>,
}

impl<T> PanelHandle<T> {
    pub(crate) const fn new(
        key: String,
        rx: watch::Receiver<PanelState<T>>,
        control: Arc<PanelControl>,
    ) -> Self {
        Self { key, rx, control }
    }

    /// Resource key this panel polls
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Latest snapshot
    #[must_use]
    pub fn snapshot(&self) -> PanelState<T>
    where
        T: Clone,
    {
        self.rx.borrow().clone()
    }

    /// A receiver that observes every published snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PanelState<T>> {
        self.rx.clone()
    }

    /// Fetch again now instead of waiting for the next tick
    ///
    /// Requests made while a fetch is in flight collapse into one follow-up
    /// fetch.
    pub fn refresh_now(&self) {
        debug!(panel = %self.key, "Manual refresh requested");
        self.control.trigger.notify_one();
    }

    /// Stop polling; an in-flight fetch is dropped and never published
    pub fn deactivate(&self) {
        if !self.control.cancel.is_cancelled() {
            self.control.generation.fetch_add(1, Ordering::AcqRel);
            self.control.cancel.cancel();
            debug!(panel = %self.key, "Panel deactivated");
        }
    }

    /// Whether the poller is still running
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.control.cancel.is_cancelled()
    }

    /// Wait until the first fetch completes, then return the snapshot
    ///
    /// # Errors
    ///
    /// - [`RefreshError::Timeout`] if nothing completed within `timeout`
    /// - [`RefreshError::Closed`] if the poller stopped before loading
    pub async fn wait_loaded(&self, timeout: Duration) -> Result<PanelState<T>>
    where
        T: Clone,
    {
        self.wait_for_cycles(1, timeout).await
    }

    /// Wait until at least `cycles` fetches have completed
    ///
    /// # Errors
    ///
    /// Same as [`PanelHandle::wait_loaded`].
    pub async fn wait_for_cycles(&self, cycles: u64, timeout: Duration) -> Result<PanelState<T>>
    where
        T: Clone,
    {
        let mut rx = self.rx.clone();
        match tokio::time::timeout(timeout, rx.wait_for(|state| state.cycles >= cycles)).await {
            Ok(Ok(state)) => Ok(state.clone()),
            Ok(Err(_)) => Err(RefreshError::Closed {
                key: self.key.clone(),
            }),
            Err(_) => Err(RefreshError::Timeout {
                key: self.key.clone(),
                waited_ms: timeout.as_millis(),
            }),
        }
    }
}

impl<T> Drop for PanelHandle<T> {
    fn drop(&mut self) {
        self.deactivate();
    }
}
