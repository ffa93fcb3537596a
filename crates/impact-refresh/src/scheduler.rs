//! Spawns one poller task per active panel

use dashmap::DashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{RefreshError, Result};
use crate::panel::{PanelControl, PanelHandle, PanelState};

/// Owns every panel poller of the process
///
/// Each [`RefreshScheduler::activate`] call spawns a task that fetches
/// immediately and then on every tick until its [`PanelHandle`] is
/// deactivated or dropped, or the scheduler shuts down.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    root: CancellationToken,
    active: Arc<DashMap<u64, String>>,
    next_id: Arc<AtomicU64>,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshScheduler {
    /// Create a scheduler with no panels
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            active: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Start polling `key` with `fetch`
    ///
    /// With `period` set to `None` the panel fetches once and then only on
    /// [`PanelHandle::refresh_now`]. A failed fetch keeps the previous data
    /// and records the error text; the next tick runs as usual.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::ShutDown`] after [`RefreshScheduler::shutdown`].
    #[instrument(skip(self, key, fetch), fields(panel = %key.as_ref()))]
    pub fn activate<T, E, F, Fut>(
        &self,
        key: impl AsRef<str>,
        period: Option<Duration>,
        fetch: F,
    ) -> Result<PanelHandle<T>>
    where
        T: Send + Sync + 'static,
        E: fmt::Display + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        if self.root.is_cancelled() {
            return Err(RefreshError::ShutDown);
        }

        let key = key.as_ref().to_string();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let control = Arc::new(PanelControl::new(self.root.child_token()));
        let (tx, rx) = watch::channel(PanelState::default());

        self.active.insert(id, key.clone());
        debug!(panel = %key, id, ?period, "Activating panel");

        let poller = Poller {
            key: key.clone(),
            period,
            control: Arc::clone(&control),
            tx,
        };
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            poller.run(fetch).await;
            active.remove(&id);
        });

        Ok(PanelHandle::new(key, rx, control))
    }

    /// Number of pollers still running
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Keys of the pollers still running
    #[must_use]
    pub fn active_keys(&self) -> Vec<String> {
        self.active.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Token cancelled by [`RefreshScheduler::shutdown`]
    ///
    /// Housekeeping tasks that live as long as the pollers select on it.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.root.child_token()
    }

    /// Stop every poller and refuse new activations
    pub fn shutdown(&self) {
        info!(active = self.active.len(), "Shutting down refresh scheduler");
        self.root.cancel();
    }

    /// Whether [`RefreshScheduler::shutdown`] has been called
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }
}

struct Poller<T> {
    key: String,
    period: Option<Duration>,
    control: Arc<PanelControl>,
    tx: watch::Sender<PanelState<T>>,
}

impl<T: Send + Sync + 'static> Poller<T> {
    async fn run<E, F, Fut>(self, fetch: F)
    where
        E: fmt::Display,
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let mut ticker = self.period.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            let generation = self.control.current_generation();
            self.tx.send_modify(|state| state.loading = true);

            let outcome = tokio::select! {
                biased;
                () = self.control.cancel.cancelled() => break,
                outcome = fetch() => outcome,
            };

            if self.control.cancel.is_cancelled() || generation != self.control.current_generation() {
                debug!(panel = %self.key, "Discarding late response");
                break;
            }

            match outcome {
                Ok(data) => self.tx.send_modify(|state| state.record_success(data)),
                Err(e) => {
                    warn!(panel = %self.key, error = %e, "Panel refresh failed");
                    let message = e.to_string();
                    self.tx.send_modify(|state| state.record_failure(message));
                }
            }

            let triggered = match ticker.as_mut() {
                Some(ticker) => tokio::select! {
                    () = self.control.cancel.cancelled() => break,
                    _ = ticker.tick() => false,
                    () = self.control.trigger.notified() => true,
                },
                None => tokio::select! {
                    () = self.control.cancel.cancelled() => break,
                    () = self.control.trigger.notified() => true,
                },
            };

            if triggered {
                if let Some(ticker) = ticker.as_mut() {
                    ticker.reset();
                }
            }
        }

        debug!(panel = %self.key, "Poller stopped");
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    const WAIT: Duration = Duration::from_secs(5);

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
    ) -> impl Fn() -> std::future::Ready<std::result::Result<usize, String>> + Send + Sync + 'static
    {
        let calls = Arc::clone(calls);
        move || std::future::ready(Ok(calls.fetch_add(1, Ordering::SeqCst) + 1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_immediately_then_every_period() {
        let scheduler = RefreshScheduler::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = scheduler
            .activate("system_stats", Some(Duration::from_secs(30)), counting_fetch(&calls))
            .unwrap();

        let first = handle.wait_loaded(WAIT).await.unwrap();
        assert_eq!(first.data, Some(1));
        assert!(first.last_updated.is_some());

        sleep(Duration::from_secs(29)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(handle.snapshot().data, Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycle_keeps_previous_data() {
        let scheduler = RefreshScheduler::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let handle = scheduler
            .activate("org_stats", Some(Duration::from_secs(10)), move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(if n == 1 {
                    Err("Network error while contacting the server".to_string())
                } else {
                    Ok(vec![n])
                })
            })
            .unwrap();

        handle.wait_loaded(WAIT).await.unwrap();

        let failed = handle.wait_for_cycles(2, Duration::from_secs(15)).await.unwrap();
        assert_eq!(failed.data, Some(vec![0]));
        assert_eq!(
            failed.error.as_deref(),
            Some("Network error while contacting the server")
        );
        assert!(!failed.loading);

        let recovered = handle.wait_for_cycles(3, Duration::from_secs(15)).await.unwrap();
        assert_eq!(recovered.data, Some(vec![2]));
        assert_eq!(recovered.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivate_stops_fetching() {
        let scheduler = RefreshScheduler::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = scheduler
            .activate("users", Some(Duration::from_secs(30)), counting_fetch(&calls))
            .unwrap();
        handle.wait_loaded(WAIT).await.unwrap();

        handle.deactivate();
        assert!(!handle.is_active());

        sleep(Duration::from_secs(300)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_is_never_published() {
        let scheduler = RefreshScheduler::new();
        let completed = Arc::new(AtomicUsize::new(0));
        let done = Arc::clone(&completed);

        let handle = scheduler
            .activate("analytics:overview", Some(Duration::from_secs(300)), move || {
                let done = Arc::clone(&done);
                async move {
                    sleep(Duration::from_secs(10)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>("payload")
                }
            })
            .unwrap();

        sleep(Duration::from_secs(1)).await;
        assert!(handle.snapshot().loading);

        handle.deactivate();
        sleep(Duration::from_secs(30)).await;

        let state = handle.snapshot();
        assert_eq!(state.data, None);
        assert_eq!(state.cycles, 0);
        assert_eq!(completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_now_without_period() {
        let scheduler = RefreshScheduler::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = scheduler
            .activate("course_requests", None, counting_fetch(&calls))
            .unwrap();
        handle.wait_loaded(WAIT).await.unwrap();

        sleep(Duration::from_secs(3600)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        handle.refresh_now();
        let state = handle.wait_for_cycles(2, WAIT).await.unwrap();
        assert_eq!(state.data, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_now_restarts_the_period() {
        let scheduler = RefreshScheduler::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = scheduler
            .activate("organizations", Some(Duration::from_secs(30)), counting_fetch(&calls))
            .unwrap();
        handle.wait_loaded(WAIT).await.unwrap();

        sleep(Duration::from_secs(20)).await;
        handle.refresh_now();
        handle.wait_for_cycles(2, WAIT).await.unwrap();

        sleep(Duration::from_secs(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        sleep(Duration::from_secs(15)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels_poller() {
        let scheduler = RefreshScheduler::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = scheduler
            .activate("portal_admins", Some(Duration::from_secs(120)), counting_fetch(&calls))
            .unwrap();
        handle.wait_loaded(WAIT).await.unwrap();
        assert_eq!(scheduler.active_keys(), vec!["portal_admins".to_string()]);

        drop(handle);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_everything_and_refuses_new_panels() {
        let scheduler = RefreshScheduler::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = scheduler
            .activate("a", Some(Duration::from_secs(30)), counting_fetch(&calls))
            .unwrap();
        handle.wait_loaded(WAIT).await.unwrap();

        scheduler.shutdown();
        assert!(scheduler.is_shut_down());
        assert!(!handle.is_active());

        let err = scheduler
            .activate("b", Some(Duration::from_secs(30)), counting_fetch(&calls))
            .unwrap_err();
        assert_eq!(err, RefreshError::ShutDown);

        sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_token_follows_shutdown() {
        let scheduler = RefreshScheduler::new();
        let token = scheduler.child_token();
        let task = tokio::spawn(async move {
            let mut ticks = 0_u32;
            loop {
                tokio::select! {
                    () = token.cancelled() => break ticks,
                    () = sleep(Duration::from_secs(10)) => ticks += 1,
                }
            }
        });

        sleep(Duration::from_secs(35)).await;
        scheduler.shutdown();
        assert_eq!(task.await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_loaded_times_out() {
        let scheduler = RefreshScheduler::new();
        let handle = scheduler
            .activate("slow", None, || async {
                sleep(Duration::from_secs(60)).await;
                Ok::<_, String>(())
            })
            .unwrap();

        let err = handle.wait_loaded(Duration::from_millis(1500)).await.unwrap_err();
        assert_eq!(
            err,
            RefreshError::Timeout {
                key: "slow".to_string(),
                waited_ms: 1500,
            }
        );
    }
}
