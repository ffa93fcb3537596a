//! Application state management

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use impact_client::ApiClient;
use impact_core::{Config, context_error::Result};
use impact_refresh::{PanelHandle, PanelState, RefreshInterval, RefreshScheduler};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::analytics::AnalyticsCache;
use crate::extract::SessionUser;
use crate::pages::{PageData, PanelRequest, fetch_page};

#[derive(Debug)]
struct OpenPanel {
    handle: PanelHandle<PageData>,
    last_seen: Instant,
}

/// One signed-in user's open console
///
/// Every page the user has open in some tab keeps its own panel. A panel
/// that no tab has rendered or polled within the idle limit is dropped,
/// which cancels its poller; so is the whole view once it goes idle or its
/// token expires.
#[derive(Debug)]
pub struct ViewSession {
    token: String,
    expires_at: Option<DateTime<Utc>>,
    api: ApiClient,
    panels: HashMap<String, OpenPanel>,
    latest: Option<String>,
    unread: Option<PanelHandle<u64>>,
    analytics: AnalyticsCache,
    last_seen: Instant,
}

impl ViewSession {
    /// Key of the most recently shown page panel
    #[must_use]
    pub fn panel_key(&self) -> Option<&str> {
        self.latest.as_deref()
    }

    /// Keys of every open page panel
    #[must_use]
    pub fn panel_keys(&self) -> Vec<&str> {
        self.panels.keys().map(String::as_str).collect()
    }

    fn is_stale(&self, now: Instant, wall: DateTime<Utc>, idle: Duration) -> bool {
        let expired = self.expires_at.is_some_and(|exp| wall >= exp);
        expired || now.saturating_duration_since(self.last_seen) > idle
    }

    fn evict_idle_panels(&mut self, now: Instant, idle: Duration) {
        self.panels.retain(|key, panel| {
            let keep = now.saturating_duration_since(panel.last_seen) <= idle;
            if !keep {
                debug!(panel = %key, "Dropping idle panel");
            }
            keep
        });
        if self.latest.as_ref().is_some_and(|key| !self.panels.contains_key(key)) {
            self.latest = None;
        }
    }
}

/// What a page needs from its view session to render
#[derive(Debug, Clone, Default)]
pub struct Shown {
    /// Key of the rendered panel, `None` for pages without a panel
    pub key: Option<String>,
    /// Latest panel snapshot, `None` for pages without a panel
    pub panel: Option<PanelState<PageData>>,
    /// Cached analytics tabs
    pub analytics: AnalyticsCache,
    /// Unread notification count, once fetched
    pub unread: Option<u64>,
}

/// Shared application state
#[derive(Debug)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// Backend client without credentials; sessions derive theirs from it
    pub api: ApiClient,
    /// Owner of every panel poller
    pub scheduler: RefreshScheduler,
    views: DashMap<String, ViewSession>,
    sweeping: AtomicBool,
}

impl AppState {
    /// Create new application state
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let api = ApiClient::from_config(&config.backend)
            .map_err(|e| impact_core::context_error!("Failed to build backend client: {}", e))?;
        Ok(Self::with_client(config, api))
    }

    /// State around an existing client
    #[must_use]
    pub fn with_client(config: Config, api: ApiClient) -> Self {
        Self {
            config,
            api,
            scheduler: RefreshScheduler::new(),
            views: DashMap::new(),
            sweeping: AtomicBool::new(false),
        }
    }

    /// Backend client acting as `user`
    #[must_use]
    pub fn client_for(&self, user: &SessionUser) -> ApiClient {
        let api = self.api.for_session(&user.session);
        match &user.refresh_token {
            Some(refresh) => api.with_refresh_token(refresh.clone()),
            None => api,
        }
    }

    fn period(&self, interval: Option<RefreshInterval>) -> Option<Duration> {
        interval.map(|tier| tier.period(&self.config.refresh))
    }

    /// Open `request` for `user` and return what to render
    ///
    /// The first load is awaited up to the configured timeout; a slower page
    /// renders its loading state and the browser polls for the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler has shut down.
    pub async fn show(&self, user: &SessionUser, request: &PanelRequest) -> impact_refresh::Result<Shown> {
        let username = user.session.username.clone();
        let key = request.key(&username);
        let now = Instant::now();
        let mut receiver = None;

        {
            let mut view = self.view_for(user)?;
            view.last_seen = now;
            if request.needs_panel() {
                if !view.panels.contains_key(&key) {
                    let api = view.api.clone();
                    let owner = username.clone();
                    let target = request.clone();
                    let handle = self.scheduler.activate(&key, self.period(request.interval()), move || {
                        let api = api.clone();
                        let owner = owner.clone();
                        let target = target.clone();
                        async move { fetch_page(&api, &owner, &target).await }
                    })?;
                    info!(user = %username, panel = %key, "Page panel activated");
                    view.panels.insert(key.clone(), OpenPanel { handle, last_seen: now });
                }
                if let Some(panel) = view.panels.get_mut(&key) {
                    panel.last_seen = now;
                    receiver = Some(panel.handle.subscribe());
                }
                view.latest = Some(key.clone());
            }
        }

        let panel = match receiver {
            Some(mut rx) => {
                let wait = self.config.refresh.first_load_timeout();
                if tokio::time::timeout(wait, rx.wait_for(PanelState::is_loaded)).await.is_err() {
                    debug!(panel = %key, "First load still running, rendering loading state");
                }
                let snapshot = rx.borrow().clone();
                Some(snapshot)
            }
            None => None,
        };

        let key = panel.is_some().then_some(key);
        Ok(self.record(&username, key, panel))
    }

    /// Cache analytics payloads and gather the view's render inputs
    fn record(&self, username: &str, key: Option<String>, panel: Option<PanelState<PageData>>) -> Shown {
        let mut shown = Shown {
            key,
            panel,
            ..Shown::default()
        };
        if let Some(mut view) = self.views.get_mut(username) {
            if let Some(PageData::Analytics { tab, report }) =
                shown.panel.as_ref().and_then(|state| state.data.as_ref())
            {
                view.analytics.store(*tab, report.clone());
            }
            shown.analytics = view.analytics.clone();
            shown.unread = view
                .unread
                .as_ref()
                .and_then(|handle| handle.snapshot().data);
        }
        shown
    }

    /// Existing view for `user`, or a fresh one if the token changed
    fn view_for(
        &self,
        user: &SessionUser,
    ) -> impact_refresh::Result<dashmap::mapref::one::RefMut<'_, String, ViewSession>> {
        let username = &user.session.username;
        let token = user.session.token();

        if let Some(view) = self.views.get_mut(username)
            && view.token == token
        {
            return Ok(view);
        }

        let api = self.client_for(user);
        let unread = self.activate_unread(username, api.clone())?;
        let view = ViewSession {
            token: token.to_string(),
            expires_at: user.session.expires_at,
            api,
            panels: HashMap::new(),
            latest: None,
            unread: Some(unread),
            analytics: AnalyticsCache::new(),
            last_seen: Instant::now(),
        };
        info!(user = %username, "View session opened");
        self.views.insert(username.clone(), view);
        self.views
            .get_mut(username)
            .ok_or_else(|| impact_refresh::RefreshError::Closed { key: username.clone() })
    }

    fn activate_unread(&self, username: &str, api: ApiClient) -> impact_refresh::Result<PanelHandle<u64>> {
        self.scheduler.activate(
            format!("{username}/notifications"),
            self.period(Some(RefreshInterval::Fast)),
            move || {
                let api = api.clone();
                async move { api.unread_count().await.map_err(|e| e.display_message()) }
            },
        )
    }

    /// Refetch every page the user has open now
    ///
    /// Returns whether a panel was active.
    pub fn refresh(&self, username: &str) -> bool {
        let Some(view) = self.views.get(username) else {
            return false;
        };
        if let Some(unread) = &view.unread {
            unread.refresh_now();
        }
        for panel in view.panels.values() {
            panel.handle.refresh_now();
        }
        !view.panels.is_empty()
    }

    /// Latest snapshot of one of the user's panels, without waiting
    ///
    /// `key` selects the panel; without it the most recently shown one is
    /// used. A browser polling a panel keeps it, and its view, from going
    /// idle.
    pub fn observe(&self, username: &str, key: Option<&str>) -> Option<(String, PanelState<PageData>)> {
        let mut view = self.views.get_mut(username)?;
        let now = Instant::now();
        view.last_seen = now;
        let key = key.map(str::to_string).or_else(|| view.latest.clone())?;
        let panel = view.panels.get_mut(&key)?;
        panel.last_seen = now;
        let snapshot = panel.handle.snapshot();
        Some((key, snapshot))
    }

    /// Key of the user's most recently shown panel
    #[must_use]
    pub fn panel_key(&self, username: &str) -> Option<String> {
        self.views
            .get(username)
            .and_then(|view| view.panel_key().map(str::to_string))
    }

    /// Keys of every panel the user has open
    #[must_use]
    pub fn panel_keys(&self, username: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .views
            .get(username)
            .map(|view| view.panel_keys().into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Close the user's view, stopping its pollers
    pub fn sign_out(&self, username: &str) {
        if self.views.remove(username).is_some() {
            info!(user = %username, "View session closed");
        } else {
            warn!(user = %username, "Sign-out without an open view");
        }
    }

    /// Drop idle panels, then views that went idle or whose token expired
    ///
    /// Returns the number of views closed.
    pub fn sweep_at(&self, now: Instant, wall: DateTime<Utc>) -> usize {
        let idle = self.config.refresh.view_idle();
        let before = self.views.len();
        self.views.retain(|username, view| {
            if view.is_stale(now, wall, idle) {
                info!(user = %username, "Closing abandoned view session");
                return false;
            }
            view.evict_idle_panels(now, idle);
            true
        });
        before.saturating_sub(self.views.len())
    }

    /// [`AppState::sweep_at`] against the current clocks
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now(), Utc::now())
    }

    /// Start the task that sweeps abandoned views
    ///
    /// It runs until the scheduler shuts down or the state is dropped. Only
    /// the first call spawns it.
    pub fn start_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.sweeping.swap(true, Ordering::SeqCst) {
            return None;
        }

        let period = (self.config.refresh.view_idle() / 3).max(Duration::from_secs(1));
        let cancel = self.scheduler.child_token();
        let state: Weak<Self> = Arc::downgrade(self);
        debug!(?period, "Starting view sweeper");

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(state) = state.upgrade() else { break };
                        let closed = state.sweep();
                        if closed > 0 {
                            debug!(closed, remaining = state.view_count(), "Swept view sessions");
                        }
                    }
                }
            }
            debug!("View sweeper stopped");
        }))
    }

    /// Number of open views
    #[must_use]
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Stop every poller
    pub fn shutdown(&self) {
        self.views.clear();
        self.scheduler.shutdown();
    }
}

/// State shared across handlers
pub type SharedState = Arc<AppState>;
