//! Stale-while-revalidate loading.
//!
//! Cached values are surfaced immediately, a fetch runs unless the cache is
//! younger than the freshness threshold, and a failed fetch leaves cached
//! data in place. The presentation layer hears about every change through
//! [`Update`] messages.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, Dispatcher, HttpTransport, SyncError, Transport};
use crate::cache::CacheManager;
use crate::models::{ConfigSnapshot, WeekDescriptor, WeekDetail};
use crate::state::{LoadState, TrackerState};

/// Cached data younger than this is not refetched unless forced.
pub const DEFAULT_FRESH_AFTER: Duration = Duration::from_secs(20);

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub severity: Severity,
}

/// Connectivity indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetState {
    Loading,
    Cached,
    Ready,
    Synced,
    Offline,
    Failed,
}

impl NetState {
    pub fn label(&self) -> &'static str {
        match self {
            NetState::Loading => "Loading",
            NetState::Cached => "Cached",
            NetState::Ready => "Ready",
            NetState::Synced => "Synced",
            NetState::Offline => "Offline?",
            NetState::Failed => "Failed",
        }
    }
}

/// Messages sent to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Config replaced (from cache or server)
    Config(ConfigSnapshot),
    /// Week index replaced
    Weeks(Vec<WeekDescriptor>),
    /// The held week detail changed
    WeekDetail(WeekDetail),
    Status(StatusMessage),
    Net(NetState),
}

// ============================================================================
// Loader
// ============================================================================

pub struct Loader<T = HttpTransport> {
    api: ApiClient<T>,
    cache: CacheManager,
    fresh_after: Duration,
    tx: mpsc::UnboundedSender<Update>,
}

impl<T: Transport> Loader<T> {
    /// Create a loader and the receiving end of its notification channel.
    pub fn new(
        dispatcher: Dispatcher<T>,
        cache: CacheManager,
    ) -> (Self, mpsc::UnboundedReceiver<Update>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let loader = Self {
            api: ApiClient::new(dispatcher),
            cache,
            fresh_after: DEFAULT_FRESH_AFTER,
            tx,
        };
        (loader, rx)
    }

    pub fn with_fresh_after(mut self, fresh_after: Duration) -> Self {
        self.fresh_after = fresh_after;
        self
    }

    pub fn api(&self) -> &ApiClient<T> {
        &self.api
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    // ===== Notifications =====

    pub fn notify(&self, update: Update) {
        if self.tx.send(update).is_err() {
            debug!("Update dropped - receiver closed");
        }
    }

    pub fn status(&self, text: impl Into<String>, severity: Severity) {
        self.notify(Update::Status(StatusMessage {
            text: text.into(),
            severity,
        }));
    }

    pub fn net(&self, state: NetState) {
        self.notify(Update::Net(state));
    }

    pub async fn warm_up(&self) {
        self.api.warm_up().await
    }

    // ===== Bootstrap: config + week index =====

    /// Load config and the week index.
    ///
    /// Cached values not already held are surfaced first. Both fetches run
    /// concurrently and each result is applied on its own, so one failing
    /// does not discard the other.
    pub async fn load_bootstrap(&self, state: &mut TrackerState, force: bool) {
        let cached_config = self.cache.load_config();
        let cached_weeks = self.cache.load_weeks();

        let mut from_cache = false;
        if let Some(cached) = &cached_config {
            if !force || state.config.is_none() {
                state.apply_config(cached.data.clone(), LoadState::CachedOnly);
                self.notify(Update::Config(cached.data.clone()));
                from_cache = true;
            }
        }
        if let Some(cached) = &cached_weeks {
            if !force || state.weeks.is_empty() {
                state.apply_weeks(cached.data.clone(), LoadState::CachedOnly);
                self.notify(Update::Weeks(cached.data.clone()));
                from_cache = true;
            }
        }

        if from_cache && !force {
            self.status("Loaded from cache — refreshing…", Severity::Info);
            self.net(NetState::Cached);
        } else if !from_cache && state.config.is_none() && state.weeks.is_empty() {
            self.status("Loading…", Severity::Info);
            self.net(NetState::Loading);
        }

        let config_fresh = cached_config.as_ref().is_some_and(|c| c.is_fresh(self.fresh_after));
        let weeks_fresh = cached_weeks.as_ref().is_some_and(|c| c.is_fresh(self.fresh_after));
        if !force && config_fresh && weeks_fresh {
            debug!("Bootstrap cache is fresh, skipping fetch");
            return;
        }

        self.status(
            if force { "Refreshing…" } else { "Refreshing (background)…" },
            Severity::Info,
        );

        let (config_res, weeks_res) = tokio::join!(self.api.fetch_config(), self.api.fetch_weeks());
        self.apply_config_result(state, config_res);
        self.apply_weeks_result(state, weeks_res);
    }

    fn apply_config_result(
        &self,
        state: &mut TrackerState,
        result: Result<Option<ConfigSnapshot>, SyncError>,
    ) {
        match result {
            Ok(Some(config)) => {
                info!(people = config.people.len(), categories = config.categories.len(), "Config refreshed");
                self.cache.save_config(&config);
                state.apply_config(config.clone(), LoadState::Fresh);
                self.notify(Update::Config(config));
            }
            Ok(None) => debug!("Config fetch returned no data, keeping current"),
            Err(e) => self.fetch_failed(
                "config",
                &e,
                state.config.is_some(),
                |load_state| state.mark_config(load_state),
            ),
        }
    }

    fn apply_weeks_result(
        &self,
        state: &mut TrackerState,
        result: Result<Option<Vec<WeekDescriptor>>, SyncError>,
    ) {
        match result {
            Ok(Some(weeks)) => {
                info!(count = weeks.len(), "Week index refreshed");
                self.cache.save_weeks(&weeks);
                state.apply_weeks(weeks.clone(), LoadState::Fresh);
                self.notify(Update::Weeks(weeks));
            }
            Ok(None) => debug!("Week index fetch returned no data, keeping current"),
            Err(e) => self.fetch_failed(
                "weeks",
                &e,
                !state.weeks.is_empty(),
                |load_state| state.mark_weeks(load_state),
            ),
        }
    }

    /// Report a failed bootstrap fetch and record the resulting load state.
    fn fetch_failed(
        &self,
        resource: &str,
        err: &SyncError,
        has_data: bool,
        mark: impl FnOnce(LoadState),
    ) {
        if has_data {
            warn!(resource, error = %err, "Refresh failed, keeping cached data");
            mark(LoadState::CachedOnly);
            self.status(format!("Using cached {} (refresh failed).", resource), Severity::Warning);
            self.net(NetState::Cached);
        } else {
            error!(resource, error = %err, "Load failed with nothing cached");
            mark(LoadState::Failed);
            self.status(format!("Load failed: {}", err), Severity::Error);
            self.net(NetState::Failed);
        }
    }

    // ===== Week detail =====

    /// Load the detail for (week, person) and return its resulting state.
    ///
    /// A cached record is surfaced first unless `force` is set and the same
    /// detail is already held. A forced load always fetches.
    pub async fn load_week_detail(
        &self,
        state: &mut TrackerState,
        week_id: &str,
        person: &str,
        force: bool,
    ) -> LoadState {
        let cached = self.cache.load_week_detail(week_id, person);
        let held = state.detail_for(week_id, person).is_some();

        match &cached {
            Some(record) if !force || !held => {
                debug!(week = week_id, person, age = %record.age_display(), "Week detail served from cache");
                state.apply_detail(record.data.clone(), LoadState::CachedOnly);
                self.notify(Update::WeekDetail(record.data.clone()));
                self.status("Week loaded (cached) — refreshing…", Severity::Info);
            }
            _ => self.status("Loading week details…", Severity::Info),
        }

        let fresh = cached.as_ref().is_some_and(|c| c.is_fresh(self.fresh_after));
        if !force && fresh {
            self.status("Ready.", Severity::Info);
            return state.detail_state;
        }

        match self.api.fetch_week_detail(week_id, person).await {
            Ok(Some(detail)) => {
                self.cache.save_week_detail(&detail);
                state.apply_detail(detail.clone(), LoadState::Fresh);
                self.notify(Update::WeekDetail(detail));
                self.status("Ready.", Severity::Info);
            }
            Ok(None) => debug!(week = week_id, person, "Week detail fetch returned no data, keeping current"),
            Err(e) if cached.is_some() || held => {
                warn!(week = week_id, person, error = %e, "Week refresh failed, keeping cached detail");
                state.mark_detail(LoadState::CachedOnly);
                self.status("Using cached week (refresh failed).", Severity::Warning);
                self.net(NetState::Cached);
            }
            Err(e) => {
                error!(week = week_id, person, error = %e, "Week load failed");
                state.mark_detail(LoadState::Failed);
                self.status(format!("Week load failed: {}", e), Severity::Error);
                self.net(NetState::Offline);
            }
        }
        state.detail_state
    }
}
