//! The tracker coordinator.
//!
//! `Tracker` owns the application state and the loader and exposes the
//! operations a presentation layer calls: start, selection changes, adding an
//! entry and forced refresh. Results arrive on the [`Update`] channel.

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{Dispatcher, HttpTransport, SyncError, Transport};
use crate::cache::CacheManager;
use crate::config::Config;
use crate::loader::{Loader, NetState, Severity, Update};
use crate::models::Entry;
use crate::mutation::{self, EntryDraft};
use crate::state::{LoadState, TrackerState};

pub struct Tracker<T = HttpTransport> {
    loader: Loader<T>,
    state: TrackerState,
}

impl Tracker<HttpTransport> {
    /// Build a tracker talking to the configured backend over HTTP, caching
    /// under the configured directory.
    pub fn from_config(config: &Config) -> Result<(Self, mpsc::UnboundedReceiver<Update>), SyncError> {
        let transport = HttpTransport::new()
            .map_err(|e| SyncError::Config(format!("HTTP client could not be created: {}", e)))?;
        let dispatcher = Dispatcher::from_config(transport, config)?;

        let cache = match config.cache_dir() {
            Ok(dir) => CacheManager::open(dir),
            Err(e) => {
                warn!(error = %e, "No cache directory, caching in memory only");
                CacheManager::in_memory()
            }
        };

        let (loader, rx) = Loader::new(dispatcher, cache);
        Ok((Self::new(loader.with_fresh_after(config.fresh_after())), rx))
    }
}

impl<T: Transport> Tracker<T> {
    pub fn new(loader: Loader<T>) -> Self {
        Self {
            loader,
            state: TrackerState::new(),
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn loader(&self) -> &Loader<T> {
        &self.loader
    }

    /// Startup: surface the cache, refresh config and weeks, then load the
    /// selected week. The warm-up pings run alongside and never hold it up.
    pub async fn start(&mut self) {
        info!("Starting tracker");
        let loader = &self.loader;
        let state = &mut self.state;
        let startup = async move {
            loader.load_bootstrap(state, false).await;
            state.sync_day();
            load_selected_detail(loader, state, false).await;
        };
        tokio::pin!(startup);

        tokio::select! {
            biased;
            _ = &mut startup => {}
            _ = loader.warm_up() => (&mut startup).await,
        }

        self.loader.status("Ready.", Severity::Info);
        self.loader.net(NetState::Ready);
    }

    pub async fn select_person(&mut self, person: &str) -> Result<(), SyncError> {
        self.reject_invalid(|state| state.select_person(person))?;
        self.loader.status("Person changed — loading…", Severity::Info);
        self.reload_after_selection().await;
        Ok(())
    }

    pub async fn select_week(&mut self, week_id: &str) -> Result<(), SyncError> {
        self.reject_invalid(|state| state.select_week(week_id))?;
        self.loader.status("Week changed — loading…", Severity::Info);
        self.reload_after_selection().await;
        Ok(())
    }

    pub fn select_day(&mut self, day: NaiveDate) -> Result<(), SyncError> {
        self.reject_invalid(|state| state.select_day(day))
    }

    pub fn select_category(&mut self, category: &str) -> Result<(), SyncError> {
        self.reject_invalid(|state| state.select_category(category))
    }

    pub async fn add_entry(&mut self, draft: EntryDraft) -> Result<Entry, SyncError> {
        mutation::add_entry(&self.loader, &mut self.state, draft).await
    }

    /// Add an entry for the current selection from the raw miles text.
    pub async fn add_entry_from_selection(&mut self, miles_text: &str) -> Result<Entry, SyncError> {
        let draft = EntryDraft {
            week_id: self.state.week_id.clone().unwrap_or_default(),
            person: self.state.person.clone().unwrap_or_default(),
            date: self.state.day,
            category: self.state.category.clone().unwrap_or_default(),
            miles: EntryDraft::parse_miles(miles_text),
        };
        self.add_entry(draft).await
    }

    /// Refetch everything regardless of cache age.
    pub async fn force_refresh(&mut self) {
        info!("Forced refresh");
        self.loader.load_bootstrap(&mut self.state, true).await;
        load_selected_detail(&self.loader, &mut self.state, true).await;
    }

    async fn reload_after_selection(&mut self) {
        self.loader.net(NetState::Loading);
        match load_selected_detail(&self.loader, &mut self.state, false).await {
            Some(LoadState::Failed) => {}
            _ => {
                self.loader.status("Ready.", Severity::Info);
                self.loader.net(NetState::Ready);
            }
        }
    }

    fn reject_invalid(
        &mut self,
        change: impl FnOnce(&mut TrackerState) -> Result<(), SyncError>,
    ) -> Result<(), SyncError> {
        change(&mut self.state).inspect_err(|e| self.loader.status(e.to_string(), Severity::Error))
    }
}

async fn load_selected_detail<T: Transport>(
    loader: &Loader<T>,
    state: &mut TrackerState,
    force: bool,
) -> Option<LoadState> {
    let (Some(week_id), Some(person)) = (state.week_id.clone(), state.person.clone()) else {
        debug!("No week/person selected, skipping detail load");
        return None;
    };
    Some(loader.load_week_detail(state, &week_id, &person, force).await)
}
