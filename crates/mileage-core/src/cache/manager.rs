use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::{FileStore, KeyValueStore, MemoryStore};
use crate::models::{ConfigSnapshot, WeekDescriptor, WeekDetail};

const CONFIG_KEY: &str = "mt_cache_config_v1";
const WEEKS_KEY: &str = "mt_cache_weeks_v1";
const WEEK_DETAILS_PREFIX: &str = "mt_cache_week_details_v1_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    /// Time since the record was written. Clock skew reads as zero.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.cached_at).to_std().unwrap_or_default()
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn is_fresh(&self, threshold: Duration) -> bool {
        self.age() < threshold
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            let remaining_mins = minutes % 60;
            if remaining_mins >= 30 {
                // Round up: 1h 30m+ becomes 2h
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            let remaining_hours = (minutes % 1440) / 60;
            if remaining_hours >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Typed access to the local cache.
///
/// Every failure (unavailable storage, quota, corrupt record) is logged and
/// treated as a cache miss. Callers never see a cache error.
pub struct CacheManager {
    store: Box<dyn KeyValueStore>,
}

impl CacheManager {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// File-backed cache, falling back to memory when the directory cannot
    /// be created.
    pub fn open(cache_dir: PathBuf) -> Self {
        match FileStore::new(cache_dir) {
            Ok(store) => Self::new(Box::new(store)),
            Err(e) => {
                warn!(error = %e, "Cache directory unavailable, caching in memory only");
                Self::in_memory()
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    fn week_detail_key(week_id: &str, person: &str) -> String {
        format!("{}{}_{}", WEEK_DETAILS_PREFIX, week_id, person)
    }

    fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CachedData<T>>> {
        let Some(contents) = self.store.get(key)? else {
            return Ok(None);
        };
        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache record: {}", key))?;
        Ok(Some(cached))
    }

    fn try_save<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let contents = serde_json::to_string(&cached)?;
        self.store.set(key, &contents)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        match self.try_load(key) {
            Ok(cached) => cached,
            Err(e) => {
                debug!(cache = key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    fn save<T: Serialize>(&self, key: &str, data: &T) {
        if let Err(e) = self.try_save(key, data) {
            debug!(cache = key, error = %e, "Cache write failed, ignoring");
        }
    }

    // ===== Config =====

    pub fn load_config(&self) -> Option<CachedData<ConfigSnapshot>> {
        self.load(CONFIG_KEY)
    }

    pub fn save_config(&self, config: &ConfigSnapshot) {
        self.save(CONFIG_KEY, config)
    }

    // ===== Week index =====

    pub fn load_weeks(&self) -> Option<CachedData<Vec<WeekDescriptor>>> {
        self.load(WEEKS_KEY)
    }

    pub fn save_weeks(&self, weeks: &[WeekDescriptor]) {
        self.save(WEEKS_KEY, &weeks)
    }

    // ===== Week detail, per (week, person) =====

    pub fn load_week_detail(&self, week_id: &str, person: &str) -> Option<CachedData<WeekDetail>> {
        let cached: Option<CachedData<WeekDetail>> =
            self.load(&Self::week_detail_key(week_id, person));
        // Never serve another person's or week's record, whatever the key says.
        cached.filter(|c| c.data.week_id == week_id && c.data.person == person)
    }

    pub fn save_week_detail(&self, detail: &WeekDetail) {
        self.save(&Self::week_detail_key(&detail.week_id, &detail.person), detail)
    }

    pub fn remove_week_detail(&self, week_id: &str, person: &str) {
        if let Err(e) = self.store.remove(&Self::week_detail_key(week_id, person)) {
            debug!(week = week_id, person, error = %e, "Cache remove failed, ignoring");
        }
    }
}
