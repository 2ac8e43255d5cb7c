//! Typed access to the four backend operations.

use serde_json::Value;
use tracing::{debug, warn};

use super::dispatcher::{Dispatcher, Payload};
use super::transport::{HttpTransport, Transport};
use super::SyncError;
use crate::models::{check_week_index, ConfigSnapshot, Entry, WeekDescriptor, WeekDetail};

// ===== Operation names =====

pub const OP_CONFIG: &str = "config";
pub const OP_WEEKS: &str = "weeks";
pub const OP_WEEK: &str = "week";
pub const OP_ENTRY: &str = "entry";

/// API client for the mileage backend.
///
/// Fetchers return `Ok(None)` when the call succeeded but carried no usable
/// data (empty body or an unexpected shape); callers keep what they have.
pub struct ApiClient<T = HttpTransport> {
    dispatcher: Dispatcher<T>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(dispatcher: Dispatcher<T>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    pub async fn warm_up(&self) {
        self.dispatcher.warm_up().await
    }

    /// Fetch the global configuration
    pub async fn fetch_config(&self) -> Result<Option<ConfigSnapshot>, SyncError> {
        let value = self.dispatcher.get(OP_CONFIG, Payload::none()).await?;
        let config = ConfigSnapshot::from_value(value);
        if config.is_none() {
            warn!("Config response carried no usable data");
        }
        Ok(config)
    }

    /// Fetch the week index for the tracked year
    pub async fn fetch_weeks(&self) -> Result<Option<Vec<WeekDescriptor>>, SyncError> {
        let value = self.dispatcher.get(OP_WEEKS, Payload::none()).await?;
        let weeks = WeekDescriptor::list_from_value(value);
        match &weeks {
            Some(list) => {
                debug!(count = list.len(), "Week index fetched");
                for problem in check_week_index(list) {
                    warn!(problem = %problem, "Week index is inconsistent");
                }
            }
            None => warn!("Week index response was not a list"),
        }
        Ok(weeks)
    }

    /// Fetch one person's entries for one week
    pub async fn fetch_week_detail(
        &self,
        week_id: &str,
        person: &str,
    ) -> Result<Option<WeekDetail>, SyncError> {
        let payload = Payload::query([("weekId", week_id), ("person", person)]);
        let value = self.dispatcher.get(OP_WEEK, payload).await?;
        let detail = WeekDetail::from_value(value, week_id, person);
        match &detail {
            Some(d) => debug!(week = week_id, person, entries = d.entries.len(), "Week detail fetched"),
            None => warn!(week = week_id, person, "Week detail response carried no usable data"),
        }
        Ok(detail)
    }

    /// Append a mileage entry
    pub async fn append_entry(&self, entry: &Entry) -> Result<Value, SyncError> {
        let body = serde_json::to_value(entry)
            .map_err(|e| SyncError::validation(format!("Entry could not be encoded: {e}")))?;
        self.dispatcher.post(OP_ENTRY, body).await
    }
}
