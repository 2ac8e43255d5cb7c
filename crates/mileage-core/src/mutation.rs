//! Optimistic entry creation.
//!
//! The new entry is shown before the write is sent. A successful write is
//! followed by a forced refetch of the week so the server's record replaces
//! the local one; a failed write removes exactly that entry again.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::api::{SyncError, Transport};
use crate::loader::{Loader, NetState, Severity, Update};
use crate::models::Entry;
use crate::state::TrackerState;

pub const MISSING_SELECTION: &str = "Missing selection (person/week/day/category).";
pub const INVALID_MILES: &str = "Enter a valid miles number (e.g., 2.5).";

/// User input for a new entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub week_id: String,
    pub person: String,
    pub date: Option<NaiveDate>,
    pub category: String,
    pub miles: f64,
}

impl EntryDraft {
    /// Parse the miles text field. Unparsable text yields NaN, which
    /// validation rejects.
    pub fn parse_miles(text: &str) -> f64 {
        text.trim().parse::<f64>().unwrap_or(f64::NAN)
    }

    /// Check the draft against the loaded config and week index.
    /// Nothing is changed when this fails.
    pub fn validate(&self, state: &TrackerState) -> Result<NaiveDate, SyncError> {
        let date = match self.date {
            Some(date)
                if !self.week_id.trim().is_empty()
                    && !self.person.trim().is_empty()
                    && !self.category.trim().is_empty() =>
            {
                date
            }
            _ => return Err(SyncError::validation(MISSING_SELECTION)),
        };

        if !self.miles.is_finite() || self.miles <= 0.0 {
            return Err(SyncError::validation(INVALID_MILES));
        }

        if let Some(config) = &state.config {
            if !config.has_category(&self.category) {
                return Err(SyncError::validation(format!("Unknown category: {}", self.category)));
            }
        }

        if let Some(week) = state.find_week(&self.week_id) {
            if !week.contains(date) {
                return Err(SyncError::validation(format!(
                    "{} is not in week {}",
                    date, self.week_id
                )));
            }
        }

        Ok(date)
    }
}

/// Add an entry optimistically and reconcile with the server.
///
/// Returns the locally synthesized entry on success. On failure the held
/// week detail is exactly what it was before the call, including a detail
/// for another week or person that the optimistic entry displaced.
pub async fn add_entry<T: Transport>(
    loader: &Loader<T>,
    state: &mut TrackerState,
    draft: EntryDraft,
) -> Result<Entry, SyncError> {
    let date = match draft.validate(state) {
        Ok(date) => date,
        Err(e) => {
            loader.status(e.to_string(), Severity::Error);
            return Err(e);
        }
    };

    loader.status("Adding entry…", Severity::Info);

    let entry = Entry::new_local(&draft.week_id, &draft.person, date, &draft.category, draft.miles);
    // Only one detail is held; keep the one this entry's shell replaces
    let displaced = match &state.detail {
        Some(held) if held.week_id != draft.week_id || held.person != draft.person => {
            Some((held.clone(), state.detail_state))
        }
        _ => None,
    };
    let detail = state.ensure_detail(&draft.week_id, &draft.person);
    detail.entries.push(entry.clone());
    loader.notify(Update::WeekDetail(detail.clone()));

    match loader.api().append_entry(&entry).await {
        Ok(_) => {
            info!(id = %entry.id, week = %entry.week_id, person = %entry.person, miles = entry.miles, "Entry added");
            loader
                .load_week_detail(state, &draft.week_id, &draft.person, true)
                .await;
            loader.status("Entry added.", Severity::Info);
            loader.net(NetState::Synced);
            Ok(entry)
        }
        Err(e) => {
            warn!(id = %entry.id, error = %e, "Entry write failed, rolling back");
            match displaced {
                Some((held, held_state)) => {
                    loader.notify(Update::WeekDetail(held.clone()));
                    state.apply_detail(held, held_state);
                }
                None => {
                    state.remove_entry(&entry.id);
                    if let Some(detail) = state.detail_for(&draft.week_id, &draft.person) {
                        loader.notify(Update::WeekDetail(detail.clone()));
                    }
                }
            }
            loader.status(format!("Add failed: {}", e), Severity::Error);
            loader.net(NetState::Failed);
            Err(e)
        }
    }
}
