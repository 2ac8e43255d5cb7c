//! Application state owned by the tracker coordinator.
//!
//! Holds the loaded snapshots, the user's selection and the single in-memory
//! week detail. The loader and the mutation coordinator take it by `&mut`.

use chrono::NaiveDate;

use crate::api::SyncError;
use crate::models::{ConfigSnapshot, Entry, WeekDescriptor, WeekDetail};

/// Where a resource's current value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Unloaded,
    /// Served from the local cache; not confirmed by the server this session.
    CachedOnly,
    Fresh,
    /// Nothing cached and the fetch failed.
    Failed,
}

#[derive(Debug, Default)]
pub struct TrackerState {
    pub config: Option<ConfigSnapshot>,
    pub weeks: Vec<WeekDescriptor>,
    pub detail: Option<WeekDetail>,

    pub person: Option<String>,
    pub week_id: Option<String>,
    pub day: Option<NaiveDate>,
    pub category: Option<String>,

    pub config_state: LoadState,
    pub weeks_state: LoadState,
    pub detail_state: LoadState,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Snapshots =====

    /// Replace the config and repair the person/category selection.
    pub fn apply_config(&mut self, config: ConfigSnapshot, load_state: LoadState) {
        if !self.person.as_deref().is_some_and(|p| config.has_person(p)) {
            self.person = config.people.first().cloned();
        }
        if !self.category.as_deref().is_some_and(|c| config.has_category(c)) {
            self.category = config.categories.first().cloned();
        }
        self.config = Some(config);
        self.config_state = load_state;
    }

    /// Replace the week index and repair the week/day selection.
    pub fn apply_weeks(&mut self, weeks: Vec<WeekDescriptor>, load_state: LoadState) {
        let still_listed = self
            .week_id
            .as_deref()
            .is_some_and(|id| weeks.iter().any(|w| w.week_id == id));
        if !still_listed {
            self.week_id = weeks.first().map(|w| w.week_id.clone());
        }
        self.weeks = weeks;
        self.weeks_state = load_state;
        self.sync_day();
    }

    /// Hold `detail` as the one in-memory week detail.
    pub fn apply_detail(&mut self, detail: WeekDetail, load_state: LoadState) {
        self.detail = Some(detail);
        self.detail_state = load_state;
    }

    pub fn mark_config(&mut self, load_state: LoadState) {
        self.config_state = load_state;
    }

    pub fn mark_weeks(&mut self, load_state: LoadState) {
        self.weeks_state = load_state;
    }

    pub fn mark_detail(&mut self, load_state: LoadState) {
        self.detail_state = load_state;
    }

    // ===== Selection =====

    pub fn selected_week(&self) -> Option<&WeekDescriptor> {
        let id = self.week_id.as_deref()?;
        self.find_week(id)
    }

    pub fn find_week(&self, week_id: &str) -> Option<&WeekDescriptor> {
        self.weeks.iter().find(|w| w.week_id == week_id)
    }

    /// The detail for the current (week, person) selection, if held.
    pub fn selected_detail(&self) -> Option<&WeekDetail> {
        let week_id = self.week_id.as_deref()?;
        let person = self.person.as_deref()?;
        self.detail_for(week_id, person)
    }

    pub fn detail_for(&self, week_id: &str, person: &str) -> Option<&WeekDetail> {
        self.detail
            .as_ref()
            .filter(|d| d.week_id == week_id && d.person == person)
    }

    pub fn select_person(&mut self, person: &str) -> Result<(), SyncError> {
        let person = person.trim();
        if person.is_empty() {
            return Err(SyncError::validation("No person selected"));
        }
        if let Some(config) = &self.config {
            if !config.has_person(person) {
                return Err(SyncError::validation(format!("Unknown person: {}", person)));
            }
        }
        self.person = Some(person.to_string());
        self.discard_other_detail();
        Ok(())
    }

    pub fn select_week(&mut self, week_id: &str) -> Result<(), SyncError> {
        if self.find_week(week_id).is_none() {
            return Err(SyncError::validation(format!("Unknown week: {}", week_id)));
        }
        self.week_id = Some(week_id.to_string());
        self.sync_day();
        self.discard_other_detail();
        Ok(())
    }

    /// Select a day. It must be one of the selected week's seven days.
    pub fn select_day(&mut self, day: NaiveDate) -> Result<(), SyncError> {
        match self.selected_week() {
            Some(week) if week.contains(day) => {
                self.day = Some(day);
                Ok(())
            }
            Some(week) => Err(SyncError::validation(format!(
                "{} is not in week {}",
                day, week.week_id
            ))),
            None => Err(SyncError::validation("No week selected")),
        }
    }

    pub fn select_category(&mut self, category: &str) -> Result<(), SyncError> {
        if let Some(config) = &self.config {
            if !config.has_category(category) {
                return Err(SyncError::validation(format!("Unknown category: {}", category)));
            }
        }
        self.category = Some(category.to_string());
        Ok(())
    }

    /// Keep the selected day inside the selected week; default to its first day.
    pub fn sync_day(&mut self) {
        let Some(week) = self.selected_week() else {
            self.day = None;
            return;
        };
        let keep = self.day.is_some_and(|d| week.contains(d));
        if !keep {
            self.day = Some(week.start_date);
        }
    }

    fn discard_other_detail(&mut self) {
        if self.selected_detail().is_none() && self.detail.is_some() {
            self.detail = None;
            self.detail_state = LoadState::Unloaded;
        }
    }

    // ===== Optimistic edits =====

    /// Make sure a detail for (week, person) is held, creating an empty shell
    /// from the known week bounds if needed.
    pub fn ensure_detail(&mut self, week_id: &str, person: &str) -> &mut WeekDetail {
        if self.detail_for(week_id, person).is_none() {
            let shell = WeekDetail::empty(week_id, person, self.find_week(week_id));
            self.detail = Some(shell);
            self.detail_state = LoadState::Unloaded;
        }
        self.detail.get_or_insert_with(|| WeekDetail::empty(week_id, person, None))
    }

    /// Remove one entry by id from the held detail. Returns whether it was found.
    pub fn remove_entry(&mut self, entry_id: &str) -> bool {
        let Some(detail) = self.detail.as_mut() else {
            return false;
        };
        let before = detail.entries.len();
        detail.entries.retain(|e| e.id != entry_id);
        detail.entries.len() != before
    }

    // ===== Option lists =====

    pub fn people(&self) -> &[String] {
        self.config.as_ref().map(|c| c.people.as_slice()).unwrap_or(&[])
    }

    pub fn categories(&self) -> &[String] {
        self.config.as_ref().map(|c| c.categories.as_slice()).unwrap_or(&[])
    }

    /// `(week id, label)` pairs in index order.
    pub fn week_options(&self) -> Vec<(String, String)> {
        self.weeks.iter().map(|w| (w.week_id.clone(), w.label())).collect()
    }

    pub fn day_options(&self) -> Vec<NaiveDate> {
        self.selected_week().map(|w| w.days()).unwrap_or_default()
    }

    pub fn selected_entries(&self) -> Vec<&Entry> {
        self.selected_detail()
            .map(|d| d.entries_newest_first())
            .unwrap_or_default()
    }
}
