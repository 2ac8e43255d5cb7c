//! Data-sync core of the weekly mileage tracker.
//!
//! - [`api`]: endpoint negotiation against a backend with an uncertain routing convention
//! - [`cache`]: timestamped local cache that never fails its callers
//! - [`loader`]: stale-while-revalidate loading with change notifications
//! - [`mutation`]: optimistic entry creation with rollback
//! - [`app`]: the [`Tracker`] coordinator owning the application state

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod loader;
pub mod models;
pub mod mutation;
pub mod state;
pub mod utils;

#[cfg(test)]
mod test_harness;

pub use api::SyncError;
pub use app::Tracker;
pub use config::Config;
pub use loader::{NetState, Severity, StatusMessage, Update};
pub use mutation::EntryDraft;
pub use state::{LoadState, TrackerState};
