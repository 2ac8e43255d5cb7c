//! Data models for the mileage tracker.
//!
//! - `ConfigSnapshot`: tracked year, goal, people and categories
//! - `WeekDescriptor`: one week of the year with its seven days
//! - `WeekDetail`: one person's entries for one week
//! - `Entry`: a single mileage record, possibly not yet confirmed
//!
//! Server payloads are normalised tolerantly; field aliases used by
//! different backend revisions are accepted.

pub mod config;
pub mod entry;
pub mod serde_helpers;
pub mod week;

pub use config::ConfigSnapshot;
pub use entry::{Entry, LOCAL_ID_PREFIX};
pub use week::{check_week_index, WeekDescriptor, WeekDetail, DAYS_PER_WEEK};
