use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::serde_helpers::{date_field, first, parse_number, parse_timestamp, text};

/// Prefix of identifiers synthesized on this device before the server has
/// confirmed the entry.
pub const LOCAL_ID_PREFIX: &str = "local_";

/// A single mileage record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Entry {
    pub id: String,
    pub person: String,
    #[serde(rename = "weekId")]
    pub week_id: String,
    #[serde(rename = "dateISO")]
    pub date: NaiveDate,
    pub category: String,
    pub miles: f64,
    pub ts: DateTime<Utc>,
}

impl Entry {
    /// Create an unconfirmed entry with a fresh local identifier.
    pub fn new_local(
        week_id: &str,
        person: &str,
        date: NaiveDate,
        category: &str,
        miles: f64,
    ) -> Self {
        Self {
            id: format!("{}{:016x}", LOCAL_ID_PREFIX, rand::random::<u64>()),
            person: person.to_string(),
            week_id: week_id.to_string(),
            date,
            category: category.to_string(),
            miles,
            ts: Utc::now(),
        }
    }

    /// True until the entry has been replaced by the server's record.
    pub fn is_local(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }

    /// Normalise one server entry. `index` gives entries without an id a
    /// stable identifier within their week.
    pub fn from_value(value: Value, week_id: &str, person: &str, index: usize) -> Option<Self> {
        let Value::Object(map) = value else {
            warn!(week = week_id, index, "Dropping non-object entry");
            return None;
        };

        let Some(date) = date_field(&map, &["dateISO", "date", "day", "entryDate"]) else {
            warn!(week = week_id, index, "Dropping entry without a usable date");
            return None;
        };

        let miles = first(&map, &["miles", "distance"]).and_then(parse_number);
        let miles = match miles {
            Some(m) if m.is_finite() && m > 0.0 => m,
            _ => {
                warn!(week = week_id, index, "Dropping entry without positive miles");
                return None;
            }
        };

        Some(Self {
            id: text(first(&map, &["id", "entryId", "uuid"]))
                .unwrap_or_else(|| format!("{}#{}", week_id, index)),
            person: text(first(&map, &["person", "name"])).unwrap_or_else(|| person.to_string()),
            week_id: text(first(&map, &["weekId"])).unwrap_or_else(|| week_id.to_string()),
            date,
            category: text(first(&map, &["category", "type"])).unwrap_or_default(),
            miles,
            ts: first(&map, &["ts", "timestamp", "createdAt"])
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
        })
    }
}
