use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::entry::Entry;
use super::serde_helpers::{date_field, first, parse_number, text};
use crate::utils::format_short_date;

/// Number of days in a tracked week.
pub const DAYS_PER_WEEK: u64 = 7;

/// One week of the tracked year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct WeekDescriptor {
    pub week_id: String,
    pub week_num: Option<u32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

const WEEK_ID_KEYS: &[&str] = &["weekId", "id"];
const WEEK_NUM_KEYS: &[&str] = &["weekNum", "num"];
const START_KEYS: &[&str] = &["startDate", "start", "weekStart"];
const END_KEYS: &[&str] = &["endDate", "end", "weekEnd"];
const ENTRIES_KEYS: &[&str] = &["entries", "data"];

impl WeekDescriptor {
    pub fn new(week_id: impl Into<String>, week_num: Option<u32>, start_date: NaiveDate) -> Self {
        Self {
            week_id: week_id.into(),
            week_num,
            start_date,
            end_date: start_date + Days::new(DAYS_PER_WEEK - 1),
        }
    }

    /// The seven calendar days of this week, starting at `start_date`.
    pub fn days(&self) -> Vec<NaiveDate> {
        (0..DAYS_PER_WEEK)
            .map(|offset| self.start_date + Days::new(offset))
            .collect()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days().contains(&date)
    }

    /// Display label, e.g. `W3 • Jan 15 – Jan 21`.
    pub fn label(&self) -> String {
        let name = match self.week_num {
            Some(n) => format!("W{}", n),
            None => self.week_id.clone(),
        };
        format!(
            "{} • {} – {}",
            name,
            format_short_date(self.start_date),
            format_short_date(self.end_date)
        )
    }

    /// Parse the week index payload. Items without an id or start date are
    /// skipped. Returns `None` when the payload is not an array.
    pub fn list_from_value(value: Value) -> Option<Vec<WeekDescriptor>> {
        let Value::Array(items) = value else {
            return None;
        };
        let weeks = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let Some(map) = item.as_object() else {
                    warn!(index, "Skipping malformed week descriptor");
                    return None;
                };
                let week_id = text(first(map, WEEK_ID_KEYS))?;
                let start = date_field(map, START_KEYS)?;
                let week_num = first(map, WEEK_NUM_KEYS)
                    .and_then(parse_number)
                    .map(|n| n as u32);
                let mut week = WeekDescriptor::new(week_id, week_num, start);
                if let Some(end) = date_field(map, END_KEYS) {
                    week.end_date = end;
                }
                Some(week)
            })
            .collect();
        Some(weeks)
    }
}

/// Check that weeks are seven days long and follow each other without gaps
/// or overlap. Returns one message per violation.
pub fn check_week_index(weeks: &[WeekDescriptor]) -> Vec<String> {
    let mut problems = Vec::new();
    for week in weeks {
        let span = (week.end_date - week.start_date).num_days();
        if span != (DAYS_PER_WEEK - 1) as i64 {
            problems.push(format!(
                "week {} spans {} days instead of {}",
                week.week_id,
                span + 1,
                DAYS_PER_WEEK
            ));
        }
    }
    for pair in weeks.windows(2) {
        let expected = pair[0].end_date + Days::new(1);
        if pair[1].start_date != expected {
            problems.push(format!(
                "week {} starts {} but previous week ends {}",
                pair[1].week_id, pair[1].start_date, pair[0].end_date
            ));
        }
    }
    problems
}

/// Entries of one person for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct WeekDetail {
    pub week_id: String,
    pub person: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub entries: Vec<Entry>,
}

impl WeekDetail {
    /// Empty shell for a week nobody has fetched yet.
    pub fn empty(week_id: &str, person: &str, bounds: Option<&WeekDescriptor>) -> Self {
        Self {
            week_id: week_id.to_string(),
            person: person.to_string(),
            start_date: bounds.map(|w| w.start_date),
            end_date: bounds.map(|w| w.end_date),
            entries: Vec::new(),
        }
    }

    /// Normalise a server payload for `(week_id, person)`.
    ///
    /// A bare array is accepted as the entry list. Entries that fail
    /// normalisation are dropped; duplicate ids keep their first occurrence.
    pub fn from_value(value: Value, week_id_hint: &str, person: &str) -> Option<Self> {
        let (items, start_date, end_date, week_id) = match value {
            Value::Array(items) => (items, None, None, None),
            Value::Object(map) => {
                let items = match first(&map, ENTRIES_KEYS) {
                    Some(Value::Array(items)) => items.clone(),
                    _ => Vec::new(),
                };
                (
                    items,
                    date_field(&map, START_KEYS),
                    date_field(&map, END_KEYS),
                    text(map.get("weekId")),
                )
            }
            _ => return None,
        };

        let week_id = week_id.unwrap_or_else(|| week_id_hint.to_string());
        let mut entries: Vec<Entry> = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            let Some(entry) = Entry::from_value(item, &week_id, person, index) else {
                continue;
            };
            if entries.iter().any(|e| e.id == entry.id) {
                warn!(id = %entry.id, "Dropping duplicate entry id");
                continue;
            }
            entries.push(entry);
        }

        Some(Self {
            week_id,
            person: person.to_string(),
            start_date,
            end_date,
            entries,
        })
    }

    pub fn week_total(&self) -> f64 {
        self.entries.iter().map(|e| e.miles).sum()
    }

    pub fn day_total(&self, day: NaiveDate) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.date == day)
            .map(|e| e.miles)
            .sum()
    }

    /// Entries sorted newest first by creation timestamp.
    pub fn entries_newest_first(&self) -> Vec<&Entry> {
        let mut sorted: Vec<&Entry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.ts.cmp(&a.ts));
        sorted
    }

    /// Entries not yet confirmed by the server.
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_local()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_are_seven_consecutive_dates() {
        let week = WeekDescriptor::new("2024-W01", Some(1), date(2024, 1, 1));
        let days = week.days();
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], date(2024, 1, 1));
        assert_eq!(days[6], date(2024, 1, 7));
        assert_eq!(week.end_date, date(2024, 1, 7));
        assert!(week.contains(date(2024, 1, 2)));
        assert!(!week.contains(date(2024, 1, 8)));
    }

    #[test]
    fn test_list_from_value_fills_end_and_skips_incomplete() {
        let weeks = WeekDescriptor::list_from_value(json!([
            {"weekId": "2024-W01", "weekNum": 1, "startDate": "2024-01-01T05:00:00.000Z"},
            {"weekId": "2024-W02", "weekNum": "2", "start": "2024-01-08", "end": "2024-01-14"},
            {"weekNum": 3, "startDate": "2024-01-15"},
            {"weekId": "2024-W04"}
        ]))
        .unwrap();
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].end_date, date(2024, 1, 7));
        assert_eq!(weeks[1].week_num, Some(2));
        assert!(check_week_index(&weeks).is_empty());
    }

    #[test]
    fn test_list_from_value_rejects_non_array() {
        assert!(WeekDescriptor::list_from_value(json!({"ok": true})).is_none());
    }

    #[test]
    fn test_check_week_index_reports_gap_and_span() {
        let mut short = WeekDescriptor::new("b", None, date(2024, 1, 9));
        short.end_date = date(2024, 1, 12);
        let weeks = vec![WeekDescriptor::new("a", None, date(2024, 1, 1)), short];
        let problems = check_week_index(&weeks);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("spans 4 days"));
        assert!(problems[1].contains("starts 2024-01-09"));
    }

    #[test]
    fn test_label() {
        let week = WeekDescriptor::new("2024-W03", Some(3), date(2024, 1, 15));
        assert_eq!(week.label(), "W3 • Jan 15 – Jan 21");
        let unnumbered = WeekDescriptor::new("2024-W03", None, date(2024, 1, 15));
        assert!(unnumbered.label().starts_with("2024-W03 • "));
    }

    #[test]
    fn test_week_detail_from_value_aliases_and_dedupe() {
        let detail = WeekDetail::from_value(
            json!({
                "weekStart": "2024-01-01",
                "weekEnd": "2024-01-07",
                "data": [
                    {"id": "e1", "date": "2024-01-02", "type": "Walk", "distance": 2},
                    {"id": "e1", "date": "2024-01-03", "type": "Walk", "distance": 9},
                    {"id": "e2", "dateISO": "2024-01-03", "category": "Bike", "miles": "1.5"},
                    {"id": "e3", "dateISO": "2024-01-03", "category": "Bike", "miles": 0}
                ]
            }),
            "2024-W01",
            "Kai",
        )
        .unwrap();
        assert_eq!(detail.week_id, "2024-W01");
        assert_eq!(detail.start_date, Some(date(2024, 1, 1)));
        assert_eq!(detail.entries.len(), 2);
        assert_eq!(detail.week_total(), 3.5);
        assert_eq!(detail.day_total(date(2024, 1, 3)), 1.5);
        assert_eq!(detail.day_total(date(2024, 1, 4)), 0.0);
    }

    #[test]
    fn test_week_detail_with_both_field_names_keeps_entries() {
        let detail = WeekDetail::from_value(
            json!({
                "weekId": "2024-W01",
                "startDate": "2024-01-01",
                "start": "2024-01-01",
                "endDate": "2024-01-07",
                "end": "2024-01-07",
                "entries": [{"id": "e1", "dateISO": "2024-01-02", "category": "Walk", "miles": 2}],
                "data": []
            }),
            "2024-W01",
            "Kai",
        )
        .unwrap();
        assert_eq!(detail.entries.len(), 1);
        assert_eq!(detail.start_date, Some(date(2024, 1, 1)));
        assert_eq!(detail.end_date, Some(date(2024, 1, 7)));
    }

    #[test]
    fn test_list_from_value_with_both_id_names() {
        let weeks = WeekDescriptor::list_from_value(json!([
            {"weekId": "2024-W01", "id": 17, "weekNum": 1, "num": 1,
             "startDate": "2024-01-01", "weekStart": "2023-12-25"}
        ]))
        .unwrap();
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].week_id, "2024-W01");
        assert_eq!(weeks[0].start_date, date(2024, 1, 1));
    }

    #[test]
    fn test_week_detail_from_bare_array() {
        let detail = WeekDetail::from_value(
            json!([{"dateISO": "2024-01-02", "category": "Walk", "miles": 1}]),
            "2024-W01",
            "Lee",
        )
        .unwrap();
        assert_eq!(detail.entries.len(), 1);
        assert_eq!(detail.entries[0].person, "Lee");
        assert_eq!(detail.entries[0].id, "2024-W01#0");
        assert!(WeekDetail::from_value(json!("nope"), "w", "p").is_none());
    }

    #[test]
    fn test_entries_newest_first() {
        let detail = WeekDetail::from_value(
            json!({"entries": [
                {"id": "old", "dateISO": "2024-01-02", "category": "Walk", "miles": 1, "ts": "2024-01-02T08:00:00Z"},
                {"id": "new", "dateISO": "2024-01-01", "category": "Walk", "miles": 1, "ts": "2024-01-03T08:00:00Z"}
            ]}),
            "2024-W01",
            "Kai",
        )
        .unwrap();
        let ids: Vec<&str> = detail.entries_newest_first().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(detail.pending_count(), 0);
    }
}
