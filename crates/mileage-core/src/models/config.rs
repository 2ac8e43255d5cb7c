use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::serde_helpers::{first, parse_number};

/// Categories offered when the server does not send any.
const DEFAULT_CATEGORIES: [&str; 3] = ["Walk", "Bike", "Other"];

/// Global tracker configuration served by the backend.
///
/// Replaced wholesale on every successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub year: Option<i32>,
    pub goal_miles: Option<f64>,
    pub people: Vec<String>,
    pub categories: Vec<String>,
}

const GOAL_KEYS: &[&str] = &["goal", "annualGoal", "goalMiles"];

/// Collect non-empty unique names, keeping the first occurrence.
fn unique_names(value: Option<&Value>) -> Option<Vec<String>> {
    let Value::Array(items) = value? else {
        return None;
    };
    let mut names: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let name = match item {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    Some(names)
}

impl ConfigSnapshot {
    /// Normalise a server payload. Returns `None` when the payload is not an
    /// object at all.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(map) = value else {
            return None;
        };

        let categories = unique_names(first(&map, &["categories"]))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect());

        Some(Self {
            year: first(&map, &["year"]).and_then(parse_number).map(|y| y as i32),
            goal_miles: first(&map, GOAL_KEYS).and_then(parse_number),
            people: unique_names(first(&map, &["people"])).unwrap_or_default(),
            categories,
        })
    }

    pub fn has_person(&self, person: &str) -> bool {
        self.people.iter().any(|p| p == person)
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_basic() {
        let config = ConfigSnapshot::from_value(json!({
            "year": 2024,
            "goal": "1000",
            "people": ["Kai", "Lee"],
            "categories": ["Walk", "Bike"]
        }))
        .unwrap();
        assert_eq!(config.year, Some(2024));
        assert_eq!(config.goal_miles, Some(1000.0));
        assert_eq!(config.people, vec!["Kai", "Lee"]);
        assert_eq!(config.categories, vec!["Walk", "Bike"]);
    }

    #[test]
    fn test_from_value_dedupes_and_defaults_categories() {
        let config = ConfigSnapshot::from_value(json!({
            "people": ["Kai", " Kai ", "", "Lee", "Kai"]
        }))
        .unwrap();
        assert_eq!(config.people, vec!["Kai", "Lee"]);
        assert_eq!(config.categories, vec!["Walk", "Bike", "Other"]);
        assert!(config.has_category("Bike"));
        assert!(!config.has_person("Sam"));
    }

    #[test]
    fn test_from_value_with_both_goal_names_keeps_people() {
        let config = ConfigSnapshot::from_value(json!({
            "goal": 1000,
            "annualGoal": 1200,
            "people": ["Kai", "Lee"]
        }))
        .unwrap();
        assert_eq!(config.people, vec!["Kai", "Lee"]);
        assert_eq!(config.goal_miles, Some(1000.0));
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        assert!(ConfigSnapshot::from_value(json!("<html>oops</html>")).is_none());
        assert!(ConfigSnapshot::from_value(json!(null)).is_none());
    }

    #[test]
    fn test_cached_shape_reloads_identically() {
        let config = ConfigSnapshot {
            year: Some(2024),
            goal_miles: Some(500.0),
            people: vec!["Kai".into()],
            categories: vec!["Walk".into()],
        };
        let reloaded = ConfigSnapshot::from_value(serde_json::to_value(&config).unwrap()).unwrap();
        assert_eq!(reloaded, config);
    }
}
