use chrono::NaiveDate;

/// Format a mileage value with at most two decimals and no trailing zeros.
pub fn format_miles(miles: f64) -> String {
    let value = if miles.is_finite() { miles } else { 0.0 };
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Short month/day form, e.g. `Jan 5`.
pub fn format_short_date(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// Weekday plus short date, e.g. `Tue • Jan 2`.
pub fn format_day_label(date: NaiveDate) -> String {
    format!("{} • {}", date.format("%a"), format_short_date(date))
}
