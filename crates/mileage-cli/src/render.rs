//! Plain-text output of tracker state.

use mileage_core::loader::{Severity, StatusMessage};
use mileage_core::utils::{format_day_label, format_miles};
use mileage_core::{LoadState, TrackerState};

pub fn print_week(state: &TrackerState) {
    let Some(week) = state.selected_week() else {
        println!("No week selected.");
        return;
    };
    let person = state.person.as_deref().unwrap_or("-");
    println!("{}  |  {}", person, week.label());

    let Some(detail) = state.selected_detail() else {
        println!("  (no entries loaded)");
        return;
    };

    let entries = detail.entries_newest_first();
    if entries.is_empty() {
        println!("  No entries yet.");
    }
    for entry in entries {
        println!(
            "  {:<12} {:<10} {:>8} mi{}",
            format_day_label(entry.date),
            entry.category,
            format_miles(entry.miles),
            if entry.is_local() { "  (pending)" } else { "" }
        );
    }

    println!();
    println!("  Week total: {} mi", format_miles(detail.week_total()));
    if let Some(day) = state.day {
        println!(
            "  {}: {} mi",
            format_day_label(day),
            format_miles(detail.day_total(day))
        );
    }
    if let Some(goal) = state.config.as_ref().and_then(|c| c.goal_miles) {
        println!("  Annual goal: {} mi", format_miles(goal));
    }
    if state.detail_state == LoadState::CachedOnly {
        println!("  (cached data)");
    }
}

pub fn print_weeks(state: &TrackerState) {
    if state.weeks.is_empty() {
        println!("No weeks loaded.");
        return;
    }
    let selected = state.week_id.as_deref();
    for (id, label) in state.week_options() {
        let marker = if Some(id.as_str()) == selected { '*' } else { ' ' };
        println!("{} {:<10} {}", marker, id, label);
    }
}

pub fn print_status(status: &StatusMessage) {
    match status.severity {
        Severity::Info => eprintln!("{}", status.text),
        Severity::Warning => eprintln!("warning: {}", status.text),
        Severity::Error => eprintln!("error: {}", status.text),
    }
}
