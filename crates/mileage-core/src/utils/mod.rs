//! Utility functions for formatting values for display.

pub mod format;

pub use format::{format_day_label, format_miles, format_short_date};
