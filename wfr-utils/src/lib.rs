//! Shared utility functions for WFR crates.

/// Date utility functions
pub mod dates {
    use chrono::NaiveDate;

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
    }

    /// Long display form used for single-date window labels, e.g. "20-September-2024"
    pub fn format_label_date(date: &NaiveDate) -> String {
        date.format("%d-%B-%Y").to_string()
    }

    /// Display form for a window given by both bounds, e.g. "21-Aug-2024 to 20-Sep-2024"
    pub fn format_label_range(start: &NaiveDate, end: &NaiveDate) -> String {
        format!("{} to {}", start.format("%d-%b-%Y"), end.format("%d-%b-%Y"))
    }

}
