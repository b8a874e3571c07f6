use chrono::NaiveDate;

/// Human readable post date, e.g. "April 05, 2024"
pub fn format_post_date(date: &NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
