use chrono::{DateTime, NaiveDate, Utc};

/// Calendar day used for time-series buckets.
pub fn day_bucket(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.date_naive()
}

/// "YYYY-MM-DD" label of a bucket.
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}
