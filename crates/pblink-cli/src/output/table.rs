use chrono::{DateTime, Local};
use comfy_table::Table;

pub fn print_table(table: Table) {
    println!("{table}");
}

/// Local wall-clock time for a millisecond timestamp.
pub fn format_ms(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|time| time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
