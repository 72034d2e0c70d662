use std::path::Path;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};

use crate::error::WorklistError;
use crate::models::TaskCollection;
use crate::overview::daily_matrix;

pub const BYTE_ORDER_MARK: char = '\u{feff}';
pub const COMPLETION_MARK: &str = "\u{2713}";
pub const EMPTY_MONTH_PLACEHOLDER: &str = "No daily tasks this month";

/// Daily completion table for `month_date`'s month, stamped with the local time.
pub fn to_delimited_text(collection: &TaskCollection, month_date: NaiveDate) -> String {
    to_delimited_text_at(collection, month_date, Local::now().naive_local())
}

/// Renders the daily tasks of one month as a BOM-prefixed comma-separated table:
/// a title, an export timestamp, a blank line, then a `Task,1,2,...,N` header
/// and one row per task with a check mark on completed days.
pub fn to_delimited_text_at(
    collection: &TaskCollection,
    month_date: NaiveDate,
    exported_at: NaiveDateTime,
) -> String {
    let matrix = daily_matrix(collection, month_date);

    let mut out = String::new();
    out.push(BYTE_ORDER_MARK);
    out.push_str(&format!(
        "Worklist - daily tasks for {:04}-{:02}\n",
        month_date.year(),
        month_date.month()
    ));
    out.push_str(&format!(
        "Exported at: {}\n\n",
        exported_at.format("%Y-%m-%d %H:%M:%S")
    ));

    if matrix.rows.is_empty() {
        out.push_str(EMPTY_MONTH_PLACEHOLDER);
        out.push('\n');
        return out;
    }

    out.push_str("Task");
    for day in &matrix.days {
        out.push(',');
        out.push_str(&day.to_string());
    }
    out.push('\n');

    for row in &matrix.rows {
        out.push_str(&csv_escape(&row.text));
        for done in &row.completions {
            out.push(',');
            if *done {
                out.push_str(COMPLETION_MARK);
            }
        }
        out.push('\n');
    }
    out
}

fn csv_escape(value: &str) -> String {
    // Minimal CSV escaping: wrap in quotes and double any existing quotes.
    let escaped = value.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

/// Delimited-text files cannot be imported; this is the error reported for them.
pub fn delimited_text_import_error(path: &Path) -> WorklistError {
    WorklistError::UnsupportedFormat(format!(
        "{} is a delimited-text export, import a JSON export instead",
        path.display()
    ))
}

/// Whether a file should be routed to the delimited-text importer.
pub fn is_delimited_text_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}
