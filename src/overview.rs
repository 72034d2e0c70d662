use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{TaskCollection, TaskId};
use crate::period::{day_key, first_of_month, month_days, month_key, shift_months, week_of_month};

/// Months shown by the monthly summary: the anchor month and the five before it.
pub const MONTHLY_SUMMARY_SPAN: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyMatrix {
    pub year: i32,
    pub month: u32,
    /// Day-of-month column headers, `1..=N`.
    pub days: Vec<u32>,
    pub rows: Vec<DailyMatrixRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyMatrixRow {
    pub id: TaskId,
    pub text: String,
    /// One cell per entry of `days`.
    pub completions: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklySnapshot {
    pub week: u8,
    pub rows: Vec<StatusRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub rows: Vec<StatusRow>,
}

/// Task x day grid of daily completions for `month_date`'s month.
pub fn daily_matrix(collection: &TaskCollection, month_date: NaiveDate) -> DailyMatrix {
    let day_keys: Vec<String> = month_days(month_date).map(day_key).collect();
    let rows = collection
        .daily_for(&month_key(month_date))
        .iter()
        .map(|task| DailyMatrixRow {
            id: task.id,
            text: task.text.clone(),
            completions: day_keys
                .iter()
                .map(|key| task.daily_completions.contains(key.as_str()))
                .collect(),
        })
        .collect();

    DailyMatrix {
        year: month_date.year(),
        month: month_date.month(),
        days: (1..=day_keys.len() as u32).collect(),
        rows,
    }
}

/// Status of each weekly task for the week containing `month_date`.
///
/// Uses the computed week-of-month, which can be 5 or 6 even though the
/// week view only offers slots 1 to 4.
pub fn weekly_current(collection: &TaskCollection, month_date: NaiveDate) -> WeeklySnapshot {
    let week = week_of_month(month_date);
    let rows = collection
        .weekly_for(&month_key(month_date))
        .iter()
        .map(|task| StatusRow {
            id: task.id,
            text: task.text.clone(),
            completed: task.weekly_completions.contains(&week),
        })
        .collect();
    WeeklySnapshot { week, rows }
}

/// Monthly task status for `anchor`'s month and the `span - 1` months before it,
/// anchor month first.
pub fn monthly_summary(
    collection: &TaskCollection,
    anchor: NaiveDate,
    span: u32,
) -> Vec<MonthSummary> {
    let anchor = first_of_month(anchor);
    (0..span)
        .map(|offset| {
            let month_date = shift_months(anchor, -(offset as i32));
            let rows = collection
                .monthly_for(&month_key(month_date))
                .iter()
                .map(|task| StatusRow {
                    id: task.id,
                    text: task.text.clone(),
                    completed: task.completed,
                })
                .collect();
            MonthSummary {
                year: month_date.year(),
                month: month_date.month(),
                rows,
            }
        })
        .collect()
}
