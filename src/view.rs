use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::WorklistError;
use crate::models::TaskCollection;
use crate::period::shift_months;
use crate::stats::{compute_stats, Stats};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    #[default]
    Day,
    Week,
    Month,
    Overview,
}

impl ViewKind {
    pub const ALL: [ViewKind; 4] = [
        ViewKind::Day,
        ViewKind::Week,
        ViewKind::Month,
        ViewKind::Overview,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::Day => "day",
            ViewKind::Week => "week",
            ViewKind::Month => "month",
            ViewKind::Overview => "overview",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = WorklistError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(ViewKind::Day),
            "week" => Ok(ViewKind::Week),
            "month" => Ok(ViewKind::Month),
            "overview" => Ok(ViewKind::Overview),
            other => Err(WorklistError::validation(format!("unknown view: {other}"))),
        }
    }
}

/// The period the panel is showing: which view, anchored at which date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewCursor {
    pub view: ViewKind,
    pub date: NaiveDate,
}

impl ViewCursor {
    pub fn new(view: ViewKind, date: NaiveDate) -> Self {
        Self { view, date }
    }

    pub fn switch_view(&mut self, view: ViewKind) {
        self.view = view;
    }

    /// Steps one period forward (`direction > 0`) or back (`direction < 0`).
    ///
    /// Day view moves by days; week and month views move by calendar months
    /// because both list a whole month. The overview has no period.
    pub fn navigate(&mut self, direction: i32) {
        self.date = match self.view {
            ViewKind::Day => self
                .date
                .checked_add_signed(Duration::days(direction.into()))
                .unwrap_or(self.date),
            ViewKind::Week | ViewKind::Month => shift_months(self.date, direction),
            ViewKind::Overview => self.date,
        };
    }

    pub fn stats(&self, collection: &TaskCollection) -> Stats {
        compute_stats(self.view, collection, self.date)
    }
}
