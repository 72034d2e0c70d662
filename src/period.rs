use chrono::{Datelike, Duration, Months, NaiveDate};

/// Largest value `week_of_month` can produce: a 31-day month whose 1st is a Saturday.
pub const MAX_WEEK_OF_MONTH: u8 = 6;

/// Number of week slots the week view shows for every month.
pub const WEEK_SLOTS: u8 = 4;

/// `YYYY-MM` key addressing one calendar month's task sequences.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// `YYYY-MM-DD` key addressing one calendar day's completion entry.
pub fn day_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// 1-based index of the Sunday-anchored week containing `date`.
///
/// The first week runs from the 1st up to the first Saturday, so it may be
/// shorter than seven days; every later week starts on a Sunday.
pub fn week_of_month(date: NaiveDate) -> u8 {
    let first_weekday = first_of_month(date).weekday().num_days_from_sunday();
    let first_week_days = 7 - first_weekday;
    let day = date.day();
    if day <= first_week_days {
        return 1;
    }
    ((day - first_week_days).div_ceil(7) + 1) as u8
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };
    match NaiveDate::from_ymd_opt(next_year, next_month, 1) {
        Some(first_next) => (first_next - Duration::days(1)).day(),
        None => 31,
    }
}

/// Every date of `date`'s month, 1st first.
pub fn month_days(date: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let first = first_of_month(date);
    let count = days_in_month(first.year(), first.month());
    (0..count).filter_map(move |offset| first.checked_add_signed(Duration::days(offset.into())))
}

/// Moves `date` by `months` calendar months, clamping the day to the target month's end.
pub fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Parses a `YYYY-MM` key into `(year, month)`.
pub fn parse_month_key(key: &str) -> Option<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{key}-01"), "%Y-%m-%d").ok()?;
    if month_key(date) != key {
        return None;
    }
    Some((date.year(), date.month()))
}

/// Parses a `YYYY-MM-DD` key, rejecting anything that does not format back to itself.
pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()?;
    (day_key(date) == key).then_some(date)
}
