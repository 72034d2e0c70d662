use chrono::NaiveDate;
use serde::Serialize;

use crate::models::TaskCollection;
use crate::period::{day_key, month_key, WEEK_SLOTS};
use crate::view::ViewKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    /// Whole percent, rounded half-up; 0 when `total` is 0.
    pub rate: u32,
}

impl Stats {
    pub fn new(total: usize, completed: usize) -> Self {
        Self {
            total,
            completed,
            rate: completion_rate(completed, total),
        }
    }
}

pub fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    // floor(100 * c / t + 1/2) without floats.
    ((200 * completed as u64 + total as u64) / (2 * total as u64)) as u32
}

/// Aggregate counts for `view` at `reference`.
///
/// Day, week and month views count the slots they display. The overview
/// counts only recorded completions for daily and weekly tasks, so its
/// totals are not the sum of the per-view totals.
pub fn compute_stats(view: ViewKind, collection: &TaskCollection, reference: NaiveDate) -> Stats {
    let month = month_key(reference);
    match view {
        ViewKind::Day => {
            let day = day_key(reference);
            let tasks = collection.daily_for(&month);
            let completed = tasks
                .iter()
                .filter(|task| task.daily_completions.contains(day.as_str()))
                .count();
            Stats::new(tasks.len(), completed)
        }
        ViewKind::Week => {
            let tasks = collection.weekly_for(&month);
            let completed = tasks
                .iter()
                .map(|task| {
                    (1..=WEEK_SLOTS)
                        .filter(|slot| task.weekly_completions.contains(slot))
                        .count()
                })
                .sum();
            Stats::new(tasks.len() * WEEK_SLOTS as usize, completed)
        }
        ViewKind::Month => {
            let tasks = collection.monthly_for(&month);
            let completed = tasks.iter().filter(|task| task.completed).count();
            Stats::new(tasks.len(), completed)
        }
        ViewKind::Overview => overview_stats(collection),
    }
}

fn overview_stats(collection: &TaskCollection) -> Stats {
    let daily: usize = collection
        .daily
        .values()
        .flatten()
        .map(|task| task.daily_completions.len())
        .sum();
    let weekly: usize = collection
        .weekly
        .values()
        .flatten()
        .map(|task| task.weekly_completions.len())
        .sum();
    let monthly_total: usize = collection.monthly.values().map(Vec::len).sum();
    let monthly_completed = collection
        .monthly
        .values()
        .flatten()
        .filter(|task| task.completed)
        .count();

    Stats::new(
        daily + weekly + monthly_total,
        daily + weekly + monthly_completed,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyTask, MonthlyTask, WeeklyTask};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> TaskCollection {
        let mut collection = TaskCollection::default();
        collection.daily.insert(
            "2024-01".to_string(),
            vec![
                DailyTask {
                    id: 1,
                    text: "Exercise".to_string(),
                    created_at: String::new(),
                    daily_completions: ["2024-01-15", "2024-01-16"]
                        .into_iter()
                        .map(String::from)
                        .collect(),
                },
                DailyTask {
                    id: 2,
                    text: "Read".to_string(),
                    created_at: String::new(),
                    daily_completions: Default::default(),
                },
            ],
        );
        collection.weekly.insert(
            "2024-01".to_string(),
            vec![WeeklyTask {
                id: 3,
                text: "Review".to_string(),
                created_at: String::new(),
                weekly_completions: [1u8, 3, 5].into_iter().collect(),
            }],
        );
        collection.monthly.insert(
            "2024-01".to_string(),
            vec![
                MonthlyTask {
                    id: 4,
                    text: "Budget".to_string(),
                    created_at: String::new(),
                    completed: true,
                },
                MonthlyTask {
                    id: 5,
                    text: "Taxes".to_string(),
                    created_at: String::new(),
                    completed: false,
                },
            ],
        );
        collection.monthly.insert(
            "2023-12".to_string(),
            vec![MonthlyTask {
                id: 6,
                text: "Gifts".to_string(),
                created_at: String::new(),
                completed: true,
            }],
        );
        collection
    }

    #[test]
    fn day_view_counts_tasks_done_on_the_reference_day() {
        let stats = compute_stats(ViewKind::Day, &sample(), date(2024, 1, 15));
        assert_eq!((stats.total, stats.completed, stats.rate), (2, 1, 50));

        let stats = compute_stats(ViewKind::Day, &sample(), date(2024, 1, 20));
        assert_eq!((stats.total, stats.completed, stats.rate), (2, 0, 0));
    }

    #[test]
    fn week_view_counts_four_fixed_slots_per_task() {
        // Week 5 is recorded but falls outside the four displayed slots.
        let stats = compute_stats(ViewKind::Week, &sample(), date(2024, 1, 2));
        assert_eq!((stats.total, stats.completed, stats.rate), (4, 2, 50));
    }

    #[test]
    fn month_view_counts_completed_flags() {
        let stats = compute_stats(ViewKind::Month, &sample(), date(2024, 1, 31));
        assert_eq!((stats.total, stats.completed, stats.rate), (2, 1, 50));
    }

    #[test]
    fn overview_counts_recorded_completions_across_all_months() {
        let stats = compute_stats(ViewKind::Overview, &sample(), date(2030, 6, 1));
        // daily: 2 recorded, weekly: 3 recorded, monthly: 3 tasks with 2 done.
        assert_eq!(stats.total, 8);
        assert_eq!(stats.completed, 7);
        assert_eq!(stats.rate, 88);
    }

    #[test]
    fn empty_collection_never_divides_by_zero() {
        for view in ViewKind::ALL {
            let stats = compute_stats(view, &TaskCollection::default(), date(2024, 1, 1));
            assert_eq!(stats, Stats::default());
        }
    }

    #[test]
    fn completion_rate_rounds_half_up() {
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 8), 13);
        assert_eq!(completion_rate(1, 200), 1);
        assert_eq!(completion_rate(5, 5), 100);
        assert_eq!(completion_rate(0, 0), 0);
    }
}
