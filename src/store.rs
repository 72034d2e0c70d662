use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::error::WorklistError;
use crate::models::{
    CompletionSet, DailyTask, MonthKey, MonthlyTask, Task, TaskCollection, TaskId, TaskKind,
    TaskRecord, WeeklyTask,
};
use crate::period::{self, month_key, MAX_WEEK_OF_MONTH};

/// In-memory owner of every task. All mutation goes through here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: TaskCollection,
}

impl TaskStore {
    pub fn new(tasks: TaskCollection) -> Self {
        Self { tasks }
    }

    pub fn collection(&self) -> &TaskCollection {
        &self.tasks
    }

    pub fn into_collection(self) -> TaskCollection {
        self.tasks
    }

    pub fn add_task(
        &mut self,
        kind: TaskKind,
        period_date: NaiveDate,
        text: &str,
    ) -> Result<Task, WorklistError> {
        self.add_task_at(kind, period_date, text, Utc::now())
    }

    /// Appends a task to the sequence for `period_date`'s month, stamped with `now`.
    pub fn add_task_at(
        &mut self,
        kind: TaskKind,
        period_date: NaiveDate,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Task, WorklistError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(WorklistError::validation("task text must not be empty"));
        }
        let month = month_key(period_date);
        let created_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let millis = now.timestamp_millis();
        let text = text.to_string();

        let task = match kind {
            TaskKind::Daily => {
                let tasks = self.tasks.daily.entry(month).or_default();
                let task = DailyTask {
                    id: next_id(tasks, millis),
                    text,
                    created_at,
                    daily_completions: CompletionSet::new(),
                };
                tasks.push(task.clone());
                Task::Daily(task)
            }
            TaskKind::Weekly => {
                let tasks = self.tasks.weekly.entry(month).or_default();
                let task = WeeklyTask {
                    id: next_id(tasks, millis),
                    text,
                    created_at,
                    weekly_completions: CompletionSet::new(),
                };
                tasks.push(task.clone());
                Task::Weekly(task)
            }
            TaskKind::Monthly => {
                let tasks = self.tasks.monthly.entry(month).or_default();
                let task = MonthlyTask {
                    id: next_id(tasks, millis),
                    text,
                    created_at,
                    completed: false,
                };
                tasks.push(task.clone());
                Task::Monthly(task)
            }
        };
        Ok(task)
    }

    /// Flips `day_key` for a daily task; returns the new completion state.
    pub fn toggle_daily_completion(
        &mut self,
        month_key: &str,
        task_id: TaskId,
        day_key: &str,
    ) -> Result<bool, WorklistError> {
        let in_month = period::parse_day_key(day_key)
            .is_some_and(|date| period::month_key(date) == month_key);
        if !in_month {
            return Err(WorklistError::validation(format!(
                "day {day_key:?} is not in month {month_key}"
            )));
        }
        let task = find_mut(&mut self.tasks.daily, month_key, task_id)?;
        Ok(task.daily_completions.toggle(day_key.to_string()))
    }

    /// Flips week slot `week` for a weekly task; returns the new completion state.
    pub fn toggle_weekly_completion(
        &mut self,
        month_key: &str,
        task_id: TaskId,
        week: u8,
    ) -> Result<bool, WorklistError> {
        if !(1..=MAX_WEEK_OF_MONTH).contains(&week) {
            return Err(WorklistError::validation(format!(
                "week {week} is outside 1..={MAX_WEEK_OF_MONTH}"
            )));
        }
        let task = find_mut(&mut self.tasks.weekly, month_key, task_id)?;
        Ok(task.weekly_completions.toggle(week))
    }

    /// Flips the `completed` flag of a monthly task; returns the new state.
    pub fn toggle_monthly_completion(
        &mut self,
        month_key: &str,
        task_id: TaskId,
    ) -> Result<bool, WorklistError> {
        let task = find_mut(&mut self.tasks.monthly, month_key, task_id)?;
        task.completed = !task.completed;
        Ok(task.completed)
    }

    /// Removes a task from its month's sequence.
    ///
    /// Weekly tasks live in one flat sequence per month; `_week` is accepted
    /// for call symmetry with weekly toggling and plays no part in the lookup.
    pub fn delete_task(
        &mut self,
        kind: TaskKind,
        month_key: &str,
        task_id: TaskId,
        _week: Option<u8>,
    ) -> Result<Task, WorklistError> {
        match kind {
            TaskKind::Daily => remove(&mut self.tasks.daily, month_key, task_id).map(Task::Daily),
            TaskKind::Weekly => {
                remove(&mut self.tasks.weekly, month_key, task_id).map(Task::Weekly)
            }
            TaskKind::Monthly => {
                remove(&mut self.tasks.monthly, month_key, task_id).map(Task::Monthly)
            }
        }
    }

    pub fn find(&self, kind: TaskKind, month_key: &str, task_id: TaskId) -> Option<Task> {
        match kind {
            TaskKind::Daily => find(self.tasks.daily_for(month_key), task_id).map(Task::Daily),
            TaskKind::Weekly => find(self.tasks.weekly_for(month_key), task_id).map(Task::Weekly),
            TaskKind::Monthly => {
                find(self.tasks.monthly_for(month_key), task_id).map(Task::Monthly)
            }
        }
    }

    /// Tasks of one kind for one month, in display order.
    pub fn list(&self, kind: TaskKind, month_key: &str) -> Vec<Task> {
        match kind {
            TaskKind::Daily => self
                .tasks
                .daily_for(month_key)
                .iter()
                .cloned()
                .map(Task::Daily)
                .collect(),
            TaskKind::Weekly => self
                .tasks
                .weekly_for(month_key)
                .iter()
                .cloned()
                .map(Task::Weekly)
                .collect(),
            TaskKind::Monthly => self
                .tasks
                .monthly_for(month_key)
                .iter()
                .cloned()
                .map(Task::Monthly)
                .collect(),
        }
    }

    /// Wholesale overwrite; validates first and returns the replaced collection.
    pub fn replace_all(&mut self, next: TaskCollection) -> Result<TaskCollection, WorklistError> {
        next.validate_shape()?;
        Ok(std::mem::replace(&mut self.tasks, next))
    }
}

fn next_id<T: TaskRecord>(tasks: &[T], millis: i64) -> TaskId {
    match tasks.iter().map(|task| task.id()).max() {
        Some(last) if last >= millis => last + 1,
        _ => millis,
    }
}

fn find<T: TaskRecord + Clone>(tasks: &[T], task_id: TaskId) -> Option<T> {
    tasks.iter().find(|task| task.id() == task_id).cloned()
}

fn find_mut<'a, T: TaskRecord>(
    map: &'a mut BTreeMap<MonthKey, Vec<T>>,
    month_key: &str,
    task_id: TaskId,
) -> Result<&'a mut T, WorklistError> {
    map.get_mut(month_key)
        .and_then(|tasks| tasks.iter_mut().find(|task| task.id() == task_id))
        .ok_or_else(|| not_found::<T>(month_key, task_id))
}

fn remove<T: TaskRecord>(
    map: &mut BTreeMap<MonthKey, Vec<T>>,
    month_key: &str,
    task_id: TaskId,
) -> Result<T, WorklistError> {
    let tasks = map
        .get_mut(month_key)
        .ok_or_else(|| not_found::<T>(month_key, task_id))?;
    let index = tasks
        .iter()
        .position(|task| task.id() == task_id)
        .ok_or_else(|| not_found::<T>(month_key, task_id))?;
    Ok(tasks.remove(index))
}

fn not_found<T: TaskRecord>(month_key: &str, id: TaskId) -> WorklistError {
    WorklistError::NotFound {
        kind: T::KIND,
        month_key: month_key.to_string(),
        id,
    }
}
