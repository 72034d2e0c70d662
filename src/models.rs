use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::WorklistError;
use crate::period::{self, MAX_WEEK_OF_MONTH};

/// Milliseconds since the epoch at creation; unique inside its sequence.
pub type TaskId = i64;

/// `YYYY-MM`, see [`period::month_key`].
pub type MonthKey = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Daily,
    Weekly,
    Monthly,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [TaskKind::Daily, TaskKind::Weekly, TaskKind::Monthly];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Daily => "daily",
            TaskKind::Weekly => "weekly",
            TaskKind::Monthly => "monthly",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = WorklistError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(TaskKind::Daily),
            "weekly" | "week" => Ok(TaskKind::Weekly),
            "monthly" | "month" => Ok(TaskKind::Monthly),
            other => Err(WorklistError::validation(format!("unknown task kind: {other}"))),
        }
    }
}

/// Completion state where membership is the "done" flag.
///
/// On the wire this is a `{key: true}` object; `false` entries from older
/// data are dropped on read and never written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSet<K: Ord>(BTreeSet<K>);

impl<K: Ord> CompletionSet<K> {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.0.contains(key)
    }

    /// Flips membership of `key` and returns the new state.
    pub fn toggle(&mut self, key: K) -> bool {
        if self.0.remove(&key) {
            return false;
        }
        self.0.insert(key);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.0.iter()
    }
}

impl<K: Ord> Default for CompletionSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> FromIterator<K> for CompletionSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<K: Ord + Serialize> Serialize for CompletionSet<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for key in &self.0 {
            map.serialize_entry(key, &true)?;
        }
        map.end()
    }
}

impl<'de, K: Ord + Deserialize<'de>> Deserialize<'de> for CompletionSet<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<K, bool>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(key, done)| done.then_some(key))
            .collect())
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Fields every recurrence kind shares.
pub trait TaskRecord {
    const KIND: TaskKind;

    fn id(&self) -> TaskId;
    fn text(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTask {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, deserialize_with = "nullable")]
    pub daily_completions: CompletionSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTask {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, deserialize_with = "nullable")]
    pub weekly_completions: CompletionSet<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTask {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub completed: bool,
}

macro_rules! impl_task_record {
    ($ty:ty, $kind:expr) => {
        impl TaskRecord for $ty {
            const KIND: TaskKind = $kind;

            fn id(&self) -> TaskId {
                self.id
            }

            fn text(&self) -> &str {
                &self.text
            }
        }
    };
}

impl_task_record!(DailyTask, TaskKind::Daily);
impl_task_record!(WeeklyTask, TaskKind::Weekly);
impl_task_record!(MonthlyTask, TaskKind::Monthly);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    Daily(DailyTask),
    Weekly(WeeklyTask),
    Monthly(MonthlyTask),
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Daily(_) => TaskKind::Daily,
            Task::Weekly(_) => TaskKind::Weekly,
            Task::Monthly(_) => TaskKind::Monthly,
        }
    }

    pub fn id(&self) -> TaskId {
        match self {
            Task::Daily(task) => task.id,
            Task::Weekly(task) => task.id,
            Task::Monthly(task) => task.id,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Task::Daily(task) => &task.text,
            Task::Weekly(task) => &task.text,
            Task::Monthly(task) => &task.text,
        }
    }
}

/// All tasks, per recurrence kind, per month key. Sequence order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCollection {
    #[serde(default, deserialize_with = "nullable")]
    pub daily: BTreeMap<MonthKey, Vec<DailyTask>>,
    #[serde(default, deserialize_with = "nullable")]
    pub weekly: BTreeMap<MonthKey, Vec<WeeklyTask>>,
    #[serde(default, deserialize_with = "nullable")]
    pub monthly: BTreeMap<MonthKey, Vec<MonthlyTask>>,
}

impl TaskCollection {
    pub fn is_empty(&self) -> bool {
        self.daily.values().all(Vec::is_empty)
            && self.weekly.values().all(Vec::is_empty)
            && self.monthly.values().all(Vec::is_empty)
    }

    pub fn daily_for(&self, month_key: &str) -> &[DailyTask] {
        self.daily.get(month_key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn weekly_for(&self, month_key: &str) -> &[WeeklyTask] {
        self.weekly.get(month_key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn monthly_for(&self, month_key: &str) -> &[MonthlyTask] {
        self.monthly.get(month_key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Checks the invariants the task store relies on before a wholesale replace.
    pub fn validate_shape(&self) -> Result<(), WorklistError> {
        for (month_key, tasks) in &self.daily {
            check_sequence(month_key, tasks)?;
            for task in tasks {
                if let Some(key) = task
                    .daily_completions
                    .iter()
                    .find(|key| !day_in_month(key, month_key))
                {
                    return Err(WorklistError::validation(format!(
                        "daily task #{} in {month_key} has completion outside the month: {key}",
                        task.id
                    )));
                }
            }
        }
        for (month_key, tasks) in &self.weekly {
            check_sequence(month_key, tasks)?;
            for task in tasks {
                if let Some(week) = task
                    .weekly_completions
                    .iter()
                    .find(|week| !(1..=MAX_WEEK_OF_MONTH).contains(*week))
                {
                    return Err(WorklistError::validation(format!(
                        "weekly task #{} in {month_key} has invalid week {week}",
                        task.id
                    )));
                }
            }
        }
        for (month_key, tasks) in &self.monthly {
            check_sequence(month_key, tasks)?;
        }
        Ok(())
    }
}

fn check_sequence<T: TaskRecord>(month_key: &str, tasks: &[T]) -> Result<(), WorklistError> {
    if period::parse_month_key(month_key).is_none() {
        return Err(WorklistError::validation(format!(
            "invalid {} month key: {month_key:?}",
            T::KIND
        )));
    }
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if task.text().trim().is_empty() {
            return Err(WorklistError::validation(format!(
                "{} task #{} in {month_key} has empty text",
                T::KIND,
                task.id()
            )));
        }
        if !seen.insert(task.id()) {
            return Err(WorklistError::validation(format!(
                "duplicate {} task id {} in {month_key}",
                T::KIND,
                task.id()
            )));
        }
    }
    Ok(())
}

fn day_in_month(day_key: &str, month_key: &str) -> bool {
    period::parse_day_key(day_key).is_some_and(|date| period::month_key(date) == month_key)
}

/// The persisted object under the primary storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub tasks: TaskCollection,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_updated: Option<String>,
}

/// A stamp that is not a string reads as absent instead of failing the document.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(stamp) => Some(stamp),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily(id: TaskId, text: &str, days: &[&str]) -> DailyTask {
        DailyTask {
            id,
            text: text.to_string(),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            daily_completions: days.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn completion_set_toggle_flips_membership() {
        let mut set = CompletionSet::<u8>::new();
        assert!(set.toggle(2));
        assert!(set.contains(&2u8));
        assert!(!set.toggle(2));
        assert!(set.is_empty());
    }

    #[test]
    fn completion_set_serializes_as_presence_map() {
        let task = daily(1, "Exercise", &["2024-01-15"]);
        let value = serde_json::to_value(&task).expect("serialize daily task");
        assert_eq!(
            value,
            serde_json::json!({
              "id": 1,
              "text": "Exercise",
              "createdAt": "2024-01-01T00:00:00.000Z",
              "dailyCompletions": { "2024-01-15": true }
            })
        );
    }

    #[test]
    fn completion_set_drops_false_entries_on_read() {
        let json = r#"{ "id": 7, "text": "Review", "weeklyCompletions": { "1": true, "2": false, "3": true } }"#;
        let task: WeeklyTask = serde_json::from_str(json).expect("weekly task should deserialize");
        assert_eq!(task.weekly_completions.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(task.created_at, "");

        let back = serde_json::to_value(&task).unwrap();
        assert_eq!(back["weeklyCompletions"], serde_json::json!({ "1": true, "3": true }));
    }

    #[test]
    fn missing_or_null_completion_state_defaults_to_empty() {
        let json = r#"{ "id": 1, "text": "a", "dailyCompletions": null }"#;
        let task: DailyTask = serde_json::from_str(json).unwrap();
        assert!(task.daily_completions.is_empty());

        let json = r#"{ "id": 1, "text": "a" }"#;
        let task: MonthlyTask = serde_json::from_str(json).unwrap();
        assert!(!task.completed);
    }

    #[test]
    fn collection_accepts_partial_legacy_shapes() {
        let json = r#"{ "daily": { "2024-01": [] }, "weekly": null }"#;
        let collection: TaskCollection = serde_json::from_str(json).unwrap();
        assert!(collection.daily.contains_key("2024-01"));
        assert!(collection.weekly.is_empty());
        assert!(collection.monthly.is_empty());
        assert!(collection.is_empty());
    }

    #[test]
    fn task_enum_uses_kind_tag() {
        let task = Task::Monthly(MonthlyTask {
            id: 3,
            text: "Budget".to_string(),
            created_at: String::new(),
            completed: true,
        });
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["kind"], "monthly");
        assert_eq!(value["completed"], true);
        assert_eq!(task.kind(), TaskKind::Monthly);
        assert_eq!(task.text(), "Budget");
    }

    #[test]
    fn task_kind_parses_loosely() {
        assert_eq!("Daily".parse::<TaskKind>().unwrap(), TaskKind::Daily);
        assert_eq!(" week ".parse::<TaskKind>().unwrap(), TaskKind::Weekly);
        assert!("yearly".parse::<TaskKind>().is_err());
    }

    #[test]
    fn validate_shape_accepts_well_formed_collection() {
        let mut collection = TaskCollection::default();
        collection
            .daily
            .insert(
                "2024-01".to_string(),
                vec![daily(1, "a", &["2024-01-31"]), daily(2, "b", &[])],
            );
        assert!(collection.validate_shape().is_ok());
    }

    #[test]
    fn validate_shape_rejects_broken_invariants() {
        let mut bad_key = TaskCollection::default();
        bad_key.daily.insert("2024-1".to_string(), vec![daily(1, "a", &[])]);
        assert!(matches!(bad_key.validate_shape(), Err(WorklistError::Validation(_))));

        let mut duplicate = TaskCollection::default();
        duplicate
            .daily
            .insert("2024-01".to_string(), vec![daily(1, "a", &[]), daily(1, "b", &[])]);
        assert!(duplicate.validate_shape().is_err());

        let mut foreign_day = TaskCollection::default();
        foreign_day
            .daily
            .insert("2024-01".to_string(), vec![daily(1, "a", &["2024-02-01"])]);
        assert!(foreign_day.validate_shape().is_err());

        let mut blank = TaskCollection::default();
        blank.daily.insert("2024-01".to_string(), vec![daily(1, "  ", &[])]);
        assert!(blank.validate_shape().is_err());

        let mut bad_week = TaskCollection::default();
        bad_week.weekly.insert(
            "2024-01".to_string(),
            vec![WeeklyTask {
                id: 1,
                text: "w".to_string(),
                created_at: String::new(),
                weekly_completions: [0u8].into_iter().collect(),
            }],
        );
        assert!(bad_week.validate_shape().is_err());
    }
}
