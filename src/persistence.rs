use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{StorageError, WorklistError};
use crate::models::{StoredDocument, TaskCollection};
use crate::storage::KeyValueStore;

/// Holds `{tasks, lastUpdated}`.
pub const STORAGE_KEY: &str = "worklist";
/// Older layouts kept the bare collection under one of these keys, newest first.
pub const LEGACY_STORAGE_KEYS: [&str; 2] = ["worklist_tasks", "tasks"];
/// Sibling timestamp written next to the legacy collection keys.
pub const LEGACY_TIMESTAMP_KEY: &str = "lastUpdated";

const KIND_KEYS: [&str; 3] = ["daily", "weekly", "monthly"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredDocumentRef<'a> {
    tasks: &'a TaskCollection,
    last_updated: &'a str,
}

pub struct PersistenceAdapter<S> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Writes the collection with a fresh timestamp and returns that timestamp.
    pub async fn save(&self, tasks: &TaskCollection) -> Result<String, StorageError> {
        self.save_at(tasks, Utc::now()).await
    }

    /// Saves through one adapter are applied in the order they were issued.
    pub async fn save_at(
        &self,
        tasks: &TaskCollection,
        now: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let _guard = self.write_lock.lock().await;
        let last_updated = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let value = serde_json::to_value(StoredDocumentRef {
            tasks,
            last_updated: &last_updated,
        })?;
        self.store.set(STORAGE_KEY, value).await?;
        log::debug!("saved tasks key={STORAGE_KEY} last_updated={last_updated}");
        Ok(last_updated)
    }

    /// Reads the stored collection; missing data yields an empty collection.
    pub async fn load(&self) -> Result<StoredDocument, StorageError> {
        if let Some(value) = self.store.get(STORAGE_KEY).await? {
            return Ok(serde_json::from_value(value)?);
        }

        for key in LEGACY_STORAGE_KEYS {
            let Some(value) = self.store.get(key).await? else {
                continue;
            };
            let tasks: TaskCollection = serde_json::from_value(value)?;
            let last_updated = match self.store.get(LEGACY_TIMESTAMP_KEY).await? {
                Some(Value::String(stamp)) => Some(stamp),
                _ => None,
            };
            log::info!("loaded tasks from legacy key={key}");
            return Ok(StoredDocument {
                tasks,
                last_updated,
            });
        }

        Ok(StoredDocument {
            tasks: TaskCollection::default(),
            last_updated: None,
        })
    }
}

/// Whether `candidate` looks like an import document.
///
/// A `tasks` array is the newer flat layout; a `tasks` object needs at least
/// one non-null `daily`/`weekly`/`monthly` entry (the legacy layout).
pub fn validate(candidate: &Value) -> bool {
    match candidate.get("tasks") {
        Some(Value::Array(_)) => true,
        Some(Value::Object(tasks)) => KIND_KEYS
            .iter()
            .any(|kind| tasks.get(*kind).is_some_and(|value| !value.is_null())),
        _ => false,
    }
}

/// Turns an import document into a collection without touching any state.
pub fn decode_import(candidate: Value) -> Result<TaskCollection, WorklistError> {
    if !validate(&candidate) {
        return Err(WorklistError::validation(
            "import document must carry a `tasks` collection",
        ));
    }
    let tasks = match candidate {
        Value::Object(mut document) => document.remove("tasks").unwrap_or(Value::Null),
        _ => Value::Null,
    };

    let collection = match tasks {
        Value::Array(items) if items.is_empty() => TaskCollection::default(),
        Value::Array(items) => {
            return Err(WorklistError::UnsupportedFormat(format!(
                "flat task list with {} entries has no defined layout",
                items.len()
            )));
        }
        other => serde_json::from_value::<TaskCollection>(other)
            .map_err(|err| WorklistError::validation(format!("malformed task collection: {err}")))?,
    };
    collection.validate_shape()?;
    Ok(collection)
}
