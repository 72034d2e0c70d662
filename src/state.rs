use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::error::{StorageError, WorklistError};
use crate::events::StatePayload;
use crate::models::{StoredDocument, TaskCollection};
use crate::persistence::PersistenceAdapter;
use crate::storage::KeyValueStore;
use crate::store::TaskStore;
use crate::view::{ViewCursor, ViewKind};

/// Shared handle to the tracker: the task store, the view cursor and the
/// persistence adapter they are saved through.
///
/// The in-memory data sits behind a blocking mutex that is never held across
/// an `.await`; saves take a snapshot first.
pub struct AppState<S> {
    inner: Arc<Mutex<AppData>>,
    persistence: Arc<PersistenceAdapter<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            persistence: Arc::clone(&self.persistence),
        }
    }
}

#[derive(Debug)]
struct AppData {
    store: TaskStore,
    cursor: ViewCursor,
    last_updated: Option<String>,
}

impl<S: KeyValueStore> AppState<S> {
    pub fn new(
        document: StoredDocument,
        persistence: PersistenceAdapter<S>,
        today: NaiveDate,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AppData {
                store: TaskStore::new(document.tasks),
                cursor: ViewCursor::new(ViewKind::default(), today),
                last_updated: document.last_updated,
            })),
            persistence: Arc::new(persistence),
        }
    }

    /// Loads whatever the store holds.
    ///
    /// Unreadable data is an error: starting empty would let the next save
    /// overwrite it.
    pub async fn bootstrap(
        persistence: PersistenceAdapter<S>,
        today: NaiveDate,
    ) -> Result<Self, StorageError> {
        let document = persistence.load().await.map_err(|error| {
            log::error!("stored tasks unreadable: {error}");
            error
        })?;
        Ok(Self::new(document, persistence, today))
    }

    /// Re-reads the store, replacing the in-memory collection.
    pub async fn reload(&self) -> Result<StatePayload, StorageError> {
        let document = self.persistence.load().await?;
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.store = TaskStore::new(document.tasks);
        guard.last_updated = document.last_updated;
        Ok(payload_of(&guard))
    }

    pub fn persistence(&self) -> &PersistenceAdapter<S> {
        &self.persistence
    }

    pub fn tasks(&self) -> TaskCollection {
        let guard = self.inner.lock().expect("state poisoned");
        guard.store.collection().clone()
    }

    pub fn cursor(&self) -> ViewCursor {
        let guard = self.inner.lock().expect("state poisoned");
        guard.cursor
    }

    pub fn last_updated(&self) -> Option<String> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.last_updated.clone()
    }

    pub fn payload(&self) -> StatePayload {
        let guard = self.inner.lock().expect("state poisoned");
        payload_of(&guard)
    }

    /// Runs `f` against the store. Errors leave the store as `f` found it.
    pub fn with_store<T>(
        &self,
        f: impl FnOnce(&mut TaskStore) -> Result<T, WorklistError>,
    ) -> Result<T, WorklistError> {
        let mut guard = self.inner.lock().expect("state poisoned");
        f(&mut guard.store)
    }

    pub fn with_cursor<T>(&self, f: impl FnOnce(&mut ViewCursor) -> T) -> T {
        let mut guard = self.inner.lock().expect("state poisoned");
        f(&mut guard.cursor)
    }

    /// Overwrites every task; returns the previous collection.
    pub fn replace_all(&self, next: TaskCollection) -> Result<TaskCollection, WorklistError> {
        self.with_store(|store| store.replace_all(next))
    }

    /// Puts a previous collection back without re-validating it.
    pub fn restore(&self, previous: TaskCollection) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.store = TaskStore::new(previous);
    }

    /// Saves a snapshot of the current collection and records the new stamp.
    pub async fn persist(&self) -> Result<String, StorageError> {
        let snapshot = self.tasks();
        let stamp = self.persistence.save(&snapshot).await?;
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.last_updated = Some(stamp.clone());
        Ok(stamp)
    }
}

fn payload_of(data: &AppData) -> StatePayload {
    StatePayload {
        tasks: data.store.collection().clone(),
        last_updated: data.last_updated.clone(),
    }
}
