//! Daily, weekly and monthly task tracking: period keys, completion state,
//! statistics, overview projections, persistence and CSV export.

pub mod commands;
pub mod error;
pub mod events;
pub mod export;
pub mod logging;
pub mod models;
pub mod overview;
pub mod period;
pub mod persistence;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;
pub mod view;

pub use error::{StorageError, WorklistError};
pub use models::{
    CompletionSet, DailyTask, MonthKey, MonthlyTask, StoredDocument, Task, TaskCollection, TaskId,
    TaskKind, WeeklyTask,
};
pub use persistence::PersistenceAdapter;
pub use state::AppState;
pub use stats::{compute_stats, Stats};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::TaskStore;
pub use view::{ViewCursor, ViewKind};
