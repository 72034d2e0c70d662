use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde_json::Value;
use tokio::fs;

use crate::error::{StorageError, WorklistError};
use crate::events::StatePayload;
use crate::export::{delimited_text_import_error, is_delimited_text_path, to_delimited_text};
use crate::models::{Task, TaskCollection, TaskId, TaskKind};
use crate::period::month_key;
use crate::persistence::decode_import;
use crate::state::AppState;
use crate::stats::{compute_stats, Stats};
use crate::storage::KeyValueStore;
use crate::store::TaskStore;
use crate::view::ViewKind;

/// Acknowledgement returned to the host for every operation.
#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// What the host provides to commands: where files go and how to signal it.
pub trait CommandCtx {
    fn app_data_dir(&self) -> Result<PathBuf, StorageError>;
    fn emit_state_updated(&self, payload: StatePayload);
    fn request_reload(&self);
}

/// Control messages the host sends, tagged by `action`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum HostMessage {
    ExportTasks,
    ImportTasks { data: Value },
    ClearAllTasks,
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

/// Success without data; used when the addressed task no longer exists.
fn ok_empty<T>() -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: None,
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

async fn persist<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
) -> Result<(), StorageError> {
    state.persist().await?;
    ctx.emit_state_updated(state.payload());
    Ok(())
}

/// Applies `f` to the store and saves on success.
///
/// `NotFound` is acknowledged as an empty success and nothing is saved.
/// A failed save puts the collection back as it was before `f`.
async fn mutate<S, T>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
    action: &str,
    f: impl FnOnce(&mut TaskStore) -> Result<T, WorklistError>,
) -> CommandResult<T>
where
    S: KeyValueStore,
{
    let previous = state.tasks();
    match state.with_store(f) {
        Ok(value) => {
            if let Err(error) = persist(ctx, state).await {
                log::warn!("{action}: save failed, rolling back: {error}");
                state.restore(previous);
                return err(&format!("storage error: {error}"));
            }
            ok(value)
        }
        Err(error) if error.is_not_found() => {
            log::debug!("{action}: ignored, {error}");
            ok_empty()
        }
        Err(error) => {
            log::info!("{action}: rejected, {error}");
            err(&error.to_string())
        }
    }
}

/// Swaps in `next` and saves; the previous collection comes back if saving fails.
async fn replace_and_persist<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
    action: &str,
    next: TaskCollection,
) -> Result<(), WorklistError> {
    let previous = state.replace_all(next)?;
    if let Err(error) = persist(ctx, state).await {
        log::warn!("{action}: save failed, rolling back: {error}");
        state.restore(previous);
        return Err(error.into());
    }
    ctx.request_reload();
    Ok(())
}

pub async fn load_state_impl<S: KeyValueStore>(state: &AppState<S>) -> CommandResult<StatePayload> {
    match state.reload().await {
        Ok(payload) => ok(payload),
        Err(error) => err(&format!("storage error: {error}")),
    }
}

pub async fn add_task_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
    kind: TaskKind,
    period_date: NaiveDate,
    text: &str,
) -> CommandResult<Task> {
    let result = mutate(ctx, state, "add_task", |store| {
        store.add_task(kind, period_date, text)
    })
    .await;
    if let Some(task) = &result.data {
        log::info!("added {kind} task id={} month={}", task.id(), month_key(period_date));
    }
    result
}

pub async fn toggle_daily_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
    month_key: &str,
    task_id: TaskId,
    day_key: &str,
) -> CommandResult<bool> {
    mutate(ctx, state, "toggle_daily", |store| {
        store.toggle_daily_completion(month_key, task_id, day_key)
    })
    .await
}

pub async fn toggle_weekly_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
    month_key: &str,
    task_id: TaskId,
    week: u8,
) -> CommandResult<bool> {
    mutate(ctx, state, "toggle_weekly", |store| {
        store.toggle_weekly_completion(month_key, task_id, week)
    })
    .await
}

pub async fn toggle_monthly_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
    month_key: &str,
    task_id: TaskId,
) -> CommandResult<bool> {
    mutate(ctx, state, "toggle_monthly", |store| {
        store.toggle_monthly_completion(month_key, task_id)
    })
    .await
}

pub async fn delete_task_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
    kind: TaskKind,
    month_key: &str,
    task_id: TaskId,
    week: Option<u8>,
) -> CommandResult<Task> {
    let result = mutate(ctx, state, "delete_task", |store| {
        store.delete_task(kind, month_key, task_id, week)
    })
    .await;
    if result.data.is_some() {
        log::info!("deleted {kind} task id={task_id} month={month_key}");
    }
    result
}

pub fn list_tasks_impl<S: KeyValueStore>(
    state: &AppState<S>,
    kind: TaskKind,
    period_date: NaiveDate,
) -> CommandResult<Vec<Task>> {
    let month = month_key(period_date);
    match state.with_store(|store| Ok(store.list(kind, &month))) {
        Ok(tasks) => ok(tasks),
        Err(error) => err(&error.to_string()),
    }
}

pub fn stats_impl<S: KeyValueStore>(
    state: &AppState<S>,
    view: ViewKind,
    reference: NaiveDate,
) -> CommandResult<Stats> {
    ok(compute_stats(view, &state.tasks(), reference))
}

fn export_default_path(root: &Path, month_date: NaiveDate) -> PathBuf {
    let exports_dir = root.join("exports");
    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    exports_dir.join(format!("worklist-{}-{stamp}.csv", month_key(month_date)))
}

async fn write_atomic_bytes(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension("tmp");
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&tmp, bytes).await?;
    fs::rename(tmp, path).await?;
    Ok(())
}

/// Writes the month's daily table and returns where it went.
pub async fn export_csv_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
    month_date: NaiveDate,
    out: Option<PathBuf>,
) -> CommandResult<String> {
    let path = match out {
        Some(path) => path,
        None => match ctx.app_data_dir() {
            Ok(root) => export_default_path(&root, month_date),
            Err(e) => return err(&format!("app_data_dir error: {e}")),
        },
    };

    let text = to_delimited_text(&state.tasks(), month_date);
    if let Err(error) = write_atomic_bytes(&path, text.as_bytes()).await {
        return err(&format!("export error: {error}"));
    }
    log::info!("exported {} to {}", month_key(month_date), path.display());
    ok(path.to_string_lossy().to_string())
}

/// Replaces every task with the contents of an import document.
pub async fn import_document_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
    document: Value,
) -> CommandResult<TaskCollection> {
    let next = match decode_import(document) {
        Ok(next) => next,
        Err(error) => {
            log::info!("import rejected: {error}");
            return err(&error.to_string());
        }
    };
    if let Err(error) = replace_and_persist(ctx, state, "import", next).await {
        return err(&error.to_string());
    }
    log::info!("imported tasks");
    ok(state.tasks())
}

/// Imports a JSON export. `.csv` paths are refused before the file is read.
pub async fn import_file_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
    path: &Path,
) -> CommandResult<TaskCollection> {
    if is_delimited_text_path(path) {
        let error = delimited_text_import_error(path);
        log::info!("import rejected: {error}");
        return err(&error.to_string());
    }

    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(error) => return err(&format!("storage error: {}", StorageError::from(error))),
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(document) => import_document_impl(ctx, state, document).await,
        Err(error) => err(&format!("storage error: {}", StorageError::from(error))),
    }
}

/// Empties every kind and saves with a fresh timestamp.
pub async fn clear_all_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
) -> CommandResult<bool> {
    let cleared = replace_and_persist(ctx, state, "clear_all", TaskCollection::default()).await;
    if let Err(error) = cleared {
        return err(&error.to_string());
    }
    log::info!("cleared all tasks");
    ok(true)
}

pub async fn handle_message_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
    message: HostMessage,
) -> CommandResult<Value> {
    match message {
        HostMessage::ExportTasks => to_value(ok(state.tasks())),
        HostMessage::ImportTasks { data } => {
            to_value(import_document_impl(ctx, state, data).await)
        }
        HostMessage::ClearAllTasks => to_value(clear_all_impl(ctx, state).await),
    }
}

fn to_value<T: serde::Serialize>(result: CommandResult<T>) -> CommandResult<Value> {
    let CommandResult { ok: success, data, error } = result;
    match data.map(serde_json::to_value).transpose() {
        Ok(data) => CommandResult {
            ok: success,
            data,
            error,
        },
        Err(e) => err(&format!("json error: {e}")),
    }
}
