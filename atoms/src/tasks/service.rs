use super::model::{CreateTaskPayload, Task, TaskFilters, UpdateTaskPayload};
use crate::error::ApiError;
use crate::store::{TaskQuery, TaskStore};

/// List the caller's tasks, ordered by priority then scheduled time.
pub async fn list_tasks<S: TaskStore>(store: &S, filters: &TaskFilters) -> Result<Vec<Task>, ApiError> {
    let query = TaskQuery {
        id: None,
        status: filters.status,
        scheduled_for: filters.scheduled_for,
    };
    Ok(store.select(&query).await?)
}

/// Get a specific task. Missing and not-owned both yield `NotFound`.
pub async fn get_task<S: TaskStore>(store: &S, task_id: &str) -> Result<Task, ApiError> {
    store
        .select(&TaskQuery::by_id(task_id))
        .await?
        .into_iter()
        .next()
        .ok_or(ApiError::NotFound)
}

/// Create a new task owned by `user_id`.
///
/// Validation runs before the store is contacted.
pub async fn create_task<S: TaskStore>(
    store: &S,
    user_id: &str,
    payload: CreateTaskPayload,
) -> Result<Task, ApiError> {
    let row = payload.into_row(user_id)?;
    let task = store.insert(&row).await?;
    tracing::info!(task_id = %task.id, "task created");
    Ok(task)
}

/// Apply a partial update.
///
/// An update that supplies no field is a no-op read: the current record is
/// returned unchanged (or `NotFound`).
pub async fn update_task<S: TaskStore>(
    store: &S,
    task_id: &str,
    payload: UpdateTaskPayload,
) -> Result<Task, ApiError> {
    let changes = payload.into_changes(chrono::Utc::now().to_rfc3339())?;
    if changes.is_empty() {
        return get_task(store, task_id).await;
    }

    store
        .update(task_id, &changes)
        .await?
        .into_iter()
        .next()
        .ok_or(ApiError::NotFound)
}

/// Delete a task. `false` means not found or not owned.
pub async fn delete_task<S: TaskStore>(store: &S, task_id: &str) -> Result<bool, ApiError> {
    let removed = store.delete(task_id).await?;
    Ok(!removed.is_empty())
}
