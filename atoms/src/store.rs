use std::future::Future;

use chrono::NaiveDate;

use crate::error::StoreError;
use crate::tasks::model::{NewTaskRow, Task, TaskChanges, TaskStatus};

/// Equality filters for a select on the tasks collection.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaskQuery {
    pub id: Option<String>,
    pub status: Option<TaskStatus>,
    pub scheduled_for: Option<NaiveDate>,
}

impl TaskQuery {
    pub fn by_id(id: &str) -> Self {
        TaskQuery {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn on_date(date: NaiveDate) -> Self {
        TaskQuery {
            scheduled_for: Some(date),
            ..Default::default()
        }
    }
}

/// A handle on the `tasks` collection, already scoped to one caller.
///
/// Implementations run every call under the caller's authorization, so rows
/// owned by anyone else are invisible: selects skip them and updates/deletes
/// affect zero rows. Application code never filters by owner itself.
pub trait TaskStore: Send + Sync {
    /// Matching rows ordered by `priority` ascending, then `scheduled_time`
    /// ascending with unset times last.
    fn select(&self, query: &TaskQuery)
        -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Insert one row and return it with its store-assigned fields.
    fn insert(&self, row: &NewTaskRow) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Patch the row with `id`; returns the affected rows (empty if none visible).
    fn update(
        &self,
        id: &str,
        changes: &TaskChanges,
    ) -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Delete the row with `id`; returns the removed rows (empty if none visible).
    fn delete(&self, id: &str) -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;
}
