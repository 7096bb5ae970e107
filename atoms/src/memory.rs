//! In-memory `TaskStore` with owner row-security, for tests.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StoreError;
use crate::store::{TaskQuery, TaskStore};
use crate::tasks::model::{NewTaskRow, Task, TaskChanges};

#[derive(Debug, Default)]
struct Rows {
    next_id: u64,
    tasks: Vec<Task>,
}

/// Rows are shared between every view; each view only sees its owner's rows.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    rows: Arc<Mutex<Rows>>,
    owner: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            rows: Arc::new(Mutex::new(Rows::default())),
            owner: String::new(),
        }
    }

    /// A view over the same rows as seen by `user_id`.
    pub fn as_user(&self, user_id: &str) -> Self {
        MemoryStore {
            rows: Arc::clone(&self.rows),
            owner: user_id.to_string(),
        }
    }

    /// Insert a row verbatim, bypassing row-security.
    pub fn seed(&self, task: Task) {
        self.lock().tasks.push(task);
    }

    /// Every row regardless of owner.
    pub fn all_rows(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Rows> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn visible(&self, task: &Task, query: &TaskQuery) -> bool {
        task.user_id == self.owner
            && query.id.as_ref().map_or(true, |id| &task.id == id)
            && query.status.map_or(true, |s| task.status == s)
            && query
                .scheduled_for
                .map_or(true, |d| task.scheduled_for == Some(d))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl TaskStore for MemoryStore {
    async fn select(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let rows = self.lock();
        let mut found: Vec<Task> = rows
            .tasks
            .iter()
            .filter(|t| self.visible(t, query))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.priority.cmp(&b.priority).then_with(|| {
                match (&a.scheduled_time, &b.scheduled_time) {
                    (Some(x), Some(y)) => x.cmp(y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            })
        });
        Ok(found)
    }

    async fn insert(&self, row: &NewTaskRow) -> Result<Task, StoreError> {
        if row.user_id != self.owner {
            return Err(StoreError::Status {
                status: 403,
                body: "new row violates row-level security policy".to_string(),
            });
        }

        let mut rows = self.lock();
        rows.next_id += 1;
        let stamp = now();
        let task = Task {
            id: rows.next_id.to_string(),
            user_id: row.user_id.clone(),
            title: row.title.clone(),
            status: row.status,
            priority: row.priority,
            scheduled_for: row.scheduled_for,
            scheduled_time: row.scheduled_time.clone(),
            created_at: stamp.clone(),
            updated_at: stamp,
        };
        rows.tasks.push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: &str, changes: &TaskChanges) -> Result<Vec<Task>, StoreError> {
        let mut rows = self.lock();
        let mut touched = Vec::new();
        for task in rows.tasks.iter_mut() {
            if task.user_id != self.owner || task.id != id {
                continue;
            }
            if let Some(title) = &changes.title {
                task.title = title.clone();
            }
            if let Some(status) = changes.status {
                task.status = status;
            }
            if let Some(priority) = changes.priority {
                task.priority = priority;
            }
            if let Some(date) = changes.scheduled_for {
                task.scheduled_for = Some(date);
            }
            if let Some(time) = &changes.scheduled_time {
                task.scheduled_time = Some(time.clone());
            }
            task.updated_at = changes.updated_at.clone();
            touched.push(task.clone());
        }
        Ok(touched)
    }

    async fn delete(&self, id: &str) -> Result<Vec<Task>, StoreError> {
        let mut rows = self.lock();
        let (removed, kept): (Vec<Task>, Vec<Task>) = std::mem::take(&mut rows.tasks)
            .into_iter()
            .partition(|t| t.user_id == self.owner && t.id == id);
        rows.tasks = kept;
        Ok(removed)
    }
}
