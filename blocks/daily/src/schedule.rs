use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use dayplan_atoms::store::{TaskQuery, TaskStore};
use dayplan_atoms::tasks::{Task, TaskStatus};
use dayplan_atoms::ApiError;

/// A task whose scheduled time is within this many seconds of now (inclusive)
/// is a window match.
pub const CURRENT_WINDOW_SECS: i64 = 30 * 60;

/// Sort position for tasks without a usable time: after every timed task of
/// the same priority.
fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
}

fn day_key(task: &Task) -> (i32, NaiveTime) {
    (task.priority, task.time_of_day().unwrap_or_else(end_of_day))
}

fn compare_for_day(a: &Task, b: &Task) -> Ordering {
    day_key(a)
        .cmp(&day_key(b))
        .then_with(|| a.id.cmp(&b.id))
}

/// Keep only tasks scheduled for `day`, ordered by priority, then time of day
/// (unset or malformed times last), then id.
pub fn order_for_day(tasks: Vec<Task>, day: NaiveDate) -> Vec<Task> {
    let mut today: Vec<Task> = tasks
        .into_iter()
        .filter(|t| t.scheduled_for == Some(day))
        .collect();
    today.sort_by(compare_for_day);
    today
}

fn within_window(task: &Task, now: NaiveTime) -> bool {
    if task.status == TaskStatus::Done {
        return false;
    }
    match task.time_of_day() {
        Some(at) => (at - now).abs() <= TimeDelta::seconds(CURRENT_WINDOW_SECS),
        None => false,
    }
}

/// Pick the task that should be active at `now` from a day already ordered by
/// [`order_for_day`]. First match wins:
///
/// 1. an unfinished task scheduled within ±30 minutes of `now`
/// 2. the first `pending` task
/// 3. the first `in_progress` task
pub fn select_current(ordered: &[Task], now: NaiveTime) -> Option<&Task> {
    ordered
        .iter()
        .find(|t| within_window(t, now))
        .or_else(|| ordered.iter().find(|t| t.status == TaskStatus::Pending))
        .or_else(|| ordered.iter().find(|t| t.status == TaskStatus::InProgress))
}

/// The caller's tasks for `day`, in day order.
pub async fn today_tasks<S: TaskStore>(store: &S, day: NaiveDate) -> Result<Vec<Task>, ApiError> {
    let rows = store.select(&TaskQuery::on_date(day)).await?;
    Ok(order_for_day(rows, day))
}

/// The caller's current task at `now`, if any.
pub async fn current_task<S: TaskStore>(
    store: &S,
    now: NaiveDateTime,
) -> Result<Option<Task>, ApiError> {
    let ordered = today_tasks(store, now.date()).await?;
    Ok(select_current(&ordered, now.time()).cloned())
}
