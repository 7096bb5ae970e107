use chrono::Local;
use dayplan_atoms::respond;
use dayplan_atoms::store::TaskStore;
use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::schedule;

/// HTTP Handler: GET /tasks/today
pub async fn today_tasks_handler<S: TaskStore>(store: &S) -> Result<Response<Body>, Error> {
    let today = Local::now().date_naive();
    match schedule::today_tasks(store, today).await {
        Ok(tasks) => respond::json(StatusCode::OK, &tasks),
        Err(e) => e.into_response(),
    }
}

/// HTTP Handler: GET /tasks/current
///
/// "No current task" is a normal answer, not a 404.
pub async fn current_task_handler<S: TaskStore>(store: &S) -> Result<Response<Body>, Error> {
    let now = Local::now().naive_local();
    match schedule::current_task(store, now).await {
        Ok(Some(task)) => respond::json(StatusCode::OK, &task),
        Ok(None) => {
            tracing::debug!("no current task");
            respond::json(StatusCode::OK, &serde_json::json!({"message": "No current task"}))
        }
        Err(e) => e.into_response(),
    }
}
