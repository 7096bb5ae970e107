use lambda_http::{http::StatusCode, Body, Error, Response};

use super::model::{CreateTaskPayload, TaskFilters, UpdateTaskPayload};
use super::service;
use crate::error::ApiError;
use crate::respond;
use crate::store::TaskStore;

/// HTTP Handler: GET /tasks?status=&task_date=
pub async fn list_tasks_handler<S: TaskStore>(
    store: &S,
    status: Option<&str>,
    task_date: Option<&str>,
) -> Result<Response<Body>, Error> {
    let filters = match TaskFilters::from_query(status, task_date) {
        Ok(filters) => filters,
        Err(e) => return e.into_response(),
    };

    match service::list_tasks(store, &filters).await {
        Ok(tasks) => respond::json(StatusCode::OK, &tasks),
        Err(e) => e.into_response(),
    }
}

/// HTTP Handler: POST /tasks
pub async fn create_task_handler<S: TaskStore>(
    store: &S,
    user_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: CreateTaskPayload = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match service::create_task(store, user_id, payload).await {
        Ok(task) => respond::json(StatusCode::CREATED, &task),
        Err(e) => e.into_response(),
    }
}

/// HTTP Handler: GET /tasks/{id}
pub async fn get_task_handler<S: TaskStore>(store: &S, task_id: &str) -> Result<Response<Body>, Error> {
    match service::get_task(store, task_id).await {
        Ok(task) => respond::json(StatusCode::OK, &task),
        Err(e) => e.into_response(),
    }
}

/// HTTP Handler: PUT /tasks/{id}
pub async fn update_task_handler<S: TaskStore>(
    store: &S,
    task_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    // no body at all reads the same as `{}`
    let payload: UpdateTaskPayload = if body.iter().all(u8::is_ascii_whitespace) {
        UpdateTaskPayload::default()
    } else {
        match serde_json::from_slice(body) {
            Ok(payload) => payload,
            Err(e) => return ApiError::from(e).into_response(),
        }
    };

    match service::update_task(store, task_id, payload).await {
        Ok(task) => respond::json(StatusCode::OK, &task),
        Err(e) => e.into_response(),
    }
}

/// HTTP Handler: DELETE /tasks/{id}
pub async fn delete_task_handler<S: TaskStore>(store: &S, task_id: &str) -> Result<Response<Body>, Error> {
    match service::delete_task(store, task_id).await {
        Ok(true) => respond::no_content(),
        Ok(false) => ApiError::NotFound.into_response(),
        Err(e) => e.into_response(),
    }
}
