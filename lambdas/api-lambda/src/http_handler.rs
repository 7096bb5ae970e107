use std::sync::Arc;

use daily_block as daily;
use dayplan_atoms::{respond, tasks, ApiError};
use dayplan_shared::{store::ScopedStoreFactory, users, AppState};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Verbs served by an authenticated route, or `None` if the path is unknown.
fn allowed_methods(parts: &[&str]) -> Option<&'static [&'static str]> {
    match parts {
        ["auth", "me"] | ["tasks", "today"] | ["tasks", "current"] => Some(&["GET"]),
        ["tasks"] => Some(&["GET", "POST"]),
        ["tasks", _] => Some(&["GET", "PUT", "DELETE"]),
        _ => None,
    }
}

fn query_param<'a>(event: &'a Request, name: &str) -> Option<&'a str> {
    event
        .query_string_parameters_ref()
        .and_then(|params| params.first(name))
}

/// Main Lambda handler - routes every request of the API
pub(crate) async fn function_handler<F: ScopedStoreFactory>(
    event: Request,
    state: Arc<AppState<F>>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    tracing::info!(%method, path, "request received");

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    // Public routes
    match (method, parts.as_slice()) {
        (&Method::GET, []) => {
            return respond::json(
                StatusCode::OK,
                &serde_json::json!({"message": "Task Manager API", "version": VERSION}),
            )
        }
        (&Method::GET, ["health"]) => {
            return respond::json(StatusCode::OK, &serde_json::json!({"status": "ok"}))
        }
        (_, [] | ["health"]) => return respond::method_not_allowed(),
        _ => {}
    }

    let Some(allowed) = allowed_methods(&parts) else {
        tracing::warn!(%method, path, "no route matched");
        return respond::not_found();
    };
    if !allowed.contains(&method.as_str()) {
        return respond::method_not_allowed();
    }

    let identity = match state.authenticate(&event) {
        Ok(identity) => identity,
        Err(e) => return ApiError::from(e).into_response(),
    };
    let store = state.store_for(&identity);
    let body: &[u8] = event.body();

    match (method, parts.as_slice()) {
        (&Method::GET, ["auth", "me"]) => users::me_handler(state.admin.as_ref(), &identity).await,

        // /tasks/today and /tasks/current win over /tasks/{id}
        (&Method::GET, ["tasks", "today"]) => daily::today_tasks_handler(&store).await,
        (&Method::GET, ["tasks", "current"]) => daily::current_task_handler(&store).await,

        (&Method::GET, ["tasks"]) => {
            tasks::list_tasks_handler(
                &store,
                query_param(&event, "status"),
                query_param(&event, "task_date"),
            )
            .await
        }
        (&Method::POST, ["tasks"]) => {
            tasks::create_task_handler(&store, &identity.user_id, body).await
        }
        (&Method::GET, ["tasks", task_id]) => tasks::get_task_handler(&store, task_id).await,
        (&Method::PUT, ["tasks", task_id]) => {
            tasks::update_task_handler(&store, task_id, body).await
        }
        (&Method::DELETE, ["tasks", task_id]) => {
            tasks::delete_task_handler(&store, task_id).await
        }
        _ => respond::method_not_allowed(),
    }
}
