use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

/// JSON response with the given status.
pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(value)?.into())
        .map_err(Box::new)?)
}

pub fn no_content() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Body::Empty)
        .map_err(Box::new)?)
}

pub fn not_found() -> Result<Response<Body>, Error> {
    json(StatusCode::NOT_FOUND, &serde_json::json!({"error": "Not found"}))
}

pub fn method_not_allowed() -> Result<Response<Body>, Error> {
    json(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({"error": "Method not allowed"}),
    )
}
