use dayplan_atoms::ApiError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("Authorization header missing")]
    MissingCredentials,

    #[error("Token expired")]
    ExpiredCredentials,

    #[error("Invalid token: {0}")]
    InvalidCredentials(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthenticated(err.to_string())
    }
}
