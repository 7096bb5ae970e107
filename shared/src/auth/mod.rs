//! Identity Token Adapter: turns an `Authorization` header into the caller's
//! identity, or a rejection.

pub mod error;
pub mod verifier;

use chrono::{DateTime, Utc};
use lambda_http::Request;
use serde::Deserialize;

pub use error::AuthError;
pub use verifier::TokenVerifier;

use verifier::{decode_segment, CompactToken};

/// Per-request identity. Never persisted; dropped with the request.
#[derive(Clone, PartialEq)]
pub struct IdentityContext {
    /// `sub` claim of the bearer token.
    pub user_id: String,
    /// The raw token, scheme stripped, forwarded to the store as-is.
    pub token: String,
    /// `email` claim, when the issuer includes one.
    pub email: Option<String>,
}

impl std::fmt::Debug for IdentityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityContext")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct Claims {
    sub: Option<String>,
    exp: Option<f64>,
    email: Option<String>,
}

/// Strip the `Bearer` scheme. A header without a scheme is taken as the raw token.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?.trim();
    let token = match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => header,
    };
    if token.is_empty() {
        return Err(AuthError::InvalidCredentials("empty bearer token".to_string()));
    }
    Ok(token)
}

/// Validate the header against `verifier` and read the caller's identity.
pub fn authenticate(verifier: &TokenVerifier, header: Option<&str>) -> Result<IdentityContext, AuthError> {
    authenticate_at(verifier, header, Utc::now())
}

pub fn authenticate_at(
    verifier: &TokenVerifier,
    header: Option<&str>,
    now: DateTime<Utc>,
) -> Result<IdentityContext, AuthError> {
    let token = bearer_token(header)?;
    let compact = CompactToken::parse(token)?;
    verifier.verify(&compact)?;

    let claims: Claims = serde_json::from_slice(&decode_segment(compact.payload)?)
        .map_err(|e| AuthError::InvalidCredentials(format!("unreadable claims: {}", e)))?;

    if let Some(exp) = claims.exp {
        let now_secs = now.timestamp_millis() as f64 / 1000.0;
        if exp < now_secs {
            return Err(AuthError::ExpiredCredentials);
        }
    }

    let user_id = claims
        .sub
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::InvalidCredentials("missing sub claim".to_string()))?;

    Ok(IdentityContext {
        user_id,
        token: token.to_string(),
        email: claims.email,
    })
}

/// Read the `Authorization` header of a request and authenticate it.
pub fn authenticate_request(verifier: &TokenVerifier, event: &Request) -> Result<IdentityContext, AuthError> {
    let header = match event.headers().get("Authorization") {
        Some(value) => Some(value.to_str().map_err(|_| {
            AuthError::InvalidCredentials("Authorization header is not valid text".to_string())
        })?),
        None => None,
    };

    let result = authenticate(verifier, header);
    if let Err(e) = &result {
        tracing::info!(reason = %e, "request rejected");
    }
    result
}
