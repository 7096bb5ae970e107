use dayplan_atoms::respond;
use dayplan_atoms::users::UserProfile;
use lambda_http::{http::StatusCode, Body, Error, Response};
use reqwest::Url;
use serde::Deserialize;

use crate::auth::IdentityContext;
use crate::config::{AppConfig, ConfigError};

/// Privileged lookups against the store's auth directory. Only built when a
/// service key is configured.
#[derive(Clone)]
pub struct AuthAdmin {
    http: reqwest::Client,
    users_url: Url,
    service_key: String,
}

impl std::fmt::Debug for AuthAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthAdmin")
            .field("users_url", &self.users_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct AdminUser {
    email: Option<String>,
}

impl AuthAdmin {
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, ConfigError> {
        let Some(service_key) = config.service_key.clone() else {
            return Ok(None);
        };

        let users_url = Url::parse(&format!("{}/auth/v1/admin/users/", config.store_url))
            .map_err(|e| ConfigError::Invalid {
                field: "SUPABASE_URL",
                reason: e.to_string(),
            })?;
        let http = reqwest::Client::builder()
            .timeout(config.store_timeout)
            .build()
            .map_err(|e| ConfigError::Invalid {
                field: "STORE_TIMEOUT_SECS",
                reason: e.to_string(),
            })?;

        Ok(Some(AuthAdmin {
            http,
            users_url,
            service_key,
        }))
    }

    fn user_url(&self, user_id: &str) -> Option<Url> {
        let mut url = self.users_url.clone();
        url.path_segments_mut().ok()?.pop_if_empty().push(user_id);
        Some(url)
    }

    /// The directory's email for `user_id`. `None` on any failure.
    pub async fn lookup_email(&self, user_id: &str) -> Option<String> {
        let url = self.user_url(user_id)?;
        let resp = match self
            .http
            .get(url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "auth directory lookup failed");
                return None;
            }
        };

        if !resp.status().is_success() {
            tracing::warn!(status = resp.status().as_u16(), "auth directory lookup rejected");
            return None;
        }

        match resp.json::<AdminUser>().await {
            Ok(user) => user.email,
            Err(e) => {
                tracing::warn!(error = %e, "auth directory response did not decode");
                None
            }
        }
    }
}

/// HTTP Handler: GET /auth/me
pub async fn me_handler(
    admin: Option<&AuthAdmin>,
    identity: &IdentityContext,
) -> Result<Response<Body>, Error> {
    let looked_up = match admin {
        Some(admin) => admin.lookup_email(&identity.user_id).await,
        None => None,
    };
    let profile = UserProfile::best_effort(&identity.user_id, looked_up, identity.email.as_deref());
    respond::json(StatusCode::OK, &profile)
}
