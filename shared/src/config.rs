//! Process configuration, read once at startup and never mutated.

use std::env;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_TASKS_TABLE: &str = "tasks";
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// How bearer tokens are checked before their claims are trusted.
#[derive(Clone, PartialEq)]
pub enum TokenVerification {
    /// Claims are read without a signature check. Only for deployments where
    /// a gateway in front of this service has already verified the token.
    PassThrough,
    Hs256 { secret: String },
    Rs256 { public_key_pem: String },
}

impl std::fmt::Debug for TokenVerification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TokenVerification::PassThrough => "PassThrough",
            TokenVerification::Hs256 { .. } => "Hs256",
            TokenVerification::Rs256 { .. } => "Rs256",
        })
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Store base URL, e.g. `https://xyz.supabase.co`.
    pub store_url: String,
    /// Tenant API-identification key sent as `apikey` on every store call.
    pub anon_key: String,
    /// Enables the auth admin email lookup for `/auth/me`.
    pub service_key: Option<String>,
    pub tasks_table: String,
    pub store_timeout: Duration,
    pub verification: TokenVerification,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("store_url", &self.store_url)
            .field("service_key", &self.service_key.is_some())
            .field("tasks_table", &self.tasks_table)
            .field("store_timeout", &self.store_timeout)
            .field("verification", &self.verification)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let store_url = get("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let anon_key = get("SUPABASE_ANON_KEY")
            .or_else(|| get("SUPABASE_KEY"))
            .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;
        let service_key = get("SUPABASE_SERVICE_KEY");
        let tasks_table = get("TASKS_TABLE").unwrap_or_else(|| DEFAULT_TASKS_TABLE.to_string());

        let store_timeout = match get("STORE_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
                    field: "STORE_TIMEOUT_SECS",
                    reason: format!("'{}' is not a whole number of seconds", raw),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        field: "STORE_TIMEOUT_SECS",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
        };

        let jwt_secret = get("SUPABASE_JWT_SECRET");
        let public_key = get("JWT_PUBLIC_KEY_PEM");
        let verification = match get("TOKEN_VERIFICATION").as_deref() {
            Some("passthrough") => TokenVerification::PassThrough,
            Some("hs256") => TokenVerification::Hs256 {
                secret: jwt_secret.ok_or(ConfigError::Missing("SUPABASE_JWT_SECRET"))?,
            },
            Some("rs256") => TokenVerification::Rs256 {
                public_key_pem: public_key.ok_or(ConfigError::Missing("JWT_PUBLIC_KEY_PEM"))?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    field: "TOKEN_VERIFICATION",
                    reason: format!("expected passthrough, hs256 or rs256, got '{}'", other),
                })
            }
            None => match (jwt_secret, public_key) {
                (Some(secret), _) => TokenVerification::Hs256 { secret },
                (None, Some(public_key_pem)) => TokenVerification::Rs256 { public_key_pem },
                (None, None) => return Err(ConfigError::Missing("SUPABASE_JWT_SECRET")),
            },
        };

        Ok(AppConfig {
            store_url: store_url.trim_end_matches('/').to_string(),
            anon_key,
            service_key,
            tasks_table,
            store_timeout,
            verification,
        })
    }
}
