//! Process-wide plumbing for the day planner API: configuration, bearer-token
//! identity, per-request store clients, and the shared `AppState`.

pub mod auth;
pub mod config;
pub mod store;
pub mod users;

use lambda_http::Request;

use auth::{AuthError, IdentityContext, TokenVerifier};
use config::{AppConfig, ConfigError};
use store::{ScopedStoreFactory, StoreClientFactory};
use users::AuthAdmin;

/// Built once at cold start and shared by every invocation.
#[derive(Debug)]
pub struct AppState<F = StoreClientFactory> {
    pub verifier: TokenVerifier,
    pub stores: F,
    pub admin: Option<AuthAdmin>,
}

impl AppState<StoreClientFactory> {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let verifier = TokenVerifier::from_config(&config.verification)?;
        if verifier.is_passthrough() {
            tracing::warn!("token signatures are NOT verified; trusting an upstream gateway");
        }

        Ok(AppState {
            verifier,
            stores: StoreClientFactory::new(config)?,
            admin: AuthAdmin::from_config(config)?,
        })
    }
}

impl<F: ScopedStoreFactory> AppState<F> {
    pub fn authenticate(&self, event: &Request) -> Result<IdentityContext, AuthError> {
        auth::authenticate_request(&self.verifier, event)
    }

    pub fn store_for(&self, identity: &IdentityContext) -> F::Client {
        self.stores.scoped(identity)
    }
}
