//! Scoped data-store clients over the hosted store's REST interface.
//!
//! Every request carries the tenant `apikey` plus the caller's own bearer
//! token, so the store's row-security policies decide what the caller sees.

use dayplan_atoms::store::{TaskQuery, TaskStore};
use dayplan_atoms::tasks::model::{NewTaskRow, Task, TaskChanges};
use dayplan_atoms::StoreError;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::auth::IdentityContext;
use crate::config::{AppConfig, ConfigError};

const DAY_ORDER: &str = "priority.asc,scheduled_time.asc.nullslast";

/// Hands out per-request store handles bound to one caller.
pub trait ScopedStoreFactory: Send + Sync {
    type Client: TaskStore;

    fn scoped(&self, identity: &IdentityContext) -> Self::Client;
}

/// Holds the pooled HTTP client; cheap to clone into each [`ScopedClient`].
#[derive(Clone)]
pub struct StoreClientFactory {
    http: reqwest::Client,
    table_url: Url,
    api_key: String,
}

impl std::fmt::Debug for StoreClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClientFactory")
            .field("table_url", &self.table_url.as_str())
            .finish_non_exhaustive()
    }
}

pub(crate) fn table_url(store_url: &str, table: &str) -> Result<Url, ConfigError> {
    Url::parse(&format!("{}/rest/v1/{}", store_url.trim_end_matches('/'), table)).map_err(|e| {
        ConfigError::Invalid {
            field: "SUPABASE_URL",
            reason: e.to_string(),
        }
    })
}

impl StoreClientFactory {
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.store_timeout)
            .build()
            .map_err(|e| ConfigError::Invalid {
                field: "STORE_TIMEOUT_SECS",
                reason: e.to_string(),
            })?;

        Ok(StoreClientFactory {
            http,
            table_url: table_url(&config.store_url, &config.tasks_table)?,
            api_key: config.anon_key.clone(),
        })
    }
}

impl ScopedStoreFactory for StoreClientFactory {
    type Client = ScopedClient;

    fn scoped(&self, identity: &IdentityContext) -> ScopedClient {
        ScopedClient {
            http: self.http.clone(),
            table_url: self.table_url.clone(),
            api_key: self.api_key.clone(),
            token: identity.token.clone(),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ScopedStoreFactory for dayplan_atoms::memory::MemoryStore {
    type Client = dayplan_atoms::memory::MemoryStore;

    fn scoped(&self, identity: &IdentityContext) -> Self::Client {
        self.as_user(&identity.user_id)
    }
}

/// A store handle acting as one caller. Lives for a single request.
pub struct ScopedClient {
    http: reqwest::Client,
    table_url: Url,
    api_key: String,
    token: String,
}

impl std::fmt::Debug for ScopedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedClient")
            .field("table_url", &self.table_url.as_str())
            .finish_non_exhaustive()
    }
}

/// `GET` target for a filtered, day-ordered select.
pub(crate) fn select_url(table: &Url, query: &TaskQuery) -> Url {
    let mut url = table.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("select", "*");
        if let Some(id) = &query.id {
            pairs.append_pair("id", &format!("eq.{}", id));
        }
        if let Some(status) = query.status {
            pairs.append_pair("status", &format!("eq.{}", status.as_str()));
        }
        if let Some(date) = query.scheduled_for {
            pairs.append_pair("scheduled_for", &format!("eq.{}", date.format("%Y-%m-%d")));
        }
        pairs.append_pair("order", DAY_ORDER);
    }
    url
}

/// Target for a write addressed to one row.
pub(crate) fn row_url(table: &Url, id: &str) -> Url {
    let mut url = table.clone();
    url.query_pairs_mut()
        .append_pair("id", &format!("eq.{}", id))
        .append_pair("select", "*");
    url
}

/// Postgres `invalid_text_representation`: the id cannot be a value of the
/// column's type.
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

/// An id the `id` column cannot even parse matches no row.
pub(crate) fn none_for_unparseable_id(
    result: Result<Vec<Task>, StoreError>,
) -> Result<Vec<Task>, StoreError> {
    match result {
        Err(StoreError::Status { status: 400, body }) if body.contains(INVALID_TEXT_REPRESENTATION) => {
            tracing::debug!("id rejected by the store, treating as absent");
            Ok(Vec::new())
        }
        other => other,
    }
}

impl ScopedClient {
    /// Tenant key plus the caller's own token; every request goes through here.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.token)
    }

    fn select_request(&self, query: &TaskQuery) -> RequestBuilder {
        self.authorize(self.http.get(select_url(&self.table_url, query)))
    }

    fn insert_request(&self, row: &NewTaskRow) -> RequestBuilder {
        let mut url = self.table_url.clone();
        url.query_pairs_mut().append_pair("select", "*");
        self.authorize(self.http.post(url))
            .header("Prefer", "return=representation")
            .json(row)
    }

    fn update_request(&self, id: &str, changes: &TaskChanges) -> RequestBuilder {
        self.authorize(self.http.patch(row_url(&self.table_url, id)))
            .header("Prefer", "return=representation")
            .json(changes)
    }

    fn delete_request(&self, id: &str) -> RequestBuilder {
        self.authorize(self.http.delete(row_url(&self.table_url, id)))
            .header("Prefer", "return=representation")
    }

    async fn send<T: DeserializeOwned>(
        &self,
        op: &'static str,
        request: RequestBuilder,
    ) -> Result<T, StoreError> {
        let resp = request.send().await.map_err(|e| {
            tracing::error!(op, error = %e, "store request failed");
            StoreError::Transport(e.to_string())
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if status == StatusCode::UNAUTHORIZED {
                tracing::warn!(op, "store rejected caller token");
                return Err(StoreError::Unauthorized(body));
            }
            let bad_id = status == StatusCode::BAD_REQUEST && body.contains(INVALID_TEXT_REPRESENTATION);
            if !bad_id {
                tracing::error!(op, status = status.as_u16(), "store request failed");
            }
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>().await.map_err(|e| {
            tracing::error!(op, error = %e, "store response did not decode");
            StoreError::Decode(e.to_string())
        })
    }
}

impl TaskStore for ScopedClient {
    async fn select(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let result = self.send("select", self.select_request(query)).await;
        if query.id.is_some() {
            return none_for_unparseable_id(result);
        }
        result
    }

    async fn insert(&self, row: &NewTaskRow) -> Result<Task, StoreError> {
        let mut rows: Vec<Task> = self.send("insert", self.insert_request(row)).await?;
        if rows.is_empty() {
            return Err(StoreError::Decode("insert returned no rows".to_string()));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(&self, id: &str, changes: &TaskChanges) -> Result<Vec<Task>, StoreError> {
        none_for_unparseable_id(self.send("update", self.update_request(id, changes)).await)
    }

    async fn delete(&self, id: &str) -> Result<Vec<Task>, StoreError> {
        none_for_unparseable_id(self.send("delete", self.delete_request(id)).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenVerification;
    use chrono::NaiveDate;
    use dayplan_atoms::tasks::TaskStatus;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn table() -> Url {
        table_url("https://demo.supabase.co/", "tasks").unwrap()
    }

    fn config() -> AppConfig {
        AppConfig {
            store_url: "https://demo.supabase.co".into(),
            anon_key: "anon".into(),
            service_key: None,
            tasks_table: "tasks".into(),
            store_timeout: Duration::from_secs(10),
            verification: TokenVerification::PassThrough,
        }
    }

    #[test]
    fn table_url_lives_under_rest_prefix() {
        assert_eq!(table().as_str(), "https://demo.supabase.co/rest/v1/tasks");
    }

    #[test]
    fn bad_store_url_is_a_config_error() {
        assert!(matches!(
            table_url("not a url", "tasks"),
            Err(ConfigError::Invalid { field: "SUPABASE_URL", .. })
        ));
    }

    #[test]
    fn unfiltered_select_is_day_ordered() {
        let url = select_url(&table(), &TaskQuery::default());
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "*".to_string()),
                ("order".to_string(), DAY_ORDER.to_string()),
            ]
        );
    }

    #[test]
    fn filters_become_equality_operators() {
        let query = TaskQuery {
            id: None,
            status: Some(TaskStatus::InProgress),
            scheduled_for: NaiveDate::from_ymd_opt(2026, 10, 19),
        };
        let url = select_url(&table(), &query);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("status".to_string(), "eq.in_progress".to_string())));
        assert!(pairs.contains(&("scheduled_for".to_string(), "eq.2026-10-19".to_string())));
    }

    #[test]
    fn row_ids_are_escaped() {
        let url = row_url(&table(), "7&user_id=eq.bob");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("id".to_string(), "eq.7&user_id=eq.bob".to_string()));
        assert_eq!(pairs.len(), 2);
    }

    fn alice_client() -> ScopedClient {
        let factory = StoreClientFactory::new(&config()).unwrap();
        factory.scoped(&IdentityContext {
            user_id: "alice".into(),
            token: "caller-token".into(),
            email: None,
        })
    }

    fn header<'a>(request: &'a reqwest::Request, name: &str) -> Option<&'a str> {
        request.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn changes() -> TaskChanges {
        TaskChanges {
            title: Some("Renamed".into()),
            status: None,
            priority: None,
            scheduled_for: None,
            scheduled_time: None,
            updated_at: "2026-10-19T12:00:00+00:00".into(),
        }
    }

    fn new_row() -> NewTaskRow {
        NewTaskRow {
            user_id: "alice".into(),
            title: "Water plants".into(),
            status: TaskStatus::Pending,
            priority: 5,
            scheduled_for: None,
            scheduled_time: None,
        }
    }

    #[test]
    fn every_request_carries_tenant_key_and_caller_token() {
        let client = alice_client();
        let requests = [
            ("GET", client.select_request(&TaskQuery::by_id("7")).build().unwrap()),
            ("POST", client.insert_request(&new_row()).build().unwrap()),
            ("PATCH", client.update_request("7", &changes()).build().unwrap()),
            ("DELETE", client.delete_request("7").build().unwrap()),
        ];

        for (method, request) in &requests {
            assert_eq!(request.method().as_str(), *method);
            assert_eq!(header(request, "apikey"), Some("anon"));
            assert_eq!(header(request, "authorization"), Some("Bearer caller-token"));
        }
        assert!(!format!("{:?}", client).contains("caller-token"));
    }

    #[test]
    fn writes_ask_for_the_affected_rows() {
        let client = alice_client();
        for request in [
            client.insert_request(&new_row()).build().unwrap(),
            client.update_request("7", &changes()).build().unwrap(),
            client.delete_request("7").build().unwrap(),
        ] {
            assert_eq!(header(&request, "prefer"), Some("return=representation"));
        }

        let select = client.select_request(&TaskQuery::default()).build().unwrap();
        assert_eq!(header(&select, "prefer"), None);
    }

    #[test]
    fn write_bodies_are_json() {
        let client = alice_client();
        let update = client.update_request("7", &changes()).build().unwrap();
        assert_eq!(header(&update, "content-type"), Some("application/json"));
        let body: serde_json::Value =
            serde_json::from_slice(update.body().and_then(|b| b.as_bytes()).unwrap()).unwrap();
        assert_eq!(body["title"], "Renamed");
        assert!(body.get("status").is_none());
        assert_eq!(
            update.url().query_pairs().next().map(|(k, v)| (k.into_owned(), v.into_owned())),
            Some(("id".to_string(), "eq.7".to_string()))
        );
    }

    #[test]
    fn unparseable_id_matches_no_row() {
        let rejected = Err(StoreError::Status {
            status: 400,
            body: r#"{"code":"22P02","message":"invalid input syntax for type uuid"}"#
                .to_string(),
        });
        assert_eq!(none_for_unparseable_id(rejected).unwrap(), vec![]);
    }

    #[rstest::rstest]
    #[case(400, r#"{"code":"PGRST100","message":"failed to parse filter"}"#)]
    #[case(500, r#"{"code":"22P02"}"#)]
    fn other_store_failures_still_fail(#[case] status: u16, #[case] body: &str) {
        let result = none_for_unparseable_id(Err(StoreError::Status {
            status,
            body: body.to_string(),
        }));
        assert!(matches!(result, Err(StoreError::Status { .. })));
    }

    #[tokio::test]
    async fn memory_factory_scopes_to_the_subject() {
        let store = dayplan_atoms::memory::MemoryStore::new();
        let identity = IdentityContext {
            user_id: "alice".into(),
            token: "t".into(),
            email: None,
        };
        let scoped = store.scoped(&identity);
        scoped.insert(&new_row()).await.unwrap();
        assert_eq!(store.as_user("bob").select(&TaskQuery::default()).await.unwrap(), vec![]);
    }
}
