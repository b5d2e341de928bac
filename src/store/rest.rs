use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::{Client, Method};
use serde_json::json;

use crate::config::MarketplaceConfig;
use crate::identity::{Principal, DEFAULT_ROLE};
use crate::platform::runtime::{sleep, spawn_detached};
use crate::platform::token::AsyncTokenProvider;
use crate::store::api::{RemoteSetStore, SetListenerRegistration, SetSnapshotCallback};
use crate::store::connection::{document_id, encode_segment, FirestoreConnection};
use crate::store::error::{internal_error, invalid_argument, StoreResult};
use crate::util::BackoffConfig;

/// [`RemoteSetStore`] over the Firestore REST API.
///
/// Favorites live at `users/{uid}/favorites/{itemId}`. The REST surface has no
/// listen channel, so subscriptions poll the collection and deliver a snapshot
/// whenever its membership changes.
#[derive(Clone)]
pub struct FirestoreSetStore {
    inner: Arc<RestInner>,
}

struct RestInner {
    connection: FirestoreConnection,
    backoff: BackoffConfig,
}

pub struct FirestoreSetStoreBuilder {
    project_id: String,
    database: String,
    emulator_host: Option<String>,
    client: Option<Client>,
    token_provider: Option<Arc<dyn AsyncTokenProvider>>,
    poll_interval: Duration,
}

impl FirestoreSetStoreBuilder {
    fn new(project_id: String) -> Self {
        Self {
            project_id,
            database: crate::config::DEFAULT_DATABASE.to_string(),
            emulator_host: None,
            client: None,
            token_provider: None,
            poll_interval: Duration::from_millis(crate::config::DEFAULT_FAVORITES_POLL_INTERVAL_MS),
        }
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn emulator_host(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }

    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn token_provider(mut self, provider: Arc<dyn AsyncTokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn build(self) -> StoreResult<FirestoreSetStore> {
        let connection = FirestoreConnection::new(
            &self.project_id,
            &self.database,
            self.emulator_host.as_deref(),
            self.client,
            self.token_provider,
        )?;
        Ok(FirestoreSetStore {
            inner: Arc::new(RestInner {
                connection,
                backoff: BackoffConfig::with_interval(self.poll_interval),
            }),
        })
    }
}

impl FirestoreSetStore {
    pub fn builder(project_id: impl Into<String>) -> FirestoreSetStoreBuilder {
        FirestoreSetStoreBuilder::new(project_id.into())
    }

    pub fn from_config(
        config: &MarketplaceConfig,
        token_provider: Arc<dyn AsyncTokenProvider>,
    ) -> StoreResult<Self> {
        let project_id = config
            .require_project_id()
            .map_err(|err| invalid_argument(err.to_string()))?;
        let mut builder = Self::builder(project_id)
            .database(config.database.clone())
            .token_provider(token_provider)
            .poll_interval(config.favorites_poll_interval());
        if let Some(host) = &config.emulator_host {
            builder = builder.emulator_host(host.clone());
        }
        builder.build()
    }

    pub fn base_url(&self) -> &str {
        self.inner.connection.base_url()
    }

    /// Creates the `users/{uid}` profile after sign-in when it does not exist
    /// yet. Returns `true` when a profile was written.
    ///
    /// New profiles carry the principal's email (empty when unknown), a
    /// `createdAt` timestamp and the `user` role. Existing profiles are left
    /// untouched.
    pub async fn ensure_user_doc(&self, principal: &Principal) -> StoreResult<bool> {
        if principal.uid.is_empty() {
            return Err(invalid_argument("principal id must be non-empty"));
        }
        let path = format!("users/{}", encode_segment(&principal.uid));
        let connection = &self.inner.connection;
        if connection.invoke(Method::GET, &path, &[], None).await?.is_some() {
            return Ok(false);
        }
        let body = json!({
            "fields": {
                "email": { "stringValue": principal.email().unwrap_or_default() },
                "createdAt": {
                    "timestampValue": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
                },
                "role": { "stringValue": DEFAULT_ROLE }
            }
        });
        connection
            .invoke(
                Method::PATCH,
                &path,
                &[("currentDocument.exists", "false")],
                Some(body),
            )
            .await?
            .map(|_| true)
            .ok_or_else(|| {
                internal_error(format!("profile for {} could not be written", principal.uid))
            })
    }
}

impl RestInner {
    fn collection_path(principal_id: &str) -> String {
        format!("users/{}/favorites", encode_segment(principal_id))
    }

    fn document_path(principal_id: &str, item_id: &str) -> String {
        format!(
            "{}/{}",
            Self::collection_path(principal_id),
            encode_segment(item_id)
        )
    }

    async fn list(&self, principal_id: &str) -> StoreResult<BTreeSet<String>> {
        let documents = self
            .connection
            .list_documents(&Self::collection_path(principal_id))
            .await?;
        Ok(documents
            .iter()
            .filter_map(|document| document.get("name")?.as_str())
            .filter_map(document_id)
            .collect())
    }

    async fn poll(
        self: Arc<Self>,
        principal_id: String,
        callback: SetSnapshotCallback,
        cancelled: Arc<AtomicBool>,
    ) {
        let mut last: Option<BTreeSet<String>> = None;
        let mut failures = 0u32;

        while !cancelled.load(Ordering::SeqCst) {
            let result = self.list(&principal_id).await;
            if cancelled.load(Ordering::SeqCst) {
                break;
            }
            match result {
                Ok(items) => {
                    failures = 0;
                    if last.as_ref() != Some(&items) {
                        last = Some(items.clone());
                        callback(Ok(items));
                    }
                }
                Err(err) => {
                    if failures == 0 {
                        log::warn!("favorites poll for {principal_id} failed: {err}");
                        last = None;
                        callback(Err(err));
                    }
                    failures = failures.saturating_add(1);
                }
            }
            sleep(self.backoff.delay_after(failures)).await;
        }
        log::debug!("favorites poll for {principal_id} stopped");
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RemoteSetStore for FirestoreSetStore {
    fn subscribe(
        &self,
        principal_id: &str,
        callback: SetSnapshotCallback,
    ) -> StoreResult<SetListenerRegistration> {
        if principal_id.is_empty() {
            return Err(invalid_argument("principal id must be non-empty"));
        }
        let cancelled = Arc::new(AtomicBool::new(false));
        spawn_detached(Arc::clone(&self.inner).poll(
            principal_id.to_string(),
            callback,
            Arc::clone(&cancelled),
        ));
        Ok(SetListenerRegistration::new(move || {
            cancelled.store(true, Ordering::SeqCst);
        }))
    }

    async fn fetch(&self, principal_id: &str) -> StoreResult<BTreeSet<String>> {
        self.inner.list(principal_id).await
    }

    async fn insert(&self, principal_id: &str, item_id: &str) -> StoreResult<()> {
        if principal_id.is_empty() || item_id.is_empty() {
            return Err(invalid_argument("principal and item ids must be non-empty"));
        }
        let body = json!({
            "fields": {
                "listingId": { "stringValue": item_id },
                "createdAt": {
                    "timestampValue": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
                }
            }
        });
        let path = RestInner::document_path(principal_id, item_id);
        self.inner
            .connection
            .invoke(Method::PATCH, &path, &[], Some(body))
            .await?
            .map(|_| ())
            .ok_or_else(|| internal_error(format!("favorite {item_id} could not be written")))
    }

    async fn remove(&self, principal_id: &str, item_id: &str) -> StoreResult<()> {
        if principal_id.is_empty() || item_id.is_empty() {
            return Err(invalid_argument("principal and item ids must be non-empty"));
        }
        let path = RestInner::document_path(principal_id, item_id);
        // Deleting a missing favorite is not an error.
        self.inner
            .connection
            .invoke(Method::DELETE, &path, &[], None)
            .await?;
        Ok(())
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::platform::token::StaticTokenProvider;
    use crate::store::StoreErrorCode;
    use httpmock::Method::{DELETE, GET, PATCH};
    use httpmock::MockServer;
    use serde_json::Value as JsonValue;
    use std::panic;
    use std::sync::Mutex;

    const COLLECTION: &str = "/v1/projects/demo/databases/test-db/documents/users/u1/favorites";

    fn start_server(test: &str) -> Option<MockServer> {
        match panic::catch_unwind(|| MockServer::start()) {
            Ok(server) => Some(server),
            Err(_) => {
                eprintln!("Skipping {test}: unable to bind mock server in this environment");
                None
            }
        }
    }

    fn store_for(server: &MockServer) -> FirestoreSetStore {
        FirestoreSetStore::builder("demo")
            .database("test-db")
            .emulator_host(server.address().to_string())
            .token_provider(Arc::new(StaticTokenProvider::new(Some("token-1".into()))))
            .poll_interval(Duration::from_millis(20))
            .build()
            .unwrap()
    }

    fn documents(ids: &[&str]) -> JsonValue {
        let documents: Vec<_> = ids
            .iter()
            .map(|id| {
                json!({
                    "name": format!("projects/demo/databases/test-db/documents/users/u1/favorites/{id}"),
                    "fields": { "listingId": { "stringValue": id } }
                })
            })
            .collect();
        json!({ "documents": documents })
    }

    #[tokio::test(flavor = "current_thread")]
    async fn fetch_reads_document_ids() {
        let Some(server) = start_server("fetch_reads_document_ids") else {
            return;
        };
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path(COLLECTION)
                .header("authorization", "Bearer token-1");
            then.status(200).json_body(documents(&["l-1", "l-2"]));
        });

        let items = store_for(&server).fetch("u1").await.unwrap();
        assert_eq!(
            items.into_iter().collect::<Vec<_>>(),
            vec!["l-1".to_string(), "l-2".to_string()]
        );
        mock.assert();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn missing_collection_is_empty() {
        let Some(server) = start_server("missing_collection_is_empty") else {
            return;
        };
        server.mock(|when, then| {
            when.method(GET).path(COLLECTION);
            then.status(404);
        });

        assert!(store_for(&server).fetch("u1").await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn insert_and_remove_write_documents() {
        let Some(server) = start_server("insert_and_remove_write_documents") else {
            return;
        };
        let patch = server.mock(|when, then| {
            when.method(PATCH)
                .path(format!("{COLLECTION}/l-9"))
                .body_contains("\"stringValue\":\"l-9\"");
            then.status(200).json_body(json!({ "name": "ignored" }));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path(format!("{COLLECTION}/l-9"));
            then.status(404);
        });

        let store = store_for(&server);
        store.insert("u1", "l-9").await.unwrap();
        store.remove("u1", "l-9").await.unwrap();
        patch.assert();
        delete.assert();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn permission_errors_are_mapped() {
        let Some(server) = start_server("permission_errors_are_mapped") else {
            return;
        };
        server.mock(|when, then| {
            when.method(PATCH).path(format!("{COLLECTION}/l-1"));
            then.status(403).json_body(json!({
                "error": { "code": 403, "message": "denied", "status": "PERMISSION_DENIED" }
            }));
        });

        let err = store_for(&server).insert("u1", "l-1").await.unwrap_err();
        assert_eq!(err.code, StoreErrorCode::PermissionDenied);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn subscription_polls_until_detached() {
        let Some(server) = start_server("subscription_polls_until_detached") else {
            return;
        };
        server.mock(|when, then| {
            when.method(GET).path(COLLECTION);
            then.status(200).json_body(documents(&["l-1"]));
        });

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let registration = store_for(&server)
            .subscribe(
                "u1",
                Arc::new(move |snapshot: StoreResult<BTreeSet<String>>| {
                    sink.lock().unwrap().push(snapshot)
                }),
            )
            .unwrap();

        for _ in 0..100 {
            if !events.lock().unwrap().is_empty() {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        sleep(Duration::from_millis(100)).await;
        registration.detach();

        let events = events.lock().unwrap();
        // Unchanged polls are not re-delivered.
        assert_eq!(events.len(), 1);
        assert!(events[0].as_ref().unwrap().contains("l-1"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ensure_user_doc_creates_missing_profiles() {
        let Some(server) = start_server("ensure_user_doc_creates_missing_profiles") else {
            return;
        };
        let profile = "/v1/projects/demo/databases/test-db/documents/users/u1";
        let lookup = server.mock(|when, then| {
            when.method(GET).path(profile);
            then.status(404);
        });
        let create = server.mock(|when, then| {
            when.method(PATCH)
                .path(profile)
                .query_param("currentDocument.exists", "false")
                .body_contains("\"role\":{\"stringValue\":\"user\"}")
                .body_contains("\"email\":{\"stringValue\":\"buyer@example.com\"}");
            then.status(200).json_body(json!({ "name": "ignored" }));
        });

        let principal = Principal::new("u1").with_email("buyer@example.com");
        assert!(store_for(&server).ensure_user_doc(&principal).await.unwrap());
        lookup.assert();
        create.assert();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ensure_user_doc_keeps_existing_profiles() {
        let Some(server) = start_server("ensure_user_doc_keeps_existing_profiles") else {
            return;
        };
        let profile = "/v1/projects/demo/databases/test-db/documents/users/u1";
        server.mock(|when, then| {
            when.method(GET).path(profile);
            then.status(200).json_body(json!({
                "name": "projects/demo/databases/test-db/documents/users/u1",
                "fields": { "role": { "stringValue": "admin" } }
            }));
        });
        let create = server.mock(|when, then| {
            when.method(PATCH).path(profile);
            then.status(200);
        });

        let created = store_for(&server)
            .ensure_user_doc(&Principal::new("u1"))
            .await
            .unwrap();
        assert!(!created);
        create.assert_hits(0);
    }
}
