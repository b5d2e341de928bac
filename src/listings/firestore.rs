use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value as JsonValue};

use crate::config::MarketplaceConfig;
use crate::listings::model::Listing;
use crate::listings::store::ListingStore;
use crate::platform::token::AsyncTokenProvider;
use crate::store::value::{decode_document_fields, encode_fields, encode_timestamp_or_string};
use crate::store::{
    document_id, encode_segment, internal_error, invalid_argument, FirestoreConnection,
    StoreResult,
};

const LISTINGS_COLLECTION: &str = "listings";

/// [`ListingStore`] over the Firestore REST API.
///
/// Listings live at `listings/{id}`. Writes replace the whole document and
/// owner lookups run a `runQuery` with an `ownerId` equality filter.
#[derive(Clone)]
pub struct FirestoreListingStore {
    connection: Arc<FirestoreConnection>,
}

pub struct FirestoreListingStoreBuilder {
    project_id: String,
    database: String,
    emulator_host: Option<String>,
    client: Option<Client>,
    token_provider: Option<Arc<dyn AsyncTokenProvider>>,
}

impl FirestoreListingStoreBuilder {
    fn new(project_id: String) -> Self {
        Self {
            project_id,
            database: crate::config::DEFAULT_DATABASE.to_string(),
            emulator_host: None,
            client: None,
            token_provider: None,
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

    pub fn build(self) -> StoreResult<FirestoreListingStore> {
        let connection = FirestoreConnection::new(
            &self.project_id,
            &self.database,
            self.emulator_host.as_deref(),
            self.client,
            self.token_provider,
        )?;
        Ok(FirestoreListingStore {
            connection: Arc::new(connection),
        })
    }
}

impl FirestoreListingStore {
    pub fn builder(project_id: impl Into<String>) -> FirestoreListingStoreBuilder {
        FirestoreListingStoreBuilder::new(project_id.into())
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
            .token_provider(token_provider);
        if let Some(host) = &config.emulator_host {
            builder = builder.emulator_host(host.clone());
        }
        builder.build()
    }

    pub fn base_url(&self) -> &str {
        self.connection.base_url()
    }

    fn document_path(id: &str) -> String {
        format!("{LISTINGS_COLLECTION}/{}", encode_segment(id))
    }
}

/// Decodes a REST document. The document name supplies the id when the
/// fields lack one.
fn listing_from_document(document: &JsonValue) -> StoreResult<Listing> {
    let mut fields = decode_document_fields(document)?;
    let has_id = matches!(fields.get("id"), Some(JsonValue::String(id)) if !id.is_empty());
    if !has_id {
        if let Some(id) = document
            .get("name")
            .and_then(JsonValue::as_str)
            .and_then(document_id)
        {
            fields.insert("id".to_string(), JsonValue::String(id));
        }
    }
    serde_json::from_value(JsonValue::Object(fields))
        .map_err(|err| internal_error(format!("invalid listing document: {err}")))
}

fn listing_to_document(listing: &Listing) -> StoreResult<JsonValue> {
    let JsonValue::Object(object) = serde_json::to_value(listing)
        .map_err(|err| internal_error(format!("listing could not be encoded: {err}")))?
    else {
        return Err(internal_error("listing did not encode as an object"));
    };
    let mut fields = encode_fields(&object);
    if let (Some(created_at), Some(encoded)) =
        (listing.created_at.as_deref(), fields.as_object_mut())
    {
        encoded.insert("createdAt".to_string(), encode_timestamp_or_string(created_at));
    }
    Ok(json!({ "fields": fields }))
}

fn owner_query(owner_id: &str) -> JsonValue {
    json!({
        "from": [{ "collectionId": LISTINGS_COLLECTION }],
        "where": {
            "fieldFilter": {
                "field": { "fieldPath": "ownerId" },
                "op": "EQUAL",
                "value": { "stringValue": owner_id }
            }
        }
    })
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ListingStore for FirestoreListingStore {
    async fn list_all(&self) -> StoreResult<Vec<Listing>> {
        self.connection
            .list_documents(LISTINGS_COLLECTION)
            .await?
            .iter()
            .map(listing_from_document)
            .collect()
    }

    async fn list_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Listing>> {
        if owner_id.is_empty() {
            return Err(invalid_argument("owner id must be non-empty"));
        }
        self.connection
            .run_query(owner_query(owner_id))
            .await?
            .iter()
            .map(listing_from_document)
            .collect()
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Listing>> {
        if id.is_empty() {
            return Ok(None);
        }
        self.connection
            .invoke(Method::GET, &Self::document_path(id), &[], None)
            .await?
            .map(|document| listing_from_document(&document))
            .transpose()
    }

    async fn put(&self, listing: Listing) -> StoreResult<()> {
        if listing.id.is_empty() {
            return Err(invalid_argument("listing id must be non-empty"));
        }
        let body = listing_to_document(&listing)?;
        self.connection
            .invoke(Method::PATCH, &Self::document_path(&listing.id), &[], Some(body))
            .await?
            .map(|_| ())
            .ok_or_else(|| internal_error(format!("listing {} could not be written", listing.id)))
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        if id.is_empty() {
            return Err(invalid_argument("listing id must be non-empty"));
        }
        // A missing listing counts as deleted.
        self.connection
            .invoke(Method::DELETE, &Self::document_path(id), &[], None)
            .await?;
        Ok(())
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::platform::token::StaticTokenProvider;
    use crate::store::StoreErrorCode;
    use httpmock::Method::{DELETE, GET, PATCH, POST};
    use httpmock::MockServer;
    use std::panic;

    const ROOT: &str = "/v1/projects/demo/databases/test-db/documents";

    fn start_server(test: &str) -> Option<MockServer> {
        match panic::catch_unwind(|| MockServer::start()) {
            Ok(server) => Some(server),
            Err(_) => {
                eprintln!("Skipping {test}: unable to bind mock server in this environment");
                None
            }
        }
    }

    fn store_for(server: &MockServer) -> FirestoreListingStore {
        FirestoreListingStore::builder("demo")
            .database("test-db")
            .emulator_host(server.address().to_string())
            .token_provider(Arc::new(StaticTokenProvider::new(Some("token-1".into()))))
            .build()
            .unwrap()
    }

    fn document(id: &str, owner: &str, price: &str) -> JsonValue {
        json!({
            "name": format!("projects/demo/databases/test-db/documents/listings/{id}"),
            "fields": {
                "ownerId": { "stringValue": owner },
                "mode": { "stringValue": "buy" },
                "address": { "stringValue": "12 Oak Ave" },
                "price": { "integerValue": price },
                "lat": { "doubleValue": 30.25 },
                "lng": { "doubleValue": -97.75 },
                "photos": { "arrayValue": { "values": [{ "stringValue": "https://img/1.jpg" }] } },
                "createdAt": { "timestampValue": "2024-05-01T10:00:00Z" }
            }
        })
    }

    #[tokio::test(flavor = "current_thread")]
    async fn lists_every_listing_with_ids_from_names() {
        let Some(server) = start_server("lists_every_listing_with_ids_from_names") else {
            return;
        };
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path(format!("{ROOT}/listings"))
                .header("authorization", "Bearer token-1");
            then.status(200).json_body(json!({
                "documents": [document("l-1", "u1", "350000"), document("l-2", "u2", "1800")]
            }));
        });

        let listings = store_for(&server).list_all().await.unwrap();
        mock.assert();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].id, "l-1");
        assert_eq!(listings[0].price, 350_000.0);
        assert_eq!(listings[0].coordinates().map(|c| c.lat), Some(30.25));
        assert_eq!(listings[0].photos, vec!["https://img/1.jpg".to_string()]);
        assert_eq!(listings[0].created_at.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert!(listings[1].is_owned_by("u2"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn owner_listings_use_an_equality_query() {
        let Some(server) = start_server("owner_listings_use_an_equality_query") else {
            return;
        };
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("{ROOT}:runQuery"))
                .json_body(json!({ "structuredQuery": owner_query("u1") }));
            then.status(200).json_body(json!([
                { "document": document("l-1", "u1", "350000"), "readTime": "2024-05-01T10:00:00Z" },
                { "readTime": "2024-05-01T10:00:00Z" }
            ]));
        });

        let listings = store_for(&server).list_by_owner("u1").await.unwrap();
        mock.assert();
        assert_eq!(listings.len(), 1);
        assert!(listings[0].is_owned_by("u1"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn get_returns_none_for_missing_listings() {
        let Some(server) = start_server("get_returns_none_for_missing_listings") else {
            return;
        };
        server.mock(|when, then| {
            when.method(GET).path(format!("{ROOT}/listings/l-1"));
            then.status(200).json_body(document("l-1", "u1", "1"));
        });
        server.mock(|when, then| {
            when.method(GET).path(format!("{ROOT}/listings/gone"));
            then.status(404);
        });

        let store = store_for(&server);
        assert_eq!(store.get("l-1").await.unwrap().unwrap().id, "l-1");
        assert!(store.get("gone").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn put_writes_typed_fields() {
        let Some(server) = start_server("put_writes_typed_fields") else {
            return;
        };
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path(format!("{ROOT}/listings/l-9"))
                .body_contains("\"ownerId\":{\"stringValue\":\"u1\"}")
                .body_contains("\"price\":{\"integerValue\":\"2400\"}")
                .body_contains("\"lat\":{\"doubleValue\":30.25}")
                .body_contains("\"createdAt\":{\"timestampValue\":\"2024-05-01T10:00:00.000Z\"}");
            then.status(200).json_body(json!({ "name": "ignored" }));
        });

        let listing = Listing {
            id: "l-9".into(),
            owner_id: Some("u1".into()),
            price: 2400.0,
            lat: Some(30.25),
            lng: Some(-97.75),
            created_at: Some("2024-05-01T10:00:00.000Z".into()),
            ..Listing::default()
        };
        store_for(&server).put(listing).await.unwrap();
        mock.assert();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn delete_treats_missing_listings_as_done() {
        let Some(server) = start_server("delete_treats_missing_listings_as_done") else {
            return;
        };
        let mock = server.mock(|when, then| {
            when.method(DELETE).path(format!("{ROOT}/listings/l-1"));
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(DELETE).path(format!("{ROOT}/listings/l-2"));
            then.status(403).json_body(json!({
                "error": { "code": 403, "message": "denied", "status": "PERMISSION_DENIED" }
            }));
        });

        let store = store_for(&server);
        store.delete("l-1").await.unwrap();
        mock.assert();
        let err = store.delete("l-2").await.unwrap_err();
        assert_eq!(err.code, StoreErrorCode::PermissionDenied);
    }

    #[test]
    fn documents_without_id_fields_take_the_name() {
        let mut document = document("l-5", "u1", "10");
        let listing = listing_from_document(&document).unwrap();
        assert_eq!(listing.id, "l-5");

        document["fields"]["id"] = json!({ "stringValue": "custom" });
        assert_eq!(listing_from_document(&document).unwrap().id, "custom");
    }
}
