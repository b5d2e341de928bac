use std::sync::Arc;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value as JsonValue;

use crate::platform::token::AsyncTokenProvider;
use crate::store::error::{
    internal_error, invalid_argument, map_http_error, unauthenticated, unavailable, StoreResult,
};

const FIRESTORE_API_HOST: &str = "https://firestore.googleapis.com";
const FIRESTORE_API_VERSION: &str = "v1";
pub(crate) const PAGE_SIZE: &str = "300";
#[cfg(not(target_arch = "wasm32"))]
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Authenticated access to one Firestore database's REST `documents` root.
#[derive(Clone)]
pub(crate) struct FirestoreConnection {
    client: Client,
    base_url: String,
    token_provider: Option<Arc<dyn AsyncTokenProvider>>,
}

impl FirestoreConnection {
    pub(crate) fn new(
        project_id: &str,
        database: &str,
        emulator_host: Option<&str>,
        client: Option<Client>,
        token_provider: Option<Arc<dyn AsyncTokenProvider>>,
    ) -> StoreResult<Self> {
        if project_id.trim().is_empty() {
            return Err(invalid_argument("a project id is required to reach Firestore"));
        }
        let client = match client {
            Some(client) => client,
            None => Client::builder()
                .build()
                .map_err(|err| internal_error(err.to_string()))?,
        };
        let base_url = match emulator_host {
            Some(host) => format!(
                "http://{host}/{FIRESTORE_API_VERSION}/projects/{project_id}/databases/{database}/documents"
            ),
            None => format!(
                "{FIRESTORE_API_HOST}/{FIRESTORE_API_VERSION}/projects/{project_id}/databases/{database}/documents"
            ),
        };
        Ok(Self {
            client,
            base_url,
            token_provider,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one request. `Ok(None)` means the resource does not exist.
    ///
    /// Paths starting with `:` address a method on the `documents` root,
    /// such as `:runQuery`.
    pub(crate) async fn invoke(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<JsonValue>,
    ) -> StoreResult<Option<JsonValue>> {
        let url = if path.starts_with(':') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        let mut request = self.client.request(method, url);
        #[cfg(not(target_arch = "wasm32"))]
        {
            request = request.timeout(REQUEST_TIMEOUT);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(provider) = &self.token_provider {
            let token = provider
                .get_token(false)
                .await
                .map_err(|err| unauthenticated(err.to_string()))?;
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| unavailable(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| unavailable(err.to_string()))?;

        if status.is_success() {
            if text.trim().is_empty() {
                Ok(Some(JsonValue::Null))
            } else {
                serde_json::from_str(&text)
                    .map(Some)
                    .map_err(|err| internal_error(err.to_string()))
            }
        } else if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            Err(map_http_error(status, &text))
        }
    }

    /// Reads every document of a collection, following page tokens.
    pub(crate) async fn list_documents(&self, collection: &str) -> StoreResult<Vec<JsonValue>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", PAGE_SIZE)];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let Some(page) = self.invoke(Method::GET, collection, &query, None).await? else {
                return Ok(documents);
            };

            if let Some(batch) = page.get("documents").and_then(JsonValue::as_array) {
                documents.extend(batch.iter().cloned());
            }

            match page.get("nextPageToken").and_then(JsonValue::as_str) {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => return Ok(documents),
            }
        }
    }

    /// Runs a structured query against the `documents` root and returns the
    /// matched documents.
    pub(crate) async fn run_query(&self, structured_query: JsonValue) -> StoreResult<Vec<JsonValue>> {
        let body = serde_json::json!({ "structuredQuery": structured_query });
        let response = self
            .invoke(Method::POST, ":runQuery", &[], Some(body))
            .await?
            .unwrap_or(JsonValue::Array(Vec::new()));
        let results = response
            .as_array()
            .ok_or_else(|| internal_error("Firestore runQuery response must be an array"))?;
        Ok(results
            .iter()
            .filter_map(|entry| entry.get("document").cloned())
            .collect())
    }
}

pub(crate) fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Last path segment of a document `name`, percent-decoded.
pub(crate) fn document_id(name: &str) -> Option<String> {
    let segment = name.rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }
    Some(percent_decode_str(segment).decode_utf8_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_production_and_emulator_urls() {
        let production = FirestoreConnection::new("demo", "(default)", None, None, None).unwrap();
        assert_eq!(
            production.base_url(),
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents"
        );
        let emulator =
            FirestoreConnection::new("demo", "db", Some("127.0.0.1:8080"), None, None).unwrap();
        assert_eq!(
            emulator.base_url(),
            "http://127.0.0.1:8080/v1/projects/demo/databases/db/documents"
        );
        assert!(FirestoreConnection::new(" ", "db", None, None, None).is_err());
    }

    #[test]
    fn document_ids_are_decoded() {
        assert_eq!(
            document_id("projects/p/databases/d/documents/users/u1/favorites/a%20b").as_deref(),
            Some("a b")
        );
        assert_eq!(document_id("trailing/"), None);
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
    }
}
