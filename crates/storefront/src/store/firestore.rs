//! Firestore REST API client.
//!
//! Collection reads and filters go through `documents:runQuery` with a
//! `structuredQuery`; single documents are fetched by path. Firestore wraps
//! every field in a typed value (`{"stringValue": "zulu"}`), which is decoded
//! here into plain JSON before anything else sees it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};
use url::Url;

use super::{Document, DocumentStore, StoreError};
use crate::config::DocumentStoreConfig;

/// Request timeout for store reads.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Firestore field filter operator for exact equality.
const OP_EQUAL: &str = "EQUAL";

/// Firestore field filter operator for array membership.
const OP_ARRAY_CONTAINS: &str = "ARRAY_CONTAINS";

/// Client for the Firestore REST API.
///
/// Cheaply cloneable; the underlying HTTP connection pool is shared.
#[derive(Clone)]
pub struct FirestoreClient {
    inner: Arc<FirestoreClientInner>,
}

struct FirestoreClientInner {
    client: reqwest::Client,
    /// `{endpoint}/projects/{project}/databases/{database}/documents`
    documents_url: Url,
    /// `{endpoint}/projects/{project}/databases/{database}/documents:runQuery`
    run_query_url: Url,
    token: Option<SecretString>,
}

/// One element of a `runQuery` response stream.
///
/// Elements without a `document` only carry progress metadata.
#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<RawDocument>,
}

/// A document as Firestore returns it.
#[derive(Debug, Deserialize)]
struct RawDocument {
    /// Full resource name, ending in `/{collection}/{id}`.
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl RawDocument {
    fn into_document(self) -> Result<Document, StoreError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::Decode(format!("bad document name: {}", self.name)))?
            .to_owned();

        Ok(Document::new(id, decode_fields(&self.fields)))
    }
}

/// Firestore error envelope.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

impl FirestoreClient {
    /// Create a new Firestore client.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` if the project id is missing or the
    /// endpoint is not a valid base URL.
    pub fn new(config: &DocumentStoreConfig) -> Result<Self, StoreError> {
        let project_id = config.project_id.as_deref().ok_or_else(|| {
            StoreError::Config(
                "DOCUMENT_STORE_PROJECT_ID is required for the firestore backend".to_string(),
            )
        })?;

        let documents_url =
            database_url(&config.endpoint, project_id, &config.database, "documents")?;
        let run_query_url = database_url(
            &config.endpoint,
            project_id,
            &config.database,
            "documents:runQuery",
        )?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(FirestoreClientInner {
                client,
                documents_url,
                run_query_url,
                token: config.token.clone(),
            }),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.inner.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, StoreError> {
        let mut url = self.inner.documents_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Config("endpoint cannot be a base URL".to_string()))?
            .extend([collection, id]);
        Ok(url)
    }

    /// Execute a structured query and decode the returned documents.
    async fn run_query(&self, structured_query: Value) -> Result<Vec<Document>, StoreError> {
        let body = json!({ "structuredQuery": structured_query });

        let response = self
            .authorize(self.inner.client.post(self.inner.run_query_url.clone()))
            .json(&body)
            .send()
            .await?;

        let text = read_success_body(response).await?;
        let items: Vec<RunQueryItem> = serde_json::from_str(&text)?;

        let documents = items
            .into_iter()
            .filter_map(|item| item.document)
            .map(RawDocument::into_document)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = documents.len(), "runQuery returned documents");
        Ok(documents)
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    #[instrument(skip(self))]
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.run_query(structured_query(collection, None)).await
    }

    #[instrument(skip(self))]
    async fn find_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let filter = field_filter(field, OP_EQUAL, value);
        self.run_query(structured_query(collection, Some(filter)))
            .await
    }

    #[instrument(skip(self))]
    async fn find_array_contains(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let filter = field_filter(field, OP_ARRAY_CONTAINS, value);
        self.run_query(structured_query(collection, Some(filter)))
            .await
    }

    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let url = self.document_url(collection, id)?;
        let response = self.authorize(self.inner.client.get(url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = read_success_body(response).await?;
        let raw: RawDocument = serde_json::from_str(&text)?;
        raw.into_document().map(Some)
    }
}

/// Build `{endpoint}/projects/{project}/databases/{database}/{last}`.
fn database_url(
    endpoint: &str,
    project_id: &str,
    database: &str,
    last: &str,
) -> Result<Url, StoreError> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| StoreError::Config(format!("invalid endpoint {endpoint}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| StoreError::Config("endpoint cannot be a base URL".to_string()))?
        .pop_if_empty()
        .extend(["projects", project_id, "databases", database, last]);
    Ok(url)
}

/// Read the body of a successful response, mapping failures to `StoreError`.
async fn read_success_body(response: reqwest::Response) -> Result<String, StoreError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(StoreError::RateLimited(retry_after));
    }

    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&text).map_or_else(
            |_| text.chars().take(200).collect::<String>(),
            |body| body.error.message,
        );
        tracing::error!(status = %status, message = %message, "Document store returned non-success status");
        return Err(StoreError::Status {
            status: status.as_u16(),
            message,
        });
    }

    Ok(text)
}

/// A `structuredQuery` over one collection with an optional `where` clause.
fn structured_query(collection: &str, filter: Option<Value>) -> Value {
    let mut query = json!({ "from": [{ "collectionId": collection }] });
    if let (Some(filter), Some(object)) = (filter, query.as_object_mut()) {
        object.insert("where".to_string(), filter);
    }
    query
}

/// A single-field filter comparing against a string value.
fn field_filter(field: &str, op: &str, value: &str) -> Value {
    json!({
        "fieldFilter": {
            "field": { "fieldPath": field },
            "op": op,
            "value": { "stringValue": value },
        }
    })
}

/// Decode a Firestore `fields` map into plain JSON.
fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), decode_value(value)))
        .collect()
}

/// Decode one typed Firestore value into plain JSON.
///
/// `integerValue` arrives as a string and becomes a JSON number. Timestamps,
/// references and bytes stay as their string forms.
fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|object| object.iter().next()) else {
        return Value::Null;
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map_or_else(|| inner.clone(), Value::from),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        _ => inner.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scalar_values() {
        assert_eq!(decode_value(&json!({"stringValue": "zulu"})), json!("zulu"));
        assert_eq!(decode_value(&json!({"integerValue": "42"})), json!(42));
        assert_eq!(decode_value(&json!({"doubleValue": 19.5})), json!(19.5));
        assert_eq!(decode_value(&json!({"booleanValue": true})), json!(true));
        assert_eq!(decode_value(&json!({"nullValue": null})), Value::Null);
        assert_eq!(
            decode_value(&json!({"timestampValue": "2024-01-01T00:00:00Z"})),
            json!("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_decode_array_value() {
        let value = json!({
            "arrayValue": {
                "values": [{"stringValue": "wedding"}, {"stringValue": "heritage-day"}]
            }
        });
        assert_eq!(decode_value(&value), json!(["wedding", "heritage-day"]));
    }

    #[test]
    fn test_decode_empty_array_value() {
        assert_eq!(decode_value(&json!({"arrayValue": {}})), json!([]));
    }

    #[test]
    fn test_decode_nested_map_value() {
        let value = json!({
            "mapValue": {
                "fields": {
                    "amount": {"integerValue": "250"},
                    "currency": {"stringValue": "ZAR"}
                }
            }
        });
        assert_eq!(
            decode_value(&value),
            json!({"amount": 250, "currency": "ZAR"})
        );
    }

    #[test]
    fn test_decode_untyped_value_is_null() {
        assert_eq!(decode_value(&json!("plain")), Value::Null);
        assert_eq!(decode_value(&json!({})), Value::Null);
    }

    #[test]
    fn test_raw_document_id_from_name() {
        let raw: RawDocument = serde_json::from_value(json!({
            "name": "projects/demo/databases/(default)/documents/products/p1",
            "fields": {"culture": {"stringValue": "zulu"}}
        }))
        .unwrap();

        let document = raw.into_document().unwrap();
        assert_eq!(document.id, "p1");
        assert_eq!(document.fields.get("culture"), Some(&json!("zulu")));
    }

    #[test]
    fn test_raw_document_without_fields() {
        let raw: RawDocument = serde_json::from_value(json!({
            "name": "projects/demo/databases/(default)/documents/users/u1"
        }))
        .unwrap();

        let document = raw.into_document().unwrap();
        assert_eq!(document.id, "u1");
        assert!(document.fields.is_empty());
    }

    #[test]
    fn test_run_query_items_skip_metadata_only_entries() {
        let items: Vec<RunQueryItem> = serde_json::from_value(json!([
            {"readTime": "2024-01-01T00:00:00Z"}
        ]))
        .unwrap();
        assert!(items.into_iter().all(|item| item.document.is_none()));
    }

    #[test]
    fn test_database_url_layout() {
        let url = database_url(
            "https://firestore.googleapis.com/v1",
            "heritage",
            "(default)",
            "documents:runQuery",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/heritage/databases/(default)/documents:runQuery"
        );
    }

    #[test]
    fn test_database_url_tolerates_trailing_slash() {
        let url = database_url("http://localhost:8080/v1/", "demo", "(default)", "documents")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents"
        );
    }

    #[test]
    fn test_structured_query_with_filter() {
        let query = structured_query(
            "products",
            Some(field_filter("occasions", OP_ARRAY_CONTAINS, "funeral")),
        );
        assert_eq!(
            query,
            json!({
                "from": [{"collectionId": "products"}],
                "where": {
                    "fieldFilter": {
                        "field": {"fieldPath": "occasions"},
                        "op": "ARRAY_CONTAINS",
                        "value": {"stringValue": "funeral"}
                    }
                }
            })
        );
    }

    #[test]
    fn test_structured_query_without_filter() {
        let query = structured_query("products", None);
        assert_eq!(query, json!({"from": [{"collectionId": "products"}]}));
    }
}
