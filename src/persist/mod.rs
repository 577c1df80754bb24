//! Remote document store seam.
//!
//! [`RemoteStore`] is the only way services reach the backend. Documents are
//! JSON objects addressed by collection path and id; blobs are addressed by
//! path. [`memory::MemoryStore`] and [`sqlite::SqliteStore`] implement it.

/// In-memory store for tests and demos.
pub mod memory;
/// Collection and blob path layout.
pub mod paths;
/// SQLite-backed store.
pub mod sqlite;

use std::cmp::Ordering;

use async_trait::async_trait;
use rand::{Rng, distributions::Alphanumeric};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

/// JSON object body of a stored document.
pub type Fields = serde_json::Map<String, Value>;

/// Failure reported by a [`RemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No document at `collection/id`.
    #[error("document {collection}/{id} not found")]
    NotFound {
        /// Collection that was read.
        collection: String,
        /// Missing document id.
        id: String,
    },
    /// No blob at the given path.
    #[error("blob {0} not found")]
    BlobNotFound(String),
    /// The backend could not be reached.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The backend refused the call.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// A document did not encode or decode.
    #[error("codec error: {0}")]
    Codec(String),
    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Builds [`StoreError::NotFound`].
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// True for missing documents and missing blobs.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::BlobNotFound(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Backend(value.to_string())
    }
}

/// Result of a store call.
pub type StoreResult<T> = Result<T, StoreError>;

/// A document id plus its JSON fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id.
    pub id: String,
    /// Document body.
    pub fields: Fields,
}

impl Document {
    /// Document `id` with body `fields`.
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Decodes the fields as `T`, supplying `id` when the body lacks it.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut fields = self.fields.clone();
        fields
            .entry("id")
            .or_insert_with(|| Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Raw value of one top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Serializes `value` into document fields. Non-object values are rejected.
pub fn encode_fields<T: Serialize>(value: &T) -> StoreResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::Codec(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Store-assigned document id: 20 random alphanumerics.
pub fn generate_document_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

/// Ordering clause of a [`Query`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Field to order by.
    pub field: String,
    /// Largest first.
    pub descending: bool,
}

/// Collection query with an optional equality filter and ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection path.
    pub collection: String,
    /// Field that must equal the given value.
    pub filter: Option<(String, Value)>,
    /// Result ordering.
    pub order_by: Option<OrderBy>,
}

impl Query {
    /// Unfiltered, unordered query of `collection`.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filter: None,
            order_by: None,
        }
    }

    /// Keeps documents whose `field` equals `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = Some((field.into(), value.into()));
        self
    }

    /// Orders results by `field`.
    pub fn order_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            descending,
        });
        self
    }

    /// Filters and orders `docs` (given in id order) the way a backend would.
    ///
    /// Documents lacking the ordering field are excluded from ordered
    /// results. Ties keep their id order.
    pub fn apply(&self, docs: Vec<Document>) -> Vec<Document> {
        let mut out: Vec<Document> = docs
            .into_iter()
            .filter(|doc| match &self.filter {
                Some((field, value)) => doc.field(field) == Some(value),
                None => true,
            })
            .collect();

        if let Some(order) = &self.order_by {
            out.retain(|doc| doc.field(&order.field).is_some());
            out.sort_by(|a, b| {
                let ord = compare_values(a.field(&order.field), b.field(&order.field));
                if order.descending { ord.reverse() } else { ord }
            });
        }
        out
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Remote document database plus blob storage.
///
/// Every call is fallible; `get_document` and `delete_blob` report
/// [`StoreError::NotFound`]/[`StoreError::BlobNotFound`] distinctly so
/// existence checks can answer `false` instead of failing.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Runs `query` against its collection.
    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Reads one document, [`StoreError::NotFound`] if absent.
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Document>;

    /// Creates or overwrites a document.
    async fn set_document(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()>;

    /// Merges `fields` into an existing document.
    async fn update_fields(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()>;

    /// Deletes a document. Deleting a missing document succeeds.
    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Creates a document under a store-assigned id and returns the id.
    async fn add_document(&self, collection: &str, fields: Fields) -> StoreResult<String>;

    /// Stores `bytes` at `path` and returns a download URL.
    async fn upload_blob(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> StoreResult<String>;

    /// Deletes the blob at `path`.
    async fn delete_blob(&self, path: &str) -> StoreResult<()>;

    /// Whether a document exists. Only non-missing errors fail.
    async fn exists(&self, collection: &str, id: &str) -> StoreResult<bool> {
        match self.get_document(collection, id).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Runs `query` and decodes every result as `T`, skipping undecodable ones.
pub async fn query_as<T: DeserializeOwned>(
    store: &dyn RemoteStore,
    query: &Query,
) -> StoreResult<Vec<T>> {
    let docs = store.query(query).await?;
    Ok(docs
        .iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(v) => Some(v),
            Err(err) => {
                tracing::debug!(collection = %query.collection, id = %doc.id, %err, "skipping undecodable document");
                None
            }
        })
        .collect())
}

/// Fetches one document and decodes it as `T`.
pub async fn get_as<T: DeserializeOwned>(
    store: &dyn RemoteStore,
    collection: &str,
    id: &str,
) -> StoreResult<T> {
    store.get_document(collection, id).await?.decode()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(id: &str, value: Value) -> Document {
        let Value::Object(fields) = value else {
            panic!("object expected");
        };
        Document::new(id, fields)
    }

    #[test]
    fn query_filters_then_orders_descending() {
        let docs = vec![
            doc("a", json!({"owner": "u1", "ts": 1})),
            doc("b", json!({"owner": "u2", "ts": 5})),
            doc("c", json!({"owner": "u1", "ts": 3})),
            doc("d", json!({"owner": "u1"})),
        ];
        let q = Query::new("posts").where_eq("owner", "u1").order_by("ts", true);
        let ids: Vec<_> = q.apply(docs).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, ["c", "a"]);
    }

    #[test]
    fn decode_supplies_missing_id() {
        #[derive(serde::Deserialize)]
        struct Named {
            id: String,
            name: String,
        }
        let named: Named = doc("x1", json!({"name": "n"})).decode().unwrap();
        assert_eq!((named.id.as_str(), named.name.as_str()), ("x1", "n"));
    }

    #[test]
    fn encode_rejects_scalars() {
        assert!(matches!(encode_fields(&5), Err(StoreError::Codec(_))));
    }

    #[test]
    fn generated_ids_are_alphanumeric() {
        let id = generate_document_id();
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
