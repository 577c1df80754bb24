//! In-process [`RemoteStore`] with fault injection and call accounting.

use std::{
    collections::BTreeMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use hashbrown::{HashMap, HashSet};
use serde::Serialize;

use super::{
    Document, Fields, Query, RemoteStore, StoreError, StoreResult, encode_fields,
    generate_document_id,
};

/// Scheme of URLs returned by [`MemoryStore::upload_blob`].
pub const MEMORY_URL_SCHEME: &str = "memory://";

#[derive(Debug, Clone)]
struct Blob {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

#[derive(Debug, Default)]
struct Faults {
    gets: HashSet<(String, String)>,
    queries: HashSet<String>,
    write_prefixes: Vec<String>,
    uploads: bool,
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Fields>>,
    blobs: HashMap<String, Blob>,
    faults: Faults,
}

/// Counters of calls made against a [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallCounts {
    /// `get_document` calls.
    pub gets: usize,
    /// Collection queries.
    pub queries: usize,
    /// Document writes, including failed ones.
    pub writes: usize,
    /// Highest number of `get_document` calls observed in flight at once.
    pub peak_concurrent_gets: usize,
}

/// Document and blob store held in memory.
///
/// Faults are matched per call: reads of a specific document, queries of a
/// collection, writes under a collection prefix, or every blob upload.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    latency: Option<Duration>,
    gets: AtomicUsize,
    queries: AtomicUsize,
    writes: AtomicUsize,
    gets_in_flight: AtomicUsize,
    peak_gets: AtomicUsize,
}

impl MemoryStore {
    /// Empty store without latency or faults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Writes `value` directly, bypassing faults and call counters.
    pub fn seed<T: Serialize>(&self, collection: &str, id: &str, value: &T) -> StoreResult<()> {
        let fields = encode_fields(value)?;
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    /// Fails reads of one document.
    pub fn fail_get(&self, collection: &str, id: &str) {
        self.lock()
            .faults
            .gets
            .insert((collection.to_string(), id.to_string()));
    }

    /// Fails every query of `collection`.
    pub fn fail_query(&self, collection: &str) {
        self.lock().faults.queries.insert(collection.to_string());
    }

    /// Fails every write whose collection starts with `prefix`.
    pub fn fail_writes_under(&self, prefix: &str) {
        self.lock().faults.write_prefixes.push(prefix.to_string());
    }

    /// Fails every blob upload.
    pub fn fail_uploads(&self) {
        self.lock().faults.uploads = true;
    }

    /// Removes every injected fault.
    pub fn clear_faults(&self) {
        self.lock().faults = Faults::default();
    }

    /// Whether `collection` holds document `id`.
    pub fn contains(&self, collection: &str, id: &str) -> bool {
        self.lock()
            .collections
            .get(collection)
            .is_some_and(|docs| docs.contains_key(id))
    }

    /// Raw copy of a stored document.
    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone()))
    }

    /// Number of documents in `collection`.
    pub fn document_count(&self, collection: &str) -> usize {
        self.lock().collections.get(collection).map_or(0, BTreeMap::len)
    }

    /// Bytes stored at `path`.
    pub fn blob(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().blobs.get(path).map(|b| b.bytes.clone())
    }

    /// Content type recorded for the blob at `path`.
    pub fn blob_content_type(&self, path: &str) -> Option<String> {
        self.lock().blobs.get(path).and_then(|b| b.content_type.clone())
    }

    /// Snapshot of the call counters.
    pub fn calls(&self) -> CallCounts {
        CallCounts {
            gets: self.gets.load(Ordering::SeqCst),
            queries: self.queries.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
            peak_concurrent_gets: self.peak_gets.load(Ordering::SeqCst),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_write(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let inner = self.lock();
        if inner
            .faults
            .write_prefixes
            .iter()
            .any(|prefix| collection.starts_with(prefix.as_str()))
        {
            return Err(StoreError::Transport(format!(
                "injected write failure at {collection}/{id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        let inner = self.lock();
        if inner.faults.queries.contains(&query.collection) {
            return Err(StoreError::Transport(format!(
                "injected query failure on {}",
                query.collection
            )));
        }
        let docs = inner
            .collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(query.apply(docs))
    }

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Document> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let now = self.gets_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_gets.fetch_max(now, Ordering::SeqCst);

        self.delay().await;
        let out = {
            let inner = self.lock();
            if inner
                .faults
                .gets
                .contains(&(collection.to_string(), id.to_string()))
            {
                Err(StoreError::Transport(format!(
                    "injected read failure at {collection}/{id}"
                )))
            } else {
                inner
                    .collections
                    .get(collection)
                    .and_then(|docs| docs.get(id))
                    .map(|fields| Document::new(id, fields.clone()))
                    .ok_or_else(|| StoreError::not_found(collection, id))
            }
        };

        self.gets_in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }

    async fn set_document(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        self.delay().await;
        self.check_write(collection, id)?;
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    async fn update_fields(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        self.delay().await;
        self.check_write(collection, id)?;
        let mut inner = self.lock();
        let doc = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        doc.extend(fields);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.delay().await;
        self.check_write(collection, id)?;
        if let Some(docs) = self.lock().collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        let id = generate_document_id();
        self.set_document(collection, &id, fields).await?;
        Ok(id)
    }

    async fn upload_blob(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> StoreResult<String> {
        self.delay().await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.lock();
        if inner.faults.uploads {
            return Err(StoreError::Transport(format!("injected upload failure at {path}")));
        }
        inner.blobs.insert(
            path.to_string(),
            Blob {
                bytes,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(format!("{MEMORY_URL_SCHEME}{path}"))
    }

    async fn delete_blob(&self, path: &str) -> StoreResult<()> {
        self.delay().await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.lock()
            .blobs
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StoreError::BlobNotFound(path.to_string()))
    }
}
