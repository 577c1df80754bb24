//! SQLite-backed [`RemoteStore`] for local development and offline use.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Mutex;

use crate::types::now_ms;

use super::{
    Document, Fields, Query, RemoteStore, StoreError, StoreResult, generate_document_id,
};

/// Scheme of URLs returned by [`SqliteStore::upload_blob`].
pub const SQLITE_URL_SCHEME: &str = "sqlite-blob://";

/// Documents and blobs kept in one SQLite database.
///
/// Each call runs on the blocking pool and holds the connection mutex for
/// its duration.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens or creates a SQLite-backed store at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Reads back an uploaded blob.
    pub async fn blob(&self, path: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = path.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row("SELECT bytes FROM blobs WHERE path = ?1", params![path], |row| {
                    row.get(0)
                })
                .optional()?)
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("join error: {e}")))?
    }
}

fn encode_payload(fields: &Fields) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(fields)?)
}

fn decode_payload(payload: &[u8]) -> StoreResult<Fields> {
    Ok(serde_json::from_slice(payload)?)
}

fn upsert(conn: &Connection, collection: &str, id: &str, fields: &Fields) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO documents(collection, id, payload, updated_ms) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(collection, id) DO UPDATE SET payload = excluded.payload, updated_ms = excluded.updated_ms",
        params![collection, id, encode_payload(fields)?, now_ms() as i64],
    )?;
    Ok(())
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let query = query.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT id, payload FROM documents WHERE collection = ?1 ORDER BY id ASC")?;
            let rows = stmt.query_map(params![query.collection], |row| {
                let id: String = row.get(0)?;
                let payload: Vec<u8> = row.get(1)?;
                Ok((id, payload))
            })?;

            let mut docs = Vec::new();
            for row in rows {
                let (id, payload) = row?;
                docs.push(Document::new(id, decode_payload(&payload)?));
            }
            Ok(query.apply(docs))
        })
        .await
    }

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Document> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.with_conn(move |conn| {
            let payload: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT payload FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(payload) = payload else {
                return Err(StoreError::not_found(&collection, &id));
            };
            Ok(Document::new(id, decode_payload(&payload)?))
        })
        .await
    }

    async fn set_document(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.with_conn(move |conn| upsert(conn, &collection, &id, &fields))
            .await
    }

    async fn update_fields(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let payload: Option<Vec<u8>> = tx
                .query_row(
                    "SELECT payload FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(payload) = payload else {
                return Err(StoreError::not_found(&collection, &id));
            };
            let mut current = decode_payload(&payload)?;
            current.extend(fields);
            upsert(&tx, &collection, &id, &current)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )?;
            Ok(())
        })
        .await
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
        let path = path.to_string();
        let content_type = content_type.map(str::to_string);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO blobs(path, content_type, bytes, uploaded_ms) VALUES (?1, ?2, ?3, ?4)",
                params![path, content_type, bytes, now_ms() as i64],
            )?;
            Ok(format!("{SQLITE_URL_SCHEME}{path}"))
        })
        .await
    }

    async fn delete_blob(&self, path: &str) -> StoreResult<()> {
        let path = path.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM blobs WHERE path = ?1", params![path])?;
            if removed == 0 {
                return Err(StoreError::BlobNotFound(path));
            }
            Ok(())
        })
        .await
    }
}
