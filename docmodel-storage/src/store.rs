//! SQLite-backed document store.

use crate::document::Document;
use crate::error::{StorageError, StorageResult};
use crate::query::{order_by, Query, SortKey};
use docmodel_types::EntityId;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Persistent document store backed by SQLite.
///
/// Cloning shares the underlying connection.
#[derive(Clone)]
pub struct DocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore").finish_non_exhaustive()
    }
}

impl DocumentStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened document store");
        Self::with_connection(conn)
    }

    /// Opens an in-memory store.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                UNIQUE(collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_documents_collection
                ON documents(collection, seq);
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Inserts one document. Fails with `Conflict` if the id is taken.
    pub fn insert(&self, collection: &str, doc: &Document) -> StorageResult<()> {
        let conn = self.lock()?;
        insert_row(&conn, collection, doc)?;
        debug!(collection, id = %doc.id, "Inserted document");
        Ok(())
    }

    /// Inserts all documents or none.
    pub fn insert_many(&self, collection: &str, docs: &[Document]) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for doc in docs {
            insert_row(&tx, collection, doc)?;
        }
        tx.commit()?;
        debug!(collection, count = docs.len(), "Inserted documents");
        Ok(())
    }

    /// Overwrites the body of an existing document. Returns whether it existed.
    pub fn replace(&self, collection: &str, doc: &Document) -> StorageResult<bool> {
        let conn = self.lock()?;
        let changed = replace_row(&conn, collection, doc)?;
        Ok(changed)
    }

    /// Overwrites several documents in one transaction. Returns how many
    /// existed.
    pub fn replace_many(&self, collection: &str, docs: &[Document]) -> StorageResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut replaced = 0;
        for doc in docs {
            if replace_row(&tx, collection, doc)? {
                replaced += 1;
            }
        }
        tx.commit()?;
        debug!(collection, replaced, "Replaced documents");
        Ok(replaced)
    }

    /// Deletes one document. Returns whether it existed.
    pub fn delete(&self, collection: &str, id: &EntityId) -> StorageResult<bool> {
        let conn = self.lock()?;
        let n = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id.to_string()],
        )?;
        Ok(n > 0)
    }

    /// Deletes every document matching `query`. Returns the number deleted.
    pub fn delete_many(&self, collection: &str, query: &Query) -> StorageResult<usize> {
        let conn = self.lock()?;
        let mut sql = String::from("DELETE FROM documents WHERE collection = ?");
        let mut params = vec![SqlValue::Text(collection.to_string())];
        query.push_sql(&mut sql, &mut params);
        let n = conn.execute(&sql, params_from_iter(params))?;
        debug!(collection, deleted = n, "Deleted documents");
        Ok(n)
    }

    // ── Reads ────────────────────────────────────────────────────

    pub fn get(&self, collection: &str, id: &EntityId) -> StorageResult<Option<Document>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, data FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id.to_string()],
                raw_row,
            )
            .optional()?;
        row.map(|raw| decode(collection, raw)).transpose()
    }

    /// Documents matching `query`, ordered by `sort` then insertion order.
    pub fn find(
        &self,
        collection: &str,
        query: &Query,
        sort: &[SortKey],
    ) -> StorageResult<Vec<Document>> {
        let conn = self.lock()?;
        let mut sql = String::from("SELECT id, data FROM documents WHERE collection = ?");
        let mut params = vec![SqlValue::Text(collection.to_string())];
        query.push_sql(&mut sql, &mut params);
        sql.push_str(&order_by(sort, &mut params));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params), raw_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(|raw| decode(collection, raw)).collect()
    }

    pub fn count(&self, collection: &str, query: &Query) -> StorageResult<usize> {
        let conn = self.lock()?;
        let mut sql = String::from("SELECT COUNT(*) FROM documents WHERE collection = ?");
        let mut params = vec![SqlValue::Text(collection.to_string())];
        query.push_sql(&mut sql, &mut params);
        let n: i64 = conn.query_row(&sql, params_from_iter(params), |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or_default())
    }
}

fn insert_row(conn: &Connection, collection: &str, doc: &Document) -> StorageResult<()> {
    let data = serde_json::to_string(&doc.body)?;
    conn.execute(
        "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)",
        params![collection, doc.id.to_string(), data],
    )
    .map_err(|e| match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => StorageError::Conflict {
            collection: collection.to_string(),
            id: doc.id.to_string(),
        },
        _ => StorageError::Database(e),
    })?;
    Ok(())
}

fn replace_row(conn: &Connection, collection: &str, doc: &Document) -> StorageResult<bool> {
    let data = serde_json::to_string(&doc.body)?;
    let n = conn.execute(
        "UPDATE documents SET data = ?3 WHERE collection = ?1 AND id = ?2",
        params![collection, doc.id.to_string(), data],
    )?;
    Ok(n > 0)
}

fn raw_row(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn decode(collection: &str, (id, data): (String, String)) -> StorageResult<Document> {
    let invalid = |reason: String| StorageError::InvalidData {
        collection: collection.to_string(),
        reason,
    };
    let id = EntityId::parse(&id).map_err(|e| invalid(format!("bad id `{id}`: {e}")))?;
    let body: Map<String, Value> =
        serde_json::from_str(&data).map_err(|e| invalid(format!("document {id}: {e}")))?;
    Ok(Document { id, body })
}
