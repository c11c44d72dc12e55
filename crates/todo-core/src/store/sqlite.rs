//! JSON document store on SQLite

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::schema::{Schema, SCHEMA_VERSION};
use super::{DocumentScan, StoredTodo, TodoStore};
use crate::error::{StoreError, StoreResult};
use crate::todo::{TodoDocument, TodoId};

/// Document store keeping each todo as a JSON body under a generated key.
///
/// The connection sits behind a mutex; every call runs to completion while
/// holding it, so writes to one document are applied in call order.
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a store at the given database path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Initialize the database schema
    fn initialize(conn: &Connection) -> StoreResult<()> {
        let current_version: u32 = conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY applied_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(Schema::create_tables())?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )?;
        } else if current_version < SCHEMA_VERSION {
            for version in current_version..SCHEMA_VERSION {
                if let Some(migration) = Schema::migration(version, version + 1) {
                    conn.execute_batch(migration)?;
                }
            }
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self
            .conn
            .lock()
            .map_err(|e| StoreError::Database(format!("Mutex poisoned: {}", e)))?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        f(conn)
    }

    fn query_documents(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<DocumentScan> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut scan = DocumentScan::default();
        for (key, body) in rows {
            let id = TodoId::parse(&key);
            match serde_json::from_str(&body) {
                Ok(document) => scan.documents.push(StoredTodo { id, document }),
                Err(e) => {
                    tracing::warn!("Undecodable todo document {}: {}", key, e);
                    scan.undecodable.push(id);
                }
            }
        }
        Ok(scan)
    }

    /// Write a raw body under `key`, bypassing document encoding
    #[cfg(test)]
    pub(crate) fn insert_raw(&self, key: &str, body: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO todos (id, body) VALUES (?1, ?2)",
                params![key, body],
            )?;
            Ok(())
        })
    }
}

#[async_trait]
impl TodoStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn is_persistent(&self) -> bool {
        true
    }

    async fn create(&self, document: &TodoDocument) -> StoreResult<Option<TodoId>> {
        let body = serde_json::to_string(document)?;
        let key = Uuid::new_v4().simple().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO todos (id, body) VALUES (?1, ?2)",
                params![key, body],
            )?;
            Ok(())
        })?;
        tracing::debug!("Created todo document {}", key);
        Ok(Some(TodoId::parse(&key)))
    }

    async fn find_by_id(&self, id: &TodoId) -> StoreResult<Option<TodoDocument>> {
        let key = id.to_string();
        let body: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT body FROM todos WHERE id = ?1", [&key], |row| {
                    row.get(0)
                })
                .optional()?)
        })?;
        body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .transpose()
    }

    async fn find_all(&self) -> StoreResult<DocumentScan> {
        self.with_conn(|conn| {
            Self::query_documents(conn, "SELECT id, body FROM todos ORDER BY rowid", params![])
        })
    }

    async fn find_by_tag_contains(&self, tag: &str) -> StoreResult<Vec<StoredTodo>> {
        self.with_conn(|conn| {
            Self::query_documents(
                conn,
                r#"
                SELECT id, body FROM todos
                WHERE EXISTS (
                    SELECT 1
                    FROM json_each(
                        CASE WHEN json_valid(todos.body) THEN todos.body ELSE '{}' END,
                        '$.tags'
                    )
                    WHERE json_each.value = ?1
                )
                ORDER BY rowid
                "#,
                [tag],
            )
            .map(|scan| scan.documents)
        })
    }

    async fn update_by_id(&self, id: &TodoId, document: &TodoDocument) -> StoreResult<bool> {
        let body = serde_json::to_string(document)?;
        let key = id.to_string();
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE todos SET body = ?2, updated_at = datetime('now') WHERE id = ?1",
                params![key, body],
            )?)
        })?;
        tracing::debug!("Updated todo document {} ({} rows)", key, changed);
        Ok(changed > 0)
    }

    async fn upsert_by_id(&self, id: &TodoId, document: &TodoDocument) -> StoreResult<()> {
        let body = serde_json::to_string(document)?;
        let key = id.to_string();
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO todos (id, body) VALUES (?1, ?2)
                ON CONFLICT(id) DO UPDATE SET body = excluded.body, updated_at = datetime('now')
                "#,
                params![key, body],
            )?;
            Ok(())
        })
    }

    async fn delete_by_id(&self, id: &TodoId) -> StoreResult<bool> {
        let key = id.to_string();
        let deleted = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM todos WHERE id = ?1", [&key])?)
        })?;
        tracing::debug!("Deleted todo document {} ({} rows)", key, deleted);
        Ok(deleted > 0)
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let deleted = self.with_conn(|conn| Ok(conn.execute("DELETE FROM todos", [])?))?;
        Ok(deleted as u64)
    }

    async fn close(&self) -> StoreResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Database(format!("Mutex poisoned: {}", e)))?
            .take();
        match conn {
            Some(conn) => conn.close().map_err(|(_, e)| StoreError::from(e)),
            None => Ok(()),
        }
    }
}
