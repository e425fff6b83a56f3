mod migrations;

use anyhow::{anyhow, Result};
use codeblue_schema::ClinicalEvent;
use rusqlite::{params, Connection, Row};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task;

use migrations::run_migrations;

/// Startup failures that abort the session before the loop runs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event store unreachable at {path}: {source}")]
    Unreachable {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("event store migration failed: {0}")]
    Migration(#[from] anyhow::Error),
}

/// Append-only log of clinical events, one sqlite row per event.
///
/// Only the foreground loop writes; every operation hops through
/// `spawn_blocking` so the sqlite call never stalls the runtime.
#[derive(Clone)]
pub struct EventStore {
    db: Arc<Mutex<Connection>>,
}

impl EventStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Unreachable {
            path: path.display().to_string(),
            source,
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StoreError::Migration(e.into()))?;
        run_migrations(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Unreachable {
            path: ":memory:".to_string(),
            source,
        })?;
        run_migrations(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Delete every prior event. Each session starts from an empty log.
    pub async fn clear(&self) -> Result<usize> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let deleted = conn.execute("DELETE FROM events", [])?;
            Ok::<usize, anyhow::Error>(deleted)
        })
        .await?
    }

    /// Insert one event and return its assigned id.
    pub async fn append(
        &self,
        name: &str,
        note: &str,
        timestamp: &str,
        extra: Option<&Map<String, Value>>,
    ) -> Result<i64> {
        let db = Arc::clone(&self.db);
        let name = name.to_owned();
        let note = note.to_owned();
        let timestamp = timestamp.to_owned();
        let extra_json = extra.map(serde_json::to_string).transpose()?;
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            conn.execute(
                "INSERT INTO events (name, note, timestamp, extra) VALUES (?1, ?2, ?3, ?4)",
                params![name, note, timestamp, extra_json],
            )?;
            Ok::<i64, anyhow::Error>(conn.last_insert_rowid())
        })
        .await?
    }

    /// The last `limit` inserted events, in ascending id order.
    pub async fn list(&self, limit: usize) -> Result<Vec<ClinicalEvent>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let mut stmt = conn.prepare(
                r#"
                SELECT id, name, note, timestamp, extra
                FROM events
                ORDER BY id DESC
                LIMIT ?1
                "#,
            )?;
            let rows = stmt.query_map(params![limit as i64], row_to_event)?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row?);
            }
            events.reverse();
            Ok::<Vec<ClinicalEvent>, anyhow::Error>(events)
        })
        .await?
    }
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<ClinicalEvent> {
    let extra_raw: Option<String> = row.get(4)?;
    let extra = extra_raw.and_then(|raw| serde_json::from_str(&raw).ok());

    Ok(ClinicalEvent {
        id: row.get(0)?,
        name: row.get(1)?,
        note: row.get(2)?,
        timestamp: row.get(3)?,
        extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_extra() -> Map<String, Value> {
        let mut extra = Map::new();
        extra.insert("ekg".into(), Value::String("VF".into()));
        extra.insert("energy".into(), Value::String("200J".into()));
        extra
    }

    #[tokio::test]
    async fn open_in_memory_succeeds() {
        assert!(EventStore::open_in_memory().is_ok());
    }

    #[tokio::test]
    async fn append_returns_increasing_ids() {
        let store = EventStore::open_in_memory().expect("store");
        let first = store
            .append("OHCA", "開始急救", "2025/03/01 14:00", None)
            .await
            .expect("append first");
        let second = store
            .append("電擊", "200J", "2025/03/01 14:02", None)
            .await
            .expect("append second");
        assert!(second > first);
    }

    #[tokio::test]
    async fn list_returns_insertion_order_with_unmodified_fields() {
        let store = EventStore::open_in_memory().expect("store");
        store
            .append("OHCA", "開始急救", "2025/03/01 14:00", None)
            .await
            .expect("append");
        let extra = sample_extra();
        store
            .append("電擊", "VF 心律，已執行電擊", "2025/03/01 14:02", Some(&extra))
            .await
            .expect("append");

        let events = store.list(10).await.expect("list");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "OHCA");
        assert_eq!(events[1].name, "電擊");
        assert_eq!(events[1].note, "VF 心律，已執行電擊");
        assert_eq!(events[1].timestamp, "2025/03/01 14:02");
        assert_eq!(events[1].extra.as_ref().unwrap()["energy"], "200J");
        assert!(events[0].id < events[1].id);
    }

    #[tokio::test]
    async fn list_limit_keeps_most_recent_in_ascending_order() {
        let store = EventStore::open_in_memory().expect("store");
        for i in 0..5 {
            store
                .append(&format!("event-{i}"), "", "2025/03/01 14:00", None)
                .await
                .expect("append");
        }

        let events = store.list(2).await.expect("list");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "event-3");
        assert_eq!(events[1].name, "event-4");
    }

    #[tokio::test]
    async fn clear_then_list_is_empty() {
        let store = EventStore::open_in_memory().expect("store");
        store
            .append("OHCA", "", "2025/03/01 14:00", None)
            .await
            .expect("append");
        let deleted = store.clear().await.expect("clear");
        assert_eq!(deleted, 1);
        assert!(store.list(10).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn list_does_not_mutate() {
        let store = EventStore::open_in_memory().expect("store");
        store
            .append("OHCA", "", "2025/03/01 14:00", None)
            .await
            .expect("append");
        let before = store.list(10).await.expect("list");
        let after = store.list(10).await.expect("list again");
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn open_is_idempotent_on_existing_file() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("codeblue.db");
        {
            let store = EventStore::open(&path).expect("first open");
            store
                .append("OHCA", "", "2025/03/01 14:00", None)
                .await
                .expect("append");
        }
        let store = EventStore::open(&path).expect("second open");
        let events = store.list(10).await.expect("list");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "OHCA");
    }

    #[tokio::test]
    async fn extra_absent_roundtrips_as_none() {
        let store = EventStore::open_in_memory().expect("store");
        store
            .append("OHCA", "", "2025/03/01 14:00", None)
            .await
            .expect("append");
        let events = store.list(1).await.expect("list");
        assert!(events[0].extra.is_none());
    }
}
