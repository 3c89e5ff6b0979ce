// Transcript store
//
// One row per debate: id, topic, and a JSON array column accumulating
// {side, content} objects in append order. Append-only contract: no update
// or delete of existing turns. Each append is a single UPDATE statement
// using SQLite's json_insert, so an individual append cannot interleave
// mid-write; cross-append ordering between concurrent writers is not
// defended (single writer per session assumed).

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::debate::Turn;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS debates (
    id         TEXT PRIMARY KEY,
    topic      TEXT NOT NULL,
    messages   TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);
";

/// Append-only log of debate transcripts, backed by SQLite.
#[derive(Clone)]
pub struct TranscriptStore {
    db: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl TranscriptStore {
    /// Open (or create) the store at `path`. WAL mode keeps readers from
    /// blocking the single writer.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!("transcript store ready: {}", path.display());

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// In-memory store for tests and ephemeral runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a debate row seeded with its first turn; returns the new
    /// session identifier.
    pub async fn create(&self, topic: &str, first_turn: &Turn) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let messages =
            serde_json::to_string(&[first_turn]).context("Failed to serialize first turn")?;
        let created_at = chrono::Utc::now().to_rfc3339();

        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO debates (id, topic, messages, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, topic, messages, created_at],
        )
        .context("Failed to create debate row")?;

        tracing::info!(debate_id = %id, topic, "debate created");
        Ok(id)
    }

    /// Append one turn to an existing debate. Single-statement append via
    /// json_insert's end-of-array path.
    pub async fn append(&self, debate_id: &str, turn: &Turn) -> Result<()> {
        let turn_json = serde_json::to_string(turn).context("Failed to serialize turn")?;

        let db = self.db.lock().await;
        let updated = db
            .execute(
                "UPDATE debates SET messages = json_insert(messages, '$[#]', json(?1)) WHERE id = ?2",
                params![turn_json, debate_id],
            )
            .context("Failed to append turn")?;

        if updated == 0 {
            bail!("debate not found: {debate_id}");
        }
        Ok(())
    }

    /// Full turn sequence for a debate, in append order. None when the id
    /// is unknown.
    pub async fn turns(&self, debate_id: &str) -> Result<Option<Vec<Turn>>> {
        let db = self.db.lock().await;
        let row: Option<String> = db
            .query_row(
                "SELECT messages FROM debates WHERE id = ?1",
                params![debate_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read debate")?;

        match row {
            None => Ok(None),
            Some(messages) => {
                // Tolerate a malformed column the way the original did:
                // unreadable history degrades to an empty transcript.
                let turns = serde_json::from_str(&messages).unwrap_or_else(|e| {
                    tracing::error!(debate_id, "failed to parse stored messages: {}", e);
                    Vec::new()
                });
                Ok(Some(turns))
            }
        }
    }

    /// Topic for a debate, if it exists.
    pub async fn topic(&self, debate_id: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let topic = db
            .query_row(
                "SELECT topic FROM debates WHERE id = ?1",
                params![debate_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read debate topic")?;
        Ok(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::Side;

    #[tokio::test]
    async fn test_create_and_read_back() {
        let store = TranscriptStore::open_in_memory().unwrap();
        let first = Turn::new(Side::Pro, "opening argument");
        let id = store.create("test topic", &first).await.unwrap();

        let turns = store.turns(&id).await.unwrap().unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].side, Side::Pro);
        assert_eq!(store.topic(&id).await.unwrap().unwrap(), "test topic");
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = TranscriptStore::open_in_memory().unwrap();
        let id = store
            .create("topic", &Turn::new(Side::Pro, "turn-0"))
            .await
            .unwrap();

        store.append(&id, &Turn::new(Side::Con, "turn-1")).await.unwrap();
        store.append(&id, &Turn::new(Side::User, "interjection")).await.unwrap();
        store.append(&id, &Turn::new(Side::Pro, "turn-2")).await.unwrap();

        let turns = store.turns(&id).await.unwrap().unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["turn-0", "turn-1", "interjection", "turn-2"]);
        assert_eq!(turns[2].side, Side::User);
    }

    #[tokio::test]
    async fn test_append_to_unknown_debate_fails() {
        let store = TranscriptStore::open_in_memory().unwrap();
        let result = store.append("no-such-id", &Turn::new(Side::Pro, "x")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unknown_debate_reads_as_none() {
        let store = TranscriptStore::open_in_memory().unwrap();
        assert!(store.turns("missing").await.unwrap().is_none());
        assert!(store.topic("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcripts.db");

        let id = {
            let store = TranscriptStore::open(&path).unwrap();
            store
                .create("persistent topic", &Turn::new(Side::Pro, "kept"))
                .await
                .unwrap()
        };

        let reopened = TranscriptStore::open(&path).unwrap();
        let turns = reopened.turns(&id).await.unwrap().unwrap();
        assert_eq!(turns[0].content, "kept");
    }
}
