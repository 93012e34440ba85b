use crate::error::LogError;
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: String,
    pub user_id: String,
    pub user_message: String,
    pub reply: String,
}

impl LogEntry {
    pub fn new(user_id: &str, user_message: &str, reply: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            user_id: user_id.to_string(),
            user_message: user_message.to_string(),
            reply: reply.to_string(),
        }
    }
}

/// Append-only record of every chat turn
pub trait ConversationLog: Send + Sync {
    fn append(&self, entry: &LogEntry) -> Result<(), LogError>;
    /// Most recent `limit` entries, oldest first
    fn recent(&self, limit: usize) -> Result<Vec<LogEntry>, LogError>;
    fn count(&self) -> Result<u64, LogError>;
}

pub struct SqliteConversationLog {
    conn: Mutex<Connection>,
}

impl SqliteConversationLog {
    pub fn open(path: &Path) -> Result<Self, LogError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, LogError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, LogError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS chat_logs (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                user_id TEXT NOT NULL,
                user_message TEXT NOT NULL,
                reply TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chat_logs_user ON chat_logs(user_id);
            ",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T, LogError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        Ok(f(&conn)?)
    }
}

impl ConversationLog for SqliteConversationLog {
    fn append(&self, entry: &LogEntry) -> Result<(), LogError> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO chat_logs (id, timestamp, user_id, user_message, reply)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.id,
                    entry.timestamp,
                    entry.user_id,
                    entry.user_message,
                    entry.reply
                ],
            )?;
            Ok(())
        })
    }

    fn recent(&self, limit: usize) -> Result<Vec<LogEntry>, LogError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, user_id, user_message, reply
                 FROM chat_logs
                 ORDER BY rowid DESC
                 LIMIT ?1",
            )?;

            let entries = stmt.query_map(params![limit as i64], |row| {
                Ok(LogEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    user_id: row.get(2)?,
                    user_message: row.get(3)?,
                    reply: row.get(4)?,
                })
            })?;

            let mut result: Vec<LogEntry> = entries.collect::<rusqlite::Result<Vec<_>>>()?;
            result.reverse();
            Ok(result)
        })
    }

    fn count(&self) -> Result<u64, LogError> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM chat_logs", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
    }
}
