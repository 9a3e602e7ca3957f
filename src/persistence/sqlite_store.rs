//! SQLite implementation of the EventStore trait

use super::{EventStore, PersistenceError};
use crate::models::{LoginEvent, Outcome, RejectionRecord};
use rusqlite::{params, Connection};
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// SQLite-backed login event log
///
/// The connection is held behind a mutex, which serializes all
/// appends; `query` therefore never observes a partial write.
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

impl SqliteEventStore {
    /// Create a new event store at the specified path
    ///
    /// Creates the database file and initializes the schema if it doesn't exist.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, PersistenceError> {
        let conn = Connection::open(db_path)?;
        let store = SqliteEventStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory event store (useful for testing)
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteEventStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<(), PersistenceError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    /// Helper to parse an optional IP address from a database string
    fn parse_source(source: Option<String>) -> Result<Option<IpAddr>, PersistenceError> {
        match source {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => IpAddr::from_str(&s)
                .map(Some)
                .map_err(|_| PersistenceError::InvalidData(format!("Invalid IP address: {}", s))),
        }
    }
}

impl EventStore for SqliteEventStore {
    fn append(&self, event: &LoginEvent) -> Result<(), PersistenceError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO login_events (identifier, outcome, timestamp, source_address)
             VALUES (?, ?, ?, ?)",
            params![
                event.identifier,
                event.outcome.as_i64(),
                event.timestamp,
                event.source_address.map(|ip| ip.to_string()),
            ],
        )?;
        Ok(())
    }

    fn query(&self, identifier: &str, since: Option<i64>) -> Result<Vec<LoginEvent>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT identifier, outcome, timestamp, source_address FROM login_events
             WHERE identifier = ? AND timestamp >= ?
             ORDER BY timestamp ASC, id ASC",
        )?;

        let rows = stmt
            .query_map(params![identifier, since.unwrap_or(i64::MIN)], |row| {
                let identifier: String = row.get(0)?;
                let outcome: i64 = row.get(1)?;
                let timestamp: i64 = row.get(2)?;
                let source: Option<String> = row.get(3)?;
                Ok((identifier, outcome, timestamp, source))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut events = Vec::with_capacity(rows.len());
        for (identifier, outcome, timestamp, source) in rows {
            let outcome = Outcome::from_i64(outcome).ok_or_else(|| {
                PersistenceError::InvalidData(format!("Invalid outcome value: {}", outcome))
            })?;
            events.push(LoginEvent {
                identifier,
                outcome,
                timestamp,
                source_address: Self::parse_source(source)?,
            });
        }

        Ok(events)
    }

    fn failure_count_since(&self, identifier: &str, since: i64) -> Result<usize, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM login_events
             WHERE identifier = ? AND outcome = 0 AND timestamp >= ?",
            params![identifier, since],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn record_rejection(&self, record: &RejectionRecord) -> Result<(), PersistenceError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO rejections (identifier, reason, source_address, timestamp, detail)
             VALUES (?, ?, ?, ?, ?)",
            params![
                record.identifier,
                record.reason,
                record.source_address,
                record.timestamp,
                record.detail
            ],
        )?;
        Ok(())
    }

    fn recent_rejections(&self, limit: usize) -> Result<Vec<RejectionRecord>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT identifier, reason, source_address, timestamp, detail
             FROM rejections
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )?;

        let records = stmt
            .query_map(params![limit], |row| {
                Ok(RejectionRecord {
                    identifier: row.get(0)?,
                    reason: row.get(1)?,
                    source_address: row.get(2)?,
                    timestamp: row.get(3)?,
                    detail: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn prune_before(&self, before_timestamp: i64) -> Result<usize, PersistenceError> {
        let conn = self.conn.lock().unwrap();

        let mut total_deleted = 0usize;

        total_deleted += conn.execute(
            "DELETE FROM login_events WHERE timestamp < ?",
            params![before_timestamp],
        )?;

        total_deleted += conn.execute(
            "DELETE FROM rejections WHERE timestamp < ?",
            params![before_timestamp],
        )?;

        Ok(total_deleted)
    }

    fn clear_all(&self) -> Result<(), PersistenceError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "DELETE FROM login_events;
             DELETE FROM rejections;",
        )?;
        Ok(())
    }
}
