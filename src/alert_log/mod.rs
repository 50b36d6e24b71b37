//! AlertLog - Alert Event Recording
//!
//! ## Responsibilities
//!
//! - Keep recent alert events in a ring buffer for the API
//! - Persist every alert attempt to SQLite
//! - Reload the newest events from the table on startup
//!
//! Ids come from the SQLite rowid, so the sequence continues across
//! restarts.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// One fall-alert attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub alert_id: u64,
    /// Guardian number the SMS was addressed to
    pub number: String,
    /// Detection label that triggered the alert
    pub label: String,
    /// Detection confidence that triggered the alert
    pub conf: f32,
    /// Provider message SID when delivery succeeded
    pub message_sid: Option<String>,
    /// Whether the SMS was accepted by the provider
    pub delivered: bool,
    pub created_at: DateTime<Utc>,
}

/// Ring buffer for alert events
struct AlertRingBuffer {
    events: VecDeque<AlertEvent>,
    capacity: usize,
}

impl AlertRingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, event: AlertEvent) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn get_latest(&self, count: usize) -> Vec<AlertEvent> {
        self.events.iter().rev().take(count).cloned().collect()
    }
}

/// Database row shape for an alert event
type AlertRow = (
    i64,
    String,
    String,
    f32,
    Option<String>,
    bool,
    DateTime<Utc>,
);

/// AlertLog instance
pub struct AlertLog {
    buffer: RwLock<AlertRingBuffer>,
    pool: SqlitePool,
}

impl AlertLog {
    /// Create new AlertLog, initializing the schema and reloading the
    /// newest events from the table
    pub async fn new(pool: SqlitePool, capacity: usize) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                number TEXT NOT NULL,
                label TEXT NOT NULL,
                conf REAL NOT NULL,
                message_sid TEXT,
                delivered INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        let rows: Vec<AlertRow> = sqlx::query_as(
            r#"
            SELECT id, number, label, conf, message_sid, delivered, created_at
            FROM alerts ORDER BY id DESC LIMIT ?
            "#,
        )
        .bind(capacity as i64)
        .fetch_all(&pool)
        .await?;

        let mut buffer = AlertRingBuffer::new(capacity);
        for (id, number, label, conf, message_sid, delivered, created_at) in
            rows.into_iter().rev()
        {
            buffer.push(AlertEvent {
                alert_id: id as u64,
                number,
                label,
                conf,
                message_sid,
                delivered,
                created_at,
            });
        }

        tracing::info!(
            reloaded = buffer.events.len(),
            "AlertLog initialized"
        );

        Ok(Self {
            buffer: RwLock::new(buffer),
            pool,
        })
    }

    /// Record an alert attempt (database row + ring buffer)
    pub async fn record(&self, mut event: AlertEvent) -> Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO alerts (number, label, conf, message_sid, delivered, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.number)
        .bind(&event.label)
        .bind(event.conf)
        .bind(&event.message_sid)
        .bind(event.delivered)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid() as u64;
        event.alert_id = id;

        let mut buffer = self.buffer.write().await;
        buffer.push(event);
        tracing::debug!(alert_id = id, "Alert recorded");
        Ok(id)
    }

    /// Get latest alert events
    pub async fn get_latest(&self, count: usize) -> Vec<AlertEvent> {
        let buffer = self.buffer.read().await;
        buffer.get_latest(count)
    }

    /// Number of events currently buffered
    pub async fn count(&self) -> usize {
        let buffer = self.buffer.read().await;
        buffer.events.len()
    }
}
