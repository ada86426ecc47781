// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! SQLite storage for contact messages.
//!
//! Uses [`sqlx`] with the `sqlite` feature. The schema is a single table,
//! created idempotently on connect. Queries use the runtime-checked
//! `sqlx::query` form so no database is needed at compile time.

use crate::{
    error::Result,
    models::{format_timestamp, ContactMessage, NewContactMessage},
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::debug;

type Row = (i64, String, String, String, String);

/// Database connection wrapper
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database at `url`.
    ///
    /// `url` is a sqlx SQLite URL such as `"sqlite://sqlite.db"`, or
    /// `"sqlite::memory:"` for a private in-memory store.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // Every connection to `:memory:` is its own database, so the pool
        // must hold exactly one and never recycle it.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let mut pool_options = SqlitePoolOptions::new();
        if in_memory {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        Self::init_schema(&pool).await?;
        debug!(url, "Database ready");

        Ok(Self { pool })
    }

    /// Initialize database schema
    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS contact_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS contact_messages_created_at_idx \
             ON contact_messages (created_at)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Insert a message stamped with the current time.
    pub async fn create(&self, message: &NewContactMessage) -> Result<ContactMessage> {
        self.create_at(message, Utc::now()).await
    }

    /// Insert a message with an explicit server timestamp.
    ///
    /// A single `INSERT ... RETURNING`, so the row either exists and is
    /// returned or was never written.
    pub async fn create_at(
        &self,
        message: &NewContactMessage,
        created_at: DateTime<Utc>,
    ) -> Result<ContactMessage> {
        let row: Row = sqlx::query_as(
            "INSERT INTO contact_messages (name, email, message, created_at) \
             VALUES (?1, ?2, ?3, ?4) \
             RETURNING id, name, email, message, created_at",
        )
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.message)
        .bind(format_timestamp(&created_at))
        .fetch_one(&self.pool)
        .await?;

        from_row(row)
    }

    /// All messages, newest first.
    pub async fn list(&self) -> Result<Vec<ContactMessage>> {
        let rows: Vec<Row> = sqlx::query_as(
            "SELECT id, name, email, message, created_at \
             FROM contact_messages \
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(from_row).collect()
    }

    /// Number of stored messages.
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM contact_messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Close the pool; later queries fail with a storage error.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn from_row((id, name, email, message, created_at): Row) -> Result<ContactMessage> {
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
        .with_timezone(&Utc);
    Ok(ContactMessage {
        id,
        name,
        email,
        message,
        created_at,
    })
}
