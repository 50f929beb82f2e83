//! Durable message storage.
//!
//! DESIGN
//! ======
//! The feed service talks to storage through `MessageRepo` so the live
//! fan-out logic can be exercised without a database. Production uses
//! `PgMessageRepo`; tests plug in an in-memory repository.

use frames::feed::{Message, NewMessage};
use sqlx::PgPool;
use uuid::Uuid;

/// Storage seam for guestbook messages.
#[async_trait::async_trait]
pub trait MessageRepo: Send + Sync {
    /// Persist a new message under `id` and return the stored record.
    async fn insert(&self, id: Uuid, message: &NewMessage) -> Result<Message, sqlx::Error>;

    /// Load the newest `limit` messages, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<Message>, sqlx::Error>;
}

/// `PostgreSQL`-backed repository over the `messages` table.
pub struct PgMessageRepo {
    pool: PgPool,
}

impl PgMessageRepo {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageRepo for PgMessageRepo {
    async fn insert(&self, id: Uuid, message: &NewMessage) -> Result<Message, sqlx::Error> {
        sqlx::query(r#"INSERT INTO messages (id, name, text, "timestamp") VALUES ($1, $2, $3, $4)"#)
            .bind(id)
            .bind(message.name.as_deref())
            .bind(&message.text)
            .bind(message.timestamp)
            .execute(&self.pool)
            .await?;

        Ok(message.clone().into_message(id.to_string()))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Message>, sqlx::Error> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, (Uuid, Option<String>, String, i64)>(
            r#"SELECT id, name, text, "timestamp"
               FROM messages
               ORDER BY "timestamp" DESC, id DESC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, text, timestamp)| Message { id: id.to_string(), name, text, timestamp })
            .collect())
    }
}

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "store_test.rs"]
mod store_test;
