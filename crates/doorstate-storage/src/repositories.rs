// Repository layer for database operations

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;

use crate::models::DoorStateRow;

/// Pause between two connection attempts at startup
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Connect and run migrations, retrying while the database comes up
    pub async fn connect_with_retry(database_url: &str, attempts: u32) -> Result<Self> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = async {
                let db = Self::from_url(database_url).await?;
                db.migrate().await?;
                Ok::<_, anyhow::Error>(db)
            }
            .await;

            match result {
                Ok(db) => return Ok(db),
                Err(e) if attempt < attempts => {
                    tracing::error!(
                        attempt,
                        attempts,
                        error = %e,
                        "Failed to connect to database, retrying"
                    );
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e).context(format!(
                        "Failed to connect to database after {} attempts",
                        attempts
                    ))
                }
            }
        }
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ============================================
    // Door state events
    // ============================================

    pub async fn upsert_door_state(&self, time: DateTime<Utc>, state: &str) -> Result<DoorStateRow> {
        let row = sqlx::query_as::<_, DoorStateRow>(
            r#"
            INSERT INTO door_state_events (time, state)
            VALUES ($1, $2)
            ON CONFLICT (time) DO UPDATE SET state = EXCLUDED.state
            RETURNING time, state
            "#,
        )
        .bind(time)
        .bind(state)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Newest `limit` rows in `[since, until]`, returned oldest first
    pub async fn list_door_states(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DoorStateRow>> {
        let rows = sqlx::query_as::<_, DoorStateRow>(
            r#"
            SELECT time, state FROM (
                SELECT time, state
                FROM door_state_events
                WHERE time >= $1 AND time <= $2
                ORDER BY time DESC
                LIMIT $3
            ) newest
            ORDER BY time ASC
            "#,
        )
        .bind(since)
        .bind(until)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn get_latest_door_state(&self) -> Result<Option<DoorStateRow>> {
        let row = sqlx::query_as::<_, DoorStateRow>(
            r#"
            SELECT time, state
            FROM door_state_events
            ORDER BY time DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
