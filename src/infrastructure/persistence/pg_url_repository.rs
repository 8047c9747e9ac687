//! PostgreSQL implementation of the URL repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{NewUrlRecord, UrlRecord};
use crate::domain::repositories::{InsertOutcome, UrlRepository};
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct UrlRow {
    id: i64,
    code: String,
    target_url: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    visit_count: i64,
    last_visited_at: Option<DateTime<Utc>>,
}

impl From<UrlRow> for UrlRecord {
    fn from(row: UrlRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            target_url: row.target_url,
            created_at: row.created_at,
            expires_at: row.expires_at,
            visit_count: row.visit_count,
            last_visited_at: row.last_visited_at,
        }
    }
}

/// PostgreSQL repository for short link storage.
///
/// Conditional inserts rely on the `urls_code_key` unique constraint:
/// `ON CONFLICT DO NOTHING` makes the insert and the uniqueness check a single
/// atomic statement.
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
}

impl PgUrlRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn insert_if_absent(&self, new_record: NewUrlRecord) -> Result<InsertOutcome, AppError> {
        let row = sqlx::query_as::<_, UrlRow>(
            r#"
            INSERT INTO urls (code, target_url, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT urls_code_key DO NOTHING
            RETURNING id, code, target_url, created_at, expires_at, visit_count, last_visited_at
            "#,
        )
        .bind(&new_record.code)
        .bind(&new_record.target_url)
        .bind(new_record.expires_at)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(match row {
            Some(row) => InsertOutcome::Inserted(row.into()),
            None => InsertOutcome::Conflict,
        })
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<UrlRecord>, AppError> {
        let row = sqlx::query_as::<_, UrlRow>(
            r#"
            SELECT id, code, target_url, created_at, expires_at, visit_count, last_visited_at
            FROM urls
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(UrlRecord::from))
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM urls")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
