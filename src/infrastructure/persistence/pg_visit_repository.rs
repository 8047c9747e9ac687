//! PostgreSQL implementation of the visit repository.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::entities::{DailyVisits, VisitEvent};
use crate::domain::repositories::VisitRepository;
use crate::error::AppError;

/// Rows per multi-row INSERT. Four binds per row keeps every statement far
/// below Postgres' 65535 bind parameter limit.
const INSERT_CHUNK: usize = 1000;

#[derive(sqlx::FromRow)]
struct DailyRow {
    day: NaiveDate,
    count: i64,
}

/// PostgreSQL repository for visit analytics.
///
/// A batch is written in one transaction: the raw log rows, the per-day
/// counters and the per-link totals commit or roll back together.
pub struct PgVisitRepository {
    pool: Arc<PgPool>,
}

impl PgVisitRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VisitRepository for PgVisitRepository {
    async fn record_batch(&self, visits: &[VisitEvent]) -> Result<u64, AppError> {
        if visits.is_empty() {
            return Ok(0);
        }

        let mut daily: HashMap<(&str, NaiveDate), i64> = HashMap::new();
        let mut totals: HashMap<&str, (i64, DateTime<Utc>)> = HashMap::new();
        for visit in visits {
            *daily.entry((visit.code.as_str(), visit.day())).or_default() += 1;

            let total = totals
                .entry(visit.code.as_str())
                .or_insert((0, visit.visited_at));
            total.0 += 1;
            total.1 = total.1.max(visit.visited_at);
        }

        let mut tx = self.pool.begin().await?;

        for chunk in visits.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO url_visits (code, visited_at, ip, user_agent) ");
            builder.push_values(chunk, |mut row, visit| {
                row.push_bind(&visit.code)
                    .push_bind(visit.visited_at)
                    .push_bind(visit.source_ip.as_deref())
                    .push_bind(visit.user_agent.as_deref());
            });
            builder.build().execute(&mut *tx).await?;
        }

        let (codes, (days, counts)): (Vec<String>, (Vec<NaiveDate>, Vec<i64>)) = daily
            .into_iter()
            .map(|((code, day), count)| (code.to_string(), (day, count)))
            .unzip();

        sqlx::query(
            r#"
            INSERT INTO url_daily_stats (code, day, count)
            SELECT * FROM UNNEST($1::text[], $2::date[], $3::bigint[])
            ON CONFLICT (code, day) DO UPDATE SET count = url_daily_stats.count + EXCLUDED.count
            "#,
        )
        .bind(&codes)
        .bind(&days)
        .bind(&counts)
        .execute(&mut *tx)
        .await?;

        let (codes, (counts, last_visits)): (Vec<String>, (Vec<i64>, Vec<DateTime<Utc>>)) =
            totals
                .into_iter()
                .map(|(code, (count, last))| (code.to_string(), (count, last)))
                .unzip();

        sqlx::query(
            r#"
            UPDATE urls u
            SET visit_count = u.visit_count + v.count,
                last_visited_at = GREATEST(u.last_visited_at, v.last_visited)
            FROM UNNEST($1::text[], $2::bigint[], $3::timestamptz[]) AS v(code, count, last_visited)
            WHERE u.code = v.code
            "#,
        )
        .bind(&codes)
        .bind(&counts)
        .bind(&last_visits)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(visits.len() as u64)
    }

    async fn daily_visits(&self, code: &str, days: u32) -> Result<Vec<DailyVisits>, AppError> {
        let today = Utc::now().date_naive();
        let since = today - Duration::days(i64::from(days.max(1)) - 1);

        let rows = sqlx::query_as::<_, DailyRow>(
            r#"
            SELECT day, count
            FROM url_daily_stats
            WHERE code = $1 AND day >= $2 AND day <= $3
            ORDER BY day ASC
            "#,
        )
        .bind(code)
        .bind(since)
        .bind(today)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| DailyVisits {
                day: r.day,
                count: r.count,
            })
            .collect())
    }

    async fn count_visits(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM url_visits")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }
}
