//! DTOs for link statistics.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::application::services::UrlStats;

/// Query parameters for `GET /stats/{code}`.
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Include per-day counts for the last `days` days.
    pub days: Option<u32>,
}

/// Statistics for a single short link.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub code: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub visit_count: i64,
    pub last_visited_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily: Option<Vec<DailyVisitsInfo>>,
}

/// Visit count for one day.
#[derive(Debug, Serialize)]
pub struct DailyVisitsInfo {
    pub day: NaiveDate,
    pub count: i64,
}

impl From<UrlStats> for StatsResponse {
    fn from(stats: UrlStats) -> Self {
        let record = stats.record;
        Self {
            code: record.code,
            target_url: record.target_url,
            created_at: record.created_at,
            expires_at: record.expires_at,
            visit_count: record.visit_count,
            last_visited_at: record.last_visited_at,
            daily: stats.daily.map(|days| {
                days.into_iter()
                    .map(|d| DailyVisitsInfo {
                        day: d.day,
                        count: d.count,
                    })
                    .collect()
            }),
        }
    }
}
