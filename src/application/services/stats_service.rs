//! Visit statistics service.

use std::sync::Arc;

use crate::domain::entities::{DailyVisits, UrlRecord};
use crate::domain::repositories::{UrlRepository, VisitRepository};
use crate::error::AppError;
use serde_json::json;

/// Largest `days` window accepted by [`StatsService::get_stats`].
pub const MAX_STATS_DAYS: u32 = 365;

/// Link metadata with its visit aggregates.
#[derive(Debug, Clone)]
pub struct UrlStats {
    pub record: UrlRecord,
    /// Per-day counts, present only when a window was requested.
    pub daily: Option<Vec<DailyVisits>>,
}

/// Service for reading visit statistics.
///
/// Counters are maintained by the visit pipeline, so figures lag live traffic
/// by up to one flush interval.
pub struct StatsService {
    urls: Arc<dyn UrlRepository>,
    visits: Arc<dyn VisitRepository>,
}

impl StatsService {
    pub fn new(urls: Arc<dyn UrlRepository>, visits: Arc<dyn VisitRepository>) -> Self {
        Self { urls, visits }
    }

    /// Statistics for a short code, with daily counts for the last `days` days
    /// (today included) when `days` is given.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `days` is outside `1..=365`.
    /// Returns [`AppError::NotFound`] if the code does not exist.
    pub async fn get_stats(&self, code: &str, days: Option<u32>) -> Result<UrlStats, AppError> {
        if let Some(days) = days
            && !(1..=MAX_STATS_DAYS).contains(&days)
        {
            return Err(AppError::bad_request(
                format!("days must be between 1 and {MAX_STATS_DAYS}"),
                json!({ "days": days }),
            ));
        }

        let record = self
            .urls
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))?;

        let daily = match days {
            Some(days) => Some(self.visits.daily_visits(code, days).await?),
            None => None,
        };

        Ok(UrlStats { record, daily })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::{MockUrlRepository, MockVisitRepository};
    use chrono::Utc;

    fn test_record(code: &str) -> UrlRecord {
        let mut record = UrlRecord::new(
            1,
            code.to_string(),
            "https://example.com/".to_string(),
            Utc::now(),
            None,
        );
        record.visit_count = 42;
        record
    }

    #[tokio::test]
    async fn test_get_stats_without_daily() {
        let mut mock_urls = MockUrlRepository::new();
        mock_urls
            .expect_find_by_code()
            .times(1)
            .returning(|code| Ok(Some(test_record(code))));

        let mut mock_visits = MockVisitRepository::new();
        mock_visits.expect_daily_visits().times(0);

        let service = StatsService::new(Arc::new(mock_urls), Arc::new(mock_visits));

        let stats = service.get_stats("abc1234", None).await.unwrap();
        assert_eq!(stats.record.visit_count, 42);
        assert!(stats.daily.is_none());
    }

    #[tokio::test]
    async fn test_get_stats_with_daily() {
        let mut mock_urls = MockUrlRepository::new();
        mock_urls
            .expect_find_by_code()
            .returning(|code| Ok(Some(test_record(code))));

        let mut mock_visits = MockVisitRepository::new();
        mock_visits
            .expect_daily_visits()
            .withf(|code, days| code == "abc1234" && *days == 7)
            .times(1)
            .returning(|_, _| {
                Ok(vec![DailyVisits {
                    day: Utc::now().date_naive(),
                    count: 3,
                }])
            });

        let service = StatsService::new(Arc::new(mock_urls), Arc::new(mock_visits));

        let stats = service.get_stats("abc1234", Some(7)).await.unwrap();
        assert_eq!(stats.daily.unwrap()[0].count, 3);
    }

    #[tokio::test]
    async fn test_get_stats_not_found() {
        let mut mock_urls = MockUrlRepository::new();
        mock_urls.expect_find_by_code().returning(|_| Ok(None));

        let service = StatsService::new(Arc::new(mock_urls), Arc::new(MockVisitRepository::new()));

        let result = service.get_stats("missing", None).await;
        assert!(matches!(result.unwrap_err(), AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_stats_rejects_bad_window() {
        let mut mock_urls = MockUrlRepository::new();
        mock_urls.expect_find_by_code().times(0);

        let service = StatsService::new(Arc::new(mock_urls), Arc::new(MockVisitRepository::new()));

        for days in [0, 366] {
            let result = service.get_stats("abc1234", Some(days)).await;
            assert!(matches!(result.unwrap_err(), AppError::Validation { .. }));
        }
    }
}
