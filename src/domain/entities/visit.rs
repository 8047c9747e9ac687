//! Visit tracking entities.

use chrono::{DateTime, NaiveDate, Utc};

/// A single redirect, as handed from the resolver to the visit pipeline.
///
/// `code` is a weak reference: the link may have expired or been deleted by the
/// time the event is flushed. Events move by value through the pipeline queue.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitEvent {
    pub code: String,
    pub visited_at: DateTime<Utc>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl VisitEvent {
    /// Creates an event stamped with the current time.
    pub fn new(code: String, source_ip: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            code,
            visited_at: Utc::now(),
            source_ip,
            user_agent,
        }
    }

    /// Calendar day (UTC) the visit counts towards.
    pub fn day(&self) -> NaiveDate {
        self.visited_at.date_naive()
    }
}

/// Aggregated visit count for one code on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyVisits {
    pub day: NaiveDate,
    pub count: i64,
}
