//! Database metrics collection.

use domain::StoreError;
use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

use crate::error::store_error;

/// Record database connection pool metrics.
///
/// Called periodically by the pool metrics job.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times one store operation and records it as
/// `database_query_duration_seconds{query, outcome}`.
///
/// ```ignore
/// let timer = QueryTimer::new("find_meeting_by_code");
/// let result = sqlx::query_as::<_, MeetingEntity>(...).fetch_optional(&pool).await;
/// timer.finish(result)
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    /// Records the elapsed time and converts the sqlx error for the port.
    pub fn finish<T>(self, result: Result<T, sqlx::Error>) -> Result<T, StoreError> {
        let outcome = if result.is_ok() { "ok" } else { "error" };
        histogram!(
            "database_query_duration_seconds",
            "query" => self.query_name,
            "outcome" => outcome
        )
        .record(self.start.elapsed().as_secs_f64());

        result.map_err(|err| {
            tracing::debug!(query = self.query_name, error = %err, "Query failed");
            store_error(err)
        })
    }
}
