//! Store metrics collection.
//!
//! Every adapter call is timed under the `store_query_duration_seconds`
//! histogram, labelled with the backend and the operation.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record the duration of one store operation.
pub fn record_query_duration(backend: &'static str, operation: &str, duration_secs: f64) {
    histogram!(
        "store_query_duration_seconds",
        "backend" => backend,
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// Count a failed store operation.
pub fn record_query_error(backend: &'static str, operation: &str) {
    counter!(
        "store_query_errors_total",
        "backend" => backend,
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record database connection pool metrics.
///
/// Call this function periodically to track pool health.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times one store operation.
///
/// ```ignore
/// let timer = QueryTimer::new("postgres", "documents.get_by_id");
/// let result = sqlx::query_as::<_, DocumentEntity>(...).fetch_optional(&pool).await;
/// timer.finish(&result)
/// ```
pub struct QueryTimer {
    backend: &'static str,
    operation: String,
    start: Instant,
}

impl QueryTimer {
    pub fn new(backend: &'static str, operation: impl Into<String>) -> Self {
        Self {
            backend,
            operation: operation.into(),
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration to metrics.
    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_query_duration(self.backend, &self.operation, duration);
    }

    /// Records the duration and, for an `Err`, the error counter. Passes the result through.
    pub fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E> {
        if result.is_err() {
            record_query_error(self.backend, &self.operation);
        }
        self.record();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_timer_creation() {
        let timer = QueryTimer::new("memory", "documents.get_all");
        assert_eq!(timer.backend, "memory");
        assert_eq!(timer.operation, "documents.get_all");
    }

    #[test]
    fn test_finish_passes_result_through() {
        let ok: Result<u8, &str> = QueryTimer::new("memory", "op").finish(Ok(3));
        assert_eq!(ok, Ok(3));

        let err: Result<u8, &str> = QueryTimer::new("memory", "op").finish(Err("boom"));
        assert_eq!(err, Err("boom"));
    }
}
