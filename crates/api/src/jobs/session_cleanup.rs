//! Hourly removal of expired admin sessions and idle rate-limit buckets.

use std::sync::Arc;

use chrono::Utc;
use persistence::store::SessionStore;
use tracing::info;

use super::scheduler::{Job, JobError, JobFrequency};
use crate::middleware::RateLimiterState;

pub struct SessionCleanupJob {
    sessions: Arc<dyn SessionStore>,
    rate_limiter: Option<Arc<RateLimiterState>>,
}

impl SessionCleanupJob {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        rate_limiter: Option<Arc<RateLimiterState>>,
    ) -> Self {
        Self {
            sessions,
            rate_limiter,
        }
    }
}

#[async_trait::async_trait]
impl Job for SessionCleanupJob {
    fn name(&self) -> &'static str {
        "session_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), JobError> {
        let purged = self.sessions.purge_expired(Utc::now()).await?;
        let pruned = self
            .rate_limiter
            .as_ref()
            .map(|limiter| limiter.prune())
            .unwrap_or(0);

        info!(purged, rate_limit_keys = pruned, "Expired sessions purged");
        Ok(())
    }
}
