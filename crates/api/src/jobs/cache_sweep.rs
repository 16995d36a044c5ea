//! Background job evicting expired directory listings.

use std::sync::Arc;

use domain::services::TtlDirectoryCache;

use super::scheduler::{Job, JobError, JobFrequency};

/// Drops expired entries so the cache does not hold dead listings until the
/// next `put` on a full cache.
pub struct CacheSweepJob {
    cache: Arc<TtlDirectoryCache>,
    interval_secs: u64,
}

impl CacheSweepJob {
    pub fn new(cache: Arc<TtlDirectoryCache>, interval_secs: u64) -> Self {
        Self {
            cache,
            interval_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for CacheSweepJob {
    fn name(&self) -> &'static str {
        "directory_cache_sweep"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> Result<(), JobError> {
        let purged = self.cache.purge_expired();
        let remaining = self.cache.len();
        metrics::gauge!("directory_cache_entries").set(remaining as f64);
        if purged > 0 {
            tracing::info!(purged, remaining, "Expired directory listings purged");
        }
        Ok(())
    }
}
