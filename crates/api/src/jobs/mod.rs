//! Background job scheduler and job implementations.

mod cache_sweep;
mod pool_metrics;
mod scheduler;

pub use cache_sweep::CacheSweepJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobError, JobFrequency, JobScheduler};
