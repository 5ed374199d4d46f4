//! Jobs feature module
//!
//! Records submitted jobs in the jobs index and serves them back by id.
//! Executing a job is not this server's concern: a submission only
//! produces a pending record.

pub mod commands;
pub mod queries;
pub mod routes;
pub mod task_id;
pub mod types;


use spark_common::store::{DocumentStore, IndexSettings};
use spark_common::RetryPolicy;
use std::sync::Arc;

pub use routes::{jobs_routes, submit_routes};
pub use task_id::{IdGenerator, RandomIdGenerator};
pub use types::{JobDocument, JobRecord, JobStatus};

/// Capabilities the job handlers run against
#[derive(Clone)]
pub struct JobsContext {
    /// Shared store client, safe for concurrent use
    pub store: Arc<dyn DocumentStore>,
    pub ids: Arc<dyn IdGenerator>,
    /// Index holding job records
    pub index: String,
    pub settings: IndexSettings,
    /// Applied to the jobs index check
    pub retry: RetryPolicy,
}

impl JobsContext {
    pub fn new(store: Arc<dyn DocumentStore>, index: impl Into<String>) -> Self {
        Self {
            store,
            ids: Arc::new(RandomIdGenerator::new()),
            index: index.into(),
            settings: IndexSettings::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_settings(mut self, settings: IndexSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
