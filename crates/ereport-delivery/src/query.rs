use async_trait::async_trait;
use ereport_core::{ResultSet, TimeWindow};

use crate::error::Result;

/// Executes expanded panel SQL against a datasource.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Run `sql` over `window` on the datasource `datasource_id`.
    ///
    /// The returned set has an empty title; callers name it after the panel.
    async fn run_query(&self, sql: &str, window: TimeWindow, datasource_id: i64)
        -> Result<ResultSet>;
}
