//! Batch scheduler: fans the row pipeline out across all input rows.
//!
//! Row-level concurrency is bounded by its own gate, independent of and
//! typically smaller than the gateway's pool (20 rows at up to 4 calls each
//! can exceed the pool of 50, so the gateway gate is the true global
//! throttle). Output order always matches input order, and every input row
//! yields exactly one record.

use crate::pipeline::{self, EnrichedRecord, RowInput, Services, NOT_AVAILABLE};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

pub const DEFAULT_MAX_CONCURRENT_ROWS: usize = 20;

pub struct BatchScheduler {
    services: Services,
    max_concurrent_rows: usize,
}

impl BatchScheduler {
    pub fn new(services: Services, max_concurrent_rows: usize) -> Self {
        Self {
            services,
            max_concurrent_rows: max_concurrent_rows.max(1),
        }
    }

    /// Process every input row concurrently under the row gate.
    ///
    /// A row whose task aborts (panic in orchestration glue; stage failures
    /// never escape the pipeline) becomes an error record for that row only.
    /// No retry at this layer.
    pub async fn process(&self, rows: Vec<RowInput>) -> Vec<EnrichedRecord> {
        info!(
            rows = rows.len(),
            max_concurrent = self.max_concurrent_rows,
            "starting batch"
        );
        let gate = Arc::new(Semaphore::new(self.max_concurrent_rows));

        let mut handles = Vec::with_capacity(rows.len());
        let mut fallbacks = Vec::with_capacity(rows.len());
        for input in rows {
            fallbacks.push(input.clone());
            let gate = Arc::clone(&gate);
            let services = self.services.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire_owned().await.ok();
                pipeline::run_row(&services, input).await
            }));
        }

        let results = join_all(handles).await;
        let records: Vec<EnrichedRecord> = results
            .into_iter()
            .zip(fallbacks)
            .map(|(result, input)| match result {
                Ok(record) => record,
                Err(e) => {
                    error!(row_id = %input.row_id, "row pipeline aborted: {e}");
                    error_record(&input, &format!("row pipeline aborted: {e}"))
                }
            })
            .collect();

        info!(rows = records.len(), "batch complete");
        records
    }
}

/// Uniform-schema error record for a row whose pipeline task never produced
/// output: input fields carried through, everything else "N/A".
fn error_record(input: &RowInput, message: &str) -> EnrichedRecord {
    let na = || NOT_AVAILABLE.to_string();
    EnrichedRecord {
        vendor_name: input.vendor_name.clone(),
        vendor_url: input.vendor_url.clone(),
        product_name: input.product_name.clone(),
        product_url: input.product_url.clone(),
        legal_vendor_name: na(),
        official_vendor_website: na(),
        acquiring_company: na(),
        wikipedia_link: na(),
        linkedin_profile: na(),
        founded_year: na(),
        product_type: na(),
        product_users: na(),
        product_tasks: na(),
        product_features: na(),
        taxonomy_match_1: na(),
        taxonomy_match_2: na(),
        attribute_1: na(),
        attribute_2: na(),
        attribute_3: na(),
        platform_1: na(),
        platform_2: na(),
        errors: message.to_string(),
        row_id: input.row_id.clone(),
    }
}
