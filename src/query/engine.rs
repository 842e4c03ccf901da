//! List-read execution: one count plus one bounded fetch per request.
//!
//! The two reads are not snapshot-isolated. Under concurrent writes `total` may be
//! stale relative to `data`; callers get an eventually consistent view.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::pagination::{PageInfo, paginate};
use super::spec::QuerySpec;
use crate::errors::ApiError;
use crate::store::ResourceCollection;
use crate::utils::num::{millis_u64, usize_to_u64};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Issue the count and the fetch on separate threads.
    pub concurrent_reads: bool,
    /// Deadline shared by both reads; expiry surfaces as `StoreTimeout`.
    pub store_timeout_ms: Option<u64>,
}

/// One page of a list read.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedResult {
    pub total: u64,
    pub data: Vec<bson::Document>,
    pub pagination: PageInfo,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceQueryEngine {
    options: EngineOptions,
}

impl ResourceQueryEngine {
    #[must_use]
    pub const fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub const fn options(&self) -> EngineOptions {
        self.options
    }

    /// Runs `spec` against `collection`. A page past the end is an empty result.
    ///
    /// # Errors
    /// Store failures from either read, unchanged. Nothing is retried here.
    pub fn execute<C>(&self, spec: &QuerySpec, collection: &C) -> Result<PagedResult, ApiError>
    where
        C: ResourceCollection + ?Sized,
    {
        let started = Instant::now();
        let deadline = self.options.store_timeout_ms.map(|ms| started + Duration::from_millis(ms));
        let filter = spec.filter().to_filter();
        let opts = spec.find_options(deadline);
        log::debug!(
            "query {} filter={} page={} limit={}",
            collection.name(),
            spec.filter().to_store_json(),
            spec.page(),
            spec.page_size()
        );

        let (total, data) = if self.options.concurrent_reads {
            std::thread::scope(|s| {
                let counting = s.spawn(|| collection.count(&filter, deadline));
                let data = collection.find(&filter, &opts);
                let total = counting.join().unwrap_or_else(|_| {
                    Err(ApiError::StoreUnavailable(format!(
                        "count on '{}' panicked",
                        collection.name()
                    )))
                });
                (total, data)
            })
        } else {
            (collection.count(&filter, deadline), collection.find(&filter, &opts))
        };
        let (total, data) = match (total, data) {
            (Ok(t), Ok(d)) => (t, d),
            (Err(e), _) | (_, Err(e)) => {
                log::warn!("query on '{}' failed: {e}", collection.name());
                return Err(e);
            }
        };

        let pagination = paginate(total, spec.page(), spec.page_size());
        let bench = serde_json::json!({
            "bench": "query",
            "op": "list",
            "collection": collection.name(),
            "duration_ms": millis_u64(started.elapsed()),
            "total": total,
            "result_count": usize_to_u64(data.len()),
            "page": spec.page(),
            "limit": spec.page_size(),
            "skip": spec.skip(),
        });
        crate::dev_trace!("{bench}");
        Ok(PagedResult { total, data, pagination })
    }
}
