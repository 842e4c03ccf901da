//! Collection handle consumed by the query engine and the aggregate maintainer,
//! plus the in-memory store that implements it.

mod memory;

pub use memory::{Collection, Engine};

use crate::errors::ApiError;
use crate::query::{AggregateFn, AggregateGroup, Filter, FindOptions};
use crate::types::DocumentId;
use std::sync::Arc;
use std::time::Instant;

/// Read/aggregate access to one resource collection.
///
/// Failures are reported as `ApiError::StoreTimeout` or `ApiError::StoreUnavailable`;
/// implementations never retry.
pub trait ResourceCollection: Send + Sync {
    fn name(&self) -> &str;

    /// Number of records matching `filter`.
    ///
    /// # Errors
    /// Store timeout or unavailability.
    fn count(&self, filter: &Filter, deadline: Option<Instant>) -> Result<u64, ApiError>;

    /// Matching records, sorted, windowed, projected and expanded per `opts`.
    ///
    /// # Errors
    /// Store timeout or unavailability.
    fn find(&self, filter: &Filter, opts: &FindOptions) -> Result<Vec<bson::Document>, ApiError>;

    /// # Errors
    /// Store unavailability.
    fn find_by_id(&self, id: &DocumentId) -> Result<Option<bson::Document>, ApiError>;

    /// Groups the records matching `filter` by `group_key` and applies `func` to the
    /// numeric values of `metric` in each group.
    ///
    /// # Errors
    /// Store unavailability.
    fn aggregate(
        &self,
        filter: &Filter,
        group_key: &str,
        metric: &str,
        func: AggregateFn,
    ) -> Result<Vec<AggregateGroup>, ApiError>;

    /// Sets top-level fields on one record. Returns `false` when the record is missing.
    ///
    /// # Errors
    /// Store unavailability.
    fn update_fields(&self, id: &DocumentId, fields: bson::Document) -> Result<bool, ApiError>;
}

/// Resolves collection handles by name.
pub trait Store: Send + Sync {
    fn collection(&self, name: &str) -> Option<Arc<dyn ResourceCollection>>;
}
