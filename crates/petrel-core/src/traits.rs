use std::future::Future;

use crate::error::HarvestError;
use crate::models::{HarvestRecord, PagedKind, PetitionSnapshot};

/// Issues a single GET request and returns the response body.
///
/// The sole point of contact with the network. Implementations classify
/// failures into the [`HarvestError`] taxonomy; they do not retry —
/// retry discipline lives in [`RetryingFetcher`](crate::retry::RetryingFetcher).
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, HarvestError>> + Send;
}

/// The petition API surface the orchestrator drives.
///
/// Generic seam so the harvest pipeline can be tested without real HTTP.
pub trait PetitionApi: Send + Sync + Clone {
    /// Resolve a petition URL to its numeric id.
    fn resolve_id(
        &self,
        petition_url: &str,
    ) -> impl Future<Output = Result<u64, HarvestError>> + Send;

    /// Walk a paged listing to completion, returning one serialized
    /// JSON array of every collected item, in page order.
    fn collect(
        &self,
        petition_id: u64,
        kind: PagedKind,
    ) -> impl Future<Output = Result<String, HarvestError>> + Send;

    /// Fetch the fixed-field metadata snapshot for a petition.
    fn snapshot(
        &self,
        petition_id: u64,
    ) -> impl Future<Output = Result<PetitionSnapshot, HarvestError>> + Send;
}

/// Persists the accumulated result table.
///
/// Each flush is a full-table overwrite of the same destination, not an
/// append: flushing an unchanged table twice must produce identical output.
pub trait RecordSink: Send + Sync {
    fn flush(&self, records: &[HarvestRecord]) -> Result<(), HarvestError>;
}

/// A no-op RecordSink for use when persistence is not needed.
#[derive(Debug, Clone)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn flush(&self, _records: &[HarvestRecord]) -> Result<(), HarvestError> {
        Ok(())
    }
}
