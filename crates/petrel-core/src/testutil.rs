//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};

use crate::error::HarvestError;
use crate::models::{HarvestRecord, PagedKind, PetitionSnapshot};
use crate::traits::{Fetcher, PetitionApi, RecordSink};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that pops scripted responses and records every requested URL.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns an empty JSON object.
    responses: Arc<Mutex<Vec<Result<String, HarvestError>>>>,
    /// Every URL passed to `fetch`, in call order.
    pub requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(body: &str) -> Self {
        Self::with_responses(vec![Ok(body.to_string())])
    }

    pub fn with_error(error: HarvestError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, HarvestError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        self.requested.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("{}".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockApi
// ---------------------------------------------------------------------------

/// Mock petition API with scripted per-call results.
///
/// Each operation pops its own queue; an empty queue falls back to a
/// healthy default (sequential ids, empty listings, default snapshot),
/// so tests only script the calls they care about.
#[derive(Clone)]
pub struct MockApi {
    resolve: Arc<Mutex<Vec<Result<u64, HarvestError>>>>,
    collect: Arc<Mutex<Vec<Result<String, HarvestError>>>>,
    snapshot: Arc<Mutex<Vec<Result<PetitionSnapshot, HarvestError>>>>,
    next_id: Arc<Mutex<u64>>,
    /// (petition_id, kind) for every collect call, in order.
    pub collect_calls: Arc<Mutex<Vec<(u64, PagedKind)>>>,
}

impl MockApi {
    /// An API where every unscripted call succeeds.
    pub fn healthy() -> Self {
        Self {
            resolve: Arc::new(Mutex::new(Vec::new())),
            collect: Arc::new(Mutex::new(Vec::new())),
            snapshot: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(0)),
            collect_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push_resolve(&self, result: Result<u64, HarvestError>) {
        self.resolve.lock().unwrap().push(result);
    }

    pub fn push_collect(&self, result: Result<String, HarvestError>) {
        self.collect.lock().unwrap().push(result);
    }

    pub fn push_snapshot(&self, result: Result<PetitionSnapshot, HarvestError>) {
        self.snapshot.lock().unwrap().push(result);
    }
}

impl PetitionApi for MockApi {
    async fn resolve_id(&self, _petition_url: &str) -> Result<u64, HarvestError> {
        let mut queue = self.resolve.lock().unwrap();
        if queue.is_empty() {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            Ok(*next)
        } else {
            queue.remove(0)
        }
    }

    async fn collect(&self, petition_id: u64, kind: PagedKind) -> Result<String, HarvestError> {
        self.collect_calls.lock().unwrap().push((petition_id, kind));
        let mut queue = self.collect.lock().unwrap();
        if queue.is_empty() {
            Ok("[]".to_string())
        } else {
            queue.remove(0)
        }
    }

    async fn snapshot(&self, _petition_id: u64) -> Result<PetitionSnapshot, HarvestError> {
        let mut queue = self.snapshot.lock().unwrap();
        if queue.is_empty() {
            Ok(PetitionSnapshot::default())
        } else {
            queue.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockSink
// ---------------------------------------------------------------------------

/// Mock sink that records every flushed table snapshot.
#[derive(Clone)]
pub struct MockSink {
    flushed: Arc<Mutex<Vec<Vec<HarvestRecord>>>>,
    flush_error: Arc<Mutex<Option<HarvestError>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            flushed: Arc::new(Mutex::new(Vec::new())),
            flush_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Sink that fails the first flush.
    pub fn with_flush_error(error: HarvestError) -> Self {
        let sink = Self::new();
        *sink.flush_error.lock().unwrap() = Some(error);
        sink
    }

    /// Every table snapshot flushed so far, in flush order.
    pub fn flushes(&self) -> Vec<Vec<HarvestRecord>> {
        self.flushed.lock().unwrap().clone()
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordSink for MockSink {
    fn flush(&self, records: &[HarvestRecord]) -> Result<(), HarvestError> {
        let mut err = self.flush_error.lock().unwrap();
        if let Some(e) = err.take() {
            return Err(e);
        }
        self.flushed.lock().unwrap().push(records.to_vec());
        Ok(())
    }
}
