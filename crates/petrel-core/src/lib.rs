pub mod error;
pub mod harvest;
pub mod models;
pub mod retry;
pub mod testutil;
pub mod traits;

pub use error::HarvestError;
pub use harvest::{HarvestConfig, HarvestService};
pub use models::{HarvestRecord, PagedKind, PetitionSnapshot};
pub use retry::{RetryPolicy, RetryingFetcher};
pub use traits::{Fetcher, PetitionApi, RecordSink};
