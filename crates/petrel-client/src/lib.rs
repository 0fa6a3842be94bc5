pub mod api;
pub mod fetcher;

pub use api::{PetitionClient, SNAPSHOT_FIELDS};
pub use fetcher::HttpFetcher;
