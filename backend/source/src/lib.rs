pub mod cache;
pub mod fetcher;
pub mod github;
pub mod relay;

pub use cache::SourceCache;
pub use fetcher::{FetchedSource, SourceFetcher};
pub use github::normalize_source_url;
pub use relay::RelayClient;
