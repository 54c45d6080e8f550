use std::sync::Arc;

use tracing::{debug, info};

use codecontext_core::{FetchError, SourceRelay};

use crate::cache::SourceCache;
use crate::github::normalize_source_url;

/// Result of a fetch: the text and whether the network was touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSource {
    /// Normalized URL used as the cache key.
    pub url: String,
    pub text: String,
    pub from_cache: bool,
}

/// Fetches each distinct URL at most once per session.
#[derive(Clone)]
pub struct SourceFetcher {
    relay: Arc<dyn SourceRelay>,
}

impl SourceFetcher {
    pub fn new(relay: Arc<dyn SourceRelay>) -> Self {
        Self { relay }
    }

    /// True when `url` would be served from `cache` without a network call.
    pub fn is_cached(url: &str, cache: &SourceCache) -> bool {
        normalize_source_url(url)
            .map(|key| cache.contains(&key))
            .unwrap_or(false)
    }

    /// Return the cached text for `url`, or fetch it through the relay and
    /// store it. A failed fetch leaves the cache untouched.
    pub async fn fetch(&self, url: &str, cache: &mut SourceCache) -> Result<FetchedSource, FetchError> {
        let key = normalize_source_url(url)?;

        if let Some(text) = cache.get(&key) {
            debug!(url = %key, "Reusing cached source");
            return Ok(FetchedSource {
                url: key,
                text: text.to_string(),
                from_cache: true,
            });
        }

        let text = self.relay.fetch_raw(&key).await?;
        info!(url = %key, bytes = text.len(), "Fetched source");
        cache.insert(key.clone(), text.clone());

        Ok(FetchedSource {
            url: key,
            text,
            from_cache: false,
        })
    }
}
