//! News provider fetchers. Each provider implements the common
//! `NewsFetcher` abstraction so the ingest loops and the custom-research
//! flow stay provider-agnostic.

mod alpha_vantage;
mod event_registry;

pub use alpha_vantage::AlphaVantageFetcher;
pub use event_registry::EventRegistryFetcher;

use async_trait::async_trait;

use marketdesk_common::{EventSource, MarketDeskError, RawArticle};

#[async_trait]
pub trait NewsFetcher: Send + Sync {
    /// Fetch the provider's current batch of articles, optionally narrowed
    /// to a search keyword (providers that cannot search ignore it).
    async fn fetch(&self, keyword: Option<&str>) -> Result<Vec<RawArticle>, MarketDeskError>;

    fn source(&self) -> EventSource;
}
