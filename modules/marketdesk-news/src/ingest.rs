//! Periodic provider ingest. Each provider gets its own loop: fetch the
//! current batch on a fixed cadence and fan out one enrichment task per
//! article.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::fetchers::NewsFetcher;
use crate::orchestrator::Orchestrator;

/// Spawn the ingest loop for one provider. The first tick fires after one
/// full interval so a restart doesn't immediately refetch.
pub fn spawn_provider_loop(
    orchestrator: Arc<Orchestrator>,
    fetcher: Arc<dyn NewsFetcher>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let source = fetcher.source();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // consume the immediate first tick

        loop {
            ticker.tick().await;
            info!(source = %source, "ingest: fetching provider batch");

            match fetcher.fetch(None).await {
                Ok(articles) => {
                    info!(source = %source, articles = articles.len(), "ingest: batch fetched");
                    for article in articles {
                        orchestrator.clone().spawn_article(article, source);
                    }
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "ingest: provider fetch failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::EnrichmentPipeline;
    use crate::relay::ProgressRelay;
    use crate::testing::{MemoryRepo, StaticFetcher, StubEnricher};
    use marketdesk_common::RawArticle;

    #[tokio::test(start_paused = true)]
    async fn loop_fetches_on_each_tick() {
        let repo = Arc::new(MemoryRepo::default());
        let orchestrator = Arc::new(Orchestrator::new(
            EnrichmentPipeline::new(Arc::new(StubEnricher::financial())),
            repo.clone(),
            ProgressRelay::default(),
        ));
        let fetcher = Arc::new(StaticFetcher::new(vec![RawArticle {
            title: "CPI print".into(),
            summary: "inflation data".into(),
            url: "https://news.example/cpi".into(),
            ..Default::default()
        }]));

        let handle = spawn_provider_loop(orchestrator, fetcher, Duration::from_secs(60));

        // Two intervals -> two batches of one article each
        tokio::time::sleep(Duration::from_secs(130)).await;
        handle.abort();

        // Both runs created an event (ids differ per run)
        assert_eq!(repo.events().len(), 2);
    }
}
