//! Drives the enrichment pipeline per article as background work.
//!
//! After every stage the snapshot is persisted and broadcast, so a watcher
//! sees the event fill in live and a restart never loses completed stages.
//! A stage failure marks that event Failed and stops; other articles are
//! unaffected.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};
use uuid::Uuid;

use marketdesk_common::{EventSnapshot, EventSource, ProcessingStatus, ProgressUpdate, RawArticle};

use crate::fetchers::NewsFetcher;
use crate::pipeline::{ArticleContext, EnrichmentPipeline, Stage};
use crate::relay::ProgressRelay;
use crate::traits::EventRepo;

pub struct Orchestrator {
    pipeline: EnrichmentPipeline,
    repo: Arc<dyn EventRepo>,
    relay: ProgressRelay,
    /// Keyword search provider for user-initiated research.
    search_fetcher: Option<Arc<dyn NewsFetcher>>,
}

impl Orchestrator {
    pub fn new(
        pipeline: EnrichmentPipeline,
        repo: Arc<dyn EventRepo>,
        relay: ProgressRelay,
    ) -> Self {
        Self {
            pipeline,
            repo,
            relay,
            search_fetcher: None,
        }
    }

    pub fn with_search_fetcher(mut self, fetcher: Arc<dyn NewsFetcher>) -> Self {
        self.search_fetcher = Some(fetcher);
        self
    }

    pub fn relay(&self) -> &ProgressRelay {
        &self.relay
    }

    /// Fire-and-forget an article through the pipeline.
    pub fn spawn_article(self: Arc<Self>, article: RawArticle, source: EventSource) {
        tokio::spawn(async move {
            if let Err(e) = self.process_article(article, source, None).await {
                error!(error = %e, "article processing failed");
            }
        });
    }

    /// Fire-and-forget user-initiated research for an event title.
    pub fn spawn_custom_research(self: Arc<Self>, title: String, user_id: Uuid) {
        tokio::spawn(async move {
            if let Err(e) = self.research_by_title(&title, user_id).await {
                error!(error = %e, user_id = %user_id, "custom research failed");
            }
        });
    }

    /// Ingest one article: classification gate, event creation, enrichment.
    /// Returns the created event id, or None when the gate rejected it.
    pub async fn process_article(
        &self,
        article: RawArticle,
        source: EventSource,
        user_id: Option<Uuid>,
    ) -> Result<Option<Uuid>> {
        // Public ingest is gated; user-requested research is not.
        if user_id.is_none() {
            let classification = self.pipeline.classify(&article).await?;
            if !classification.is_financial {
                info!(title = %article.title, reason = %classification.reason, "article skipped");
                return Ok(None);
            }
        }

        let snapshot = EventSnapshot::new(
            Uuid::new_v4(),
            article.title.clone(),
            article.summary.clone(),
            source,
        );
        self.repo.create_event(&snapshot, user_id.is_some()).await?;

        let id = snapshot.id;
        self.enrich(ArticleContext::single(article), snapshot, user_id)
            .await;

        Ok(Some(id))
    }

    /// User-initiated research: expand the title into search keywords, pull
    /// a deduplicated corpus of related articles, then run the pipeline with
    /// that corpus feeding the research stage. Ends with a draft post for
    /// the requesting user.
    pub async fn research_by_title(&self, title: &str, user_id: Uuid) -> Result<()> {
        let article = RawArticle {
            title: title.to_string(),
            ..Default::default()
        };

        let snapshot = EventSnapshot::new(
            Uuid::new_v4(),
            title.to_string(),
            String::new(),
            EventSource::Custom,
        );
        self.repo.create_event(&snapshot, true).await?;

        let corpus = self.gather_corpus(title).await;
        info!(title, corpus = corpus.len(), "custom research corpus gathered");

        self.enrich(
            ArticleContext::with_corpus(article, corpus),
            snapshot,
            Some(user_id),
        )
        .await;

        Ok(())
    }

    /// Keyword-expanded, URL-deduplicated related articles for a title.
    async fn gather_corpus(&self, title: &str) -> Vec<RawArticle> {
        let Some(fetcher) = &self.search_fetcher else {
            return Vec::new();
        };

        let keywords = match self.pipeline.enricher().keyword_combinations(title).await {
            Ok(keywords) => keywords,
            Err(e) => {
                warn!(error = %e, "keyword expansion failed");
                vec![title.to_string()]
            }
        };

        let mut seen = HashSet::new();
        let mut corpus = Vec::new();
        for keyword in &keywords {
            match fetcher.fetch(Some(keyword)).await {
                Ok(articles) => {
                    for article in articles {
                        if !article.url.is_empty() && seen.insert(article.url.clone()) {
                            corpus.push(article);
                        }
                    }
                }
                Err(e) => {
                    warn!(keyword = %keyword, error = %e, "corpus fetch failed");
                }
            }
        }

        corpus
    }

    /// Run every stage in order, persisting and broadcasting after each.
    async fn enrich(&self, ctx: ArticleContext, mut snapshot: EventSnapshot, user_id: Option<Uuid>) {
        for stage in Stage::ALL {
            if let Err(e) = self.pipeline.apply_stage(stage, &ctx, &mut snapshot).await {
                warn!(
                    event_id = %snapshot.id,
                    stage = stage.name(),
                    error = %e,
                    "enrichment stage failed, marking event failed"
                );
                snapshot.processing_status = ProcessingStatus::Failed;
                snapshot.touch();
                if let Err(e) = self.repo.mark_failed(snapshot.id).await {
                    error!(event_id = %snapshot.id, error = %e, "failed to mark event failed");
                }
                self.publish(&snapshot, user_id);
                return;
            }

            if let Err(e) = self.repo.save_snapshot(&snapshot).await {
                error!(
                    event_id = %snapshot.id,
                    stage = stage.name(),
                    error = %e,
                    "failed to persist stage result"
                );
            }
            self.publish(&snapshot, user_id);
        }

        info!(event_id = %snapshot.id, "event drafted");

        if let Some(user_id) = user_id {
            if let Err(e) = self.repo.create_draft_post(user_id, &snapshot).await {
                error!(event_id = %snapshot.id, error = %e, "failed to create draft post");
            }
        }
    }

    fn publish(&self, snapshot: &EventSnapshot, user_id: Option<Uuid>) {
        self.relay
            .publish(ProgressUpdate::for_snapshot(snapshot.clone(), user_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryRepo, StaticFetcher, StubEnricher};
    use marketdesk_common::{Scope, Sentiment, WsMessage};

    fn orchestrator_with(enricher: StubEnricher) -> (Arc<Orchestrator>, Arc<MemoryRepo>) {
        let repo = Arc::new(MemoryRepo::default());
        let orchestrator = Arc::new(Orchestrator::new(
            EnrichmentPipeline::new(Arc::new(enricher)),
            repo.clone(),
            ProgressRelay::default(),
        ));
        (orchestrator, repo)
    }

    fn article(title: &str) -> RawArticle {
        RawArticle {
            title: title.into(),
            summary: "summary".into(),
            url: format!("https://news.example/{title}"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn ingest_gate_skips_non_financial_articles() {
        let (orchestrator, repo) = orchestrator_with(StubEnricher::non_financial());

        let id = orchestrator
            .process_article(article("Local sports roundup"), EventSource::AlphaVantage, None)
            .await
            .unwrap();

        assert!(id.is_none());
        assert!(repo.events().is_empty());
    }

    #[tokio::test]
    async fn every_stage_is_persisted_and_broadcast() {
        let (orchestrator, repo) = orchestrator_with(StubEnricher::financial());
        let mut rx = orchestrator.relay().subscribe();

        let id = orchestrator
            .process_article(article("Rates decision"), EventSource::EventRegistry, None)
            .await
            .unwrap()
            .expect("event created");

        // Six stages -> six persisted snapshots after creation
        assert_eq!(repo.snapshot_count(id), 6);

        let mut statuses = Vec::new();
        for _ in 0..6 {
            let update = rx.recv().await.unwrap();
            assert_eq!(update.scope, Scope::Public);
            statuses.push(update.message.snapshot().processing_status);
        }
        assert_eq!(
            statuses,
            vec![
                ProcessingStatus::Researching,
                ProcessingStatus::Writing,
                ProcessingStatus::FetchingAnalytics,
                ProcessingStatus::FetchingAnalytics,
                ProcessingStatus::FetchingAnalytics,
                ProcessingStatus::Drafted,
            ]
        );

        let final_event = repo.events().into_iter().find(|e| e.id == id).unwrap();
        assert_eq!(final_event.processing_status, ProcessingStatus::Drafted);
        assert!(final_event.editable);
        assert_eq!(final_event.sentiment, Some(Sentiment::Neutral));
    }

    #[tokio::test]
    async fn stage_failure_marks_event_failed_and_broadcasts_it() {
        let (orchestrator, repo) =
            orchestrator_with(StubEnricher::financial().failing_at("deep_research"));
        let mut rx = orchestrator.relay().subscribe();

        let id = orchestrator
            .process_article(article("Doomed story"), EventSource::AlphaVantage, None)
            .await
            .unwrap()
            .expect("event created");

        assert!(repo.failed().contains(&id));

        // Title frame, then the Failed frame
        let first = rx.recv().await.unwrap();
        assert_eq!(
            first.message.snapshot().processing_status,
            ProcessingStatus::Researching
        );
        let second = rx.recv().await.unwrap();
        assert_eq!(
            second.message.snapshot().processing_status,
            ProcessingStatus::Failed
        );
    }

    #[tokio::test]
    async fn custom_research_is_user_scoped_and_creates_a_draft_post() {
        let user_id = Uuid::new_v4();
        let repo = Arc::new(MemoryRepo::default());
        let fetcher = Arc::new(StaticFetcher::new(vec![
            article("Chip supply shock"),
            article("Chip supply shock"), // duplicate URL, must dedup
            article("Foundry capacity"),
        ]));
        let orchestrator = Arc::new(
            Orchestrator::new(
                EnrichmentPipeline::new(Arc::new(StubEnricher::financial())),
                repo.clone(),
                ProgressRelay::default(),
            )
            .with_search_fetcher(fetcher),
        );
        let mut rx = orchestrator.relay().subscribe();

        orchestrator
            .research_by_title("Chip supply shock", user_id)
            .await
            .unwrap();

        let update = rx.recv().await.unwrap();
        assert_eq!(update.scope, Scope::User(user_id));
        assert!(matches!(update.message, WsMessage::CustomEvent(_)));

        let posts = repo.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, user_id);
        // Draft post body comes from the research stage
        assert!(posts[0].1.deep_research.is_some());
    }
}
