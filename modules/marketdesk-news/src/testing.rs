//! In-memory fakes for the pipeline seams. Compiled for tests and behind
//! the `test-support` feature for downstream crates.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use marketdesk_common::{
    EventSnapshot, EventSource, MarketDeskError, Priority, RawArticle, Sentiment,
};

use crate::fetchers::NewsFetcher;
use crate::traits::{Classification, Enricher, EventRepo};

// =============================================================================
// StubEnricher
// =============================================================================

/// Deterministic enricher: echoes its inputs, no network.
pub struct StubEnricher {
    is_financial: bool,
    fail_stage: Option<&'static str>,
}

impl StubEnricher {
    pub fn financial() -> Self {
        Self {
            is_financial: true,
            fail_stage: None,
        }
    }

    pub fn non_financial() -> Self {
        Self {
            is_financial: false,
            fail_stage: None,
        }
    }

    /// Make the named stage fail ("title", "deep_research", "summarize",
    /// "sentiment", "priority", "compliance").
    pub fn failing_at(mut self, stage: &'static str) -> Self {
        self.fail_stage = Some(stage);
        self
    }

    fn check(&self, stage: &str) -> Result<()> {
        if self.fail_stage == Some(stage) {
            return Err(anyhow!("stub failure at {stage}"));
        }
        Ok(())
    }
}

#[async_trait]
impl Enricher for StubEnricher {
    async fn classify(&self, _article: &RawArticle) -> Result<Classification> {
        Ok(Classification {
            is_financial: self.is_financial,
            reason: if self.is_financial {
                "market news".into()
            } else {
                "not market relevant".into()
            },
        })
    }

    async fn banner_title(&self, article: &RawArticle) -> Result<String> {
        self.check("title")?;
        Ok(format!("AI processing: {}", article.title))
    }

    async fn deep_research(&self, article: &RawArticle, corpus: &[RawArticle]) -> Result<String> {
        self.check("deep_research")?;
        if corpus.is_empty() {
            Ok(format!("research on: {}", article.title))
        } else {
            Ok(format!("synthesis of {} articles", corpus.len()))
        }
    }

    async fn summarize(&self, deep_research: &str) -> Result<String> {
        self.check("summarize")?;
        Ok(format!("summary of: {deep_research}"))
    }

    async fn sentiment(&self, _article: &RawArticle) -> Result<Sentiment> {
        self.check("sentiment")?;
        Ok(Sentiment::Neutral)
    }

    async fn priority(&self, _article: &RawArticle) -> Result<Priority> {
        self.check("priority")?;
        Ok(Priority::Medium)
    }

    async fn compliance(&self, _article: &RawArticle) -> Result<String> {
        self.check("compliance")?;
        Ok("Compliant".into())
    }

    async fn keyword_combinations(&self, title: &str) -> Result<Vec<String>> {
        Ok(vec![title.to_string()])
    }
}

// =============================================================================
// MemoryRepo
// =============================================================================

/// Event repo that keeps everything in maps. Records how often each event's
/// snapshot was persisted so tests can assert the per-stage cadence.
#[derive(Default)]
pub struct MemoryRepo {
    events: Mutex<HashMap<Uuid, EventSnapshot>>,
    saves: Mutex<HashMap<Uuid, u32>>,
    failed: Mutex<HashSet<Uuid>>,
    posts: Mutex<Vec<(Uuid, EventSnapshot)>>,
}

impl MemoryRepo {
    pub fn events(&self) -> Vec<EventSnapshot> {
        self.events.lock().unwrap().values().cloned().collect()
    }

    pub fn snapshot_count(&self, id: Uuid) -> u32 {
        self.saves.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    pub fn failed(&self) -> HashSet<Uuid> {
        self.failed.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<(Uuid, EventSnapshot)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventRepo for MemoryRepo {
    async fn create_event(&self, snapshot: &EventSnapshot, _is_customized: bool) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .insert(snapshot.id, snapshot.clone());
        Ok(())
    }

    async fn save_snapshot(&self, snapshot: &EventSnapshot) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .insert(snapshot.id, snapshot.clone());
        *self.saves.lock().unwrap().entry(snapshot.id).or_insert(0) += 1;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid) -> Result<()> {
        self.failed.lock().unwrap().insert(id);
        Ok(())
    }

    async fn create_draft_post(&self, user_id: Uuid, snapshot: &EventSnapshot) -> Result<()> {
        self.posts.lock().unwrap().push((user_id, snapshot.clone()));
        Ok(())
    }
}

// =============================================================================
// StaticFetcher
// =============================================================================

/// Fetcher that returns a fixed batch regardless of keyword.
pub struct StaticFetcher {
    articles: Vec<RawArticle>,
}

impl StaticFetcher {
    pub fn new(articles: Vec<RawArticle>) -> Self {
        Self { articles }
    }
}

#[async_trait]
impl NewsFetcher for StaticFetcher {
    async fn fetch(&self, _keyword: Option<&str>) -> Result<Vec<RawArticle>, MarketDeskError> {
        Ok(self.articles.clone())
    }

    fn source(&self) -> EventSource {
        EventSource::EventRegistry
    }
}
