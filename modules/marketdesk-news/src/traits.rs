//! Seams for the enrichment pipeline. Production wires the OpenAI-backed
//! enricher and the Postgres repo; tests substitute the fakes in `testing`.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use marketdesk_common::{EventSnapshot, Priority, RawArticle, Sentiment};

/// Outcome of the classification gate.
#[derive(Debug, Clone)]
pub struct Classification {
    pub is_financial: bool,
    pub reason: String,
}

/// The language-model calls the pipeline sequences, one per stage.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Gate: is this article financial news worth an event?
    async fn classify(&self, article: &RawArticle) -> Result<Classification>;

    /// Short banner headline shown while the event is being researched.
    async fn banner_title(&self, article: &RawArticle) -> Result<String>;

    /// Long-form research. `corpus` carries related articles for
    /// user-initiated research; it is empty on the ingest path.
    async fn deep_research(&self, article: &RawArticle, corpus: &[RawArticle]) -> Result<String>;

    async fn summarize(&self, deep_research: &str) -> Result<String>;

    async fn sentiment(&self, article: &RawArticle) -> Result<Sentiment>;

    async fn priority(&self, article: &RawArticle) -> Result<Priority>;

    async fn compliance(&self, article: &RawArticle) -> Result<String>;

    /// Search keyword variants for a user-provided event title.
    async fn keyword_combinations(&self, title: &str) -> Result<Vec<String>>;
}

/// Persistence seam the orchestrator drives. Backed by the Postgres stores
/// in production.
#[async_trait]
pub trait EventRepo: Send + Sync {
    async fn create_event(&self, snapshot: &EventSnapshot, is_customized: bool) -> Result<()>;

    /// Persist the state reached after one pipeline stage.
    async fn save_snapshot(&self, snapshot: &EventSnapshot) -> Result<()>;

    async fn mark_failed(&self, id: Uuid) -> Result<()>;

    /// Draft post handed to the user when their custom research finishes.
    async fn create_draft_post(&self, user_id: Uuid, snapshot: &EventSnapshot) -> Result<()>;
}
