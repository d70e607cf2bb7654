//! Postgres-backed implementation of the orchestrator's persistence seam.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use marketdesk_common::EventSnapshot;
use marketdesk_store::{MarketEventStore, NewPost, PostStore};

use crate::traits::EventRepo;

pub struct PgEventRepo {
    events: MarketEventStore,
    posts: PostStore,
}

impl PgEventRepo {
    pub fn new(pool: PgPool) -> Self {
        Self {
            events: MarketEventStore::new(pool.clone()),
            posts: PostStore::new(pool),
        }
    }
}

#[async_trait]
impl EventRepo for PgEventRepo {
    async fn create_event(&self, snapshot: &EventSnapshot, is_customized: bool) -> Result<()> {
        self.events.insert(snapshot, is_customized).await?;
        Ok(())
    }

    async fn save_snapshot(&self, snapshot: &EventSnapshot) -> Result<()> {
        self.events.apply_snapshot(snapshot).await?;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid) -> Result<()> {
        self.events.mark_failed(id).await?;
        Ok(())
    }

    async fn create_draft_post(&self, user_id: Uuid, snapshot: &EventSnapshot) -> Result<()> {
        self.posts
            .insert(NewPost {
                market_event_id: snapshot.id,
                user_id,
                title: snapshot.title.clone(),
                description: snapshot
                    .deep_research
                    .clone()
                    .unwrap_or_else(|| snapshot.description.clone()),
                is_customized: true,
            })
            .await?;
        Ok(())
    }
}
