// Postgres persistence for market events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use marketdesk_common::{EventSnapshot, EventSource, Priority, ProcessingStatus, Sentiment};

use crate::error::{Result, StoreError};

#[derive(Clone)]
pub struct MarketEventStore {
    pool: PgPool,
}

/// A row from the market_events table. Enum columns stay TEXT here and are
/// parsed at the store boundary.
#[derive(Debug, Clone, sqlx::FromRow)]
struct MarketEventRow {
    id: Uuid,
    title: String,
    banner: Option<String>,
    description: String,
    sentiment: Option<String>,
    priority_flag: Option<String>,
    compliance_check: Option<String>,
    deep_research: Option<String>,
    summary: Option<String>,
    processing_status: String,
    source: String,
    is_customized: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A fully-typed market event.
#[derive(Debug, Clone, Serialize)]
pub struct MarketEvent {
    pub id: Uuid,
    pub title: String,
    pub banner: Option<String>,
    pub description: String,
    pub sentiment: Option<Sentiment>,
    pub priority_flag: Option<Priority>,
    pub compliance_check: Option<String>,
    pub deep_research: Option<String>,
    pub summary: Option<String>,
    pub processing_status: ProcessingStatus,
    pub source: EventSource,
    pub is_customized: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<MarketEventRow> for MarketEvent {
    type Error = StoreError;

    fn try_from(row: MarketEventRow) -> Result<Self> {
        Ok(MarketEvent {
            id: row.id,
            title: row.title,
            banner: row.banner,
            description: row.description,
            sentiment: parse_opt(row.sentiment.as_deref())?,
            priority_flag: parse_opt(row.priority_flag.as_deref())?,
            compliance_check: row.compliance_check,
            deep_research: row.deep_research,
            summary: row.summary,
            processing_status: parse(&row.processing_status)?,
            source: parse(&row.source)?,
            is_customized: row.is_customized,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse<T: std::str::FromStr<Err = String>>(s: &str) -> Result<T> {
    s.parse().map_err(StoreError::Corrupt)
}

fn parse_opt<T: std::str::FromStr<Err = String>>(s: Option<&str>) -> Result<Option<T>> {
    s.map(parse).transpose()
}

impl MarketEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a freshly created event from its initial snapshot.
    pub async fn insert(&self, snapshot: &EventSnapshot, is_customized: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO market_events
                (id, title, banner, description, processing_status, source, is_customized,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            "#,
        )
        .bind(snapshot.id)
        .bind(&snapshot.title)
        .bind(&snapshot.banner)
        .bind(&snapshot.description)
        .bind(snapshot.processing_status.as_str())
        .bind(snapshot.source.as_str())
        .bind(is_customized)
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist the incremental enrichment state after a pipeline stage.
    pub async fn apply_snapshot(&self, snapshot: &EventSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE market_events
            SET banner = $2,
                sentiment = $3,
                priority_flag = $4,
                compliance_check = $5,
                deep_research = $6,
                summary = $7,
                processing_status = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(snapshot.id)
        .bind(&snapshot.banner)
        .bind(snapshot.sentiment.map(|s| s.as_str()))
        .bind(snapshot.priority_flag.map(|p| p.as_str()))
        .bind(&snapshot.compliance_check)
        .bind(&snapshot.deep_research)
        .bind(&snapshot.summary)
        .bind(snapshot.processing_status.as_str())
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Terminal failure state for an event whose pipeline errored.
    pub async fn mark_failed(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE market_events
            SET processing_status = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(ProcessingStatus::Failed.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<MarketEvent>> {
        let row = sqlx::query_as::<_, MarketEventRow>(
            "SELECT * FROM market_events WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MarketEvent::try_from).transpose()
    }

    /// Drafted events, newest first, with a flag for whether any post has
    /// been generated from each. Search matches title or description.
    pub async fn list_drafted(
        &self,
        search: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<(MarketEvent, bool)>, i64)> {
        let pattern = format!("%{search}%");

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM market_events
            WHERE processing_status = 'Drafted'
              AND (title ILIKE $1 OR description ILIKE $1)
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, MarketEventWithPostRow>(
            r#"
            SELECT e.*,
                   EXISTS (SELECT 1 FROM posts p WHERE p.market_event_id = e.id)
                       AS post_generated
            FROM market_events e
            WHERE e.processing_status = 'Drafted'
              AND (e.title ILIKE $1 OR e.description ILIKE $1)
            ORDER BY e.updated_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(&pattern)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let events = rows
            .into_iter()
            .map(|row| Ok((MarketEvent::try_from(row.event)?, row.post_generated)))
            .collect::<Result<Vec<_>>>()?;

        Ok((events, total))
    }
}

#[derive(sqlx::FromRow)]
struct MarketEventWithPostRow {
    #[sqlx(flatten)]
    event: MarketEventRow,
    post_generated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> MarketEventRow {
        MarketEventRow {
            id: Uuid::new_v4(),
            title: "Oil spikes on supply cut".into(),
            banner: Some("OPEC surprise".into()),
            description: "OPEC+ announced production cuts".into(),
            sentiment: Some("NEGATIVE".into()),
            priority_flag: Some("HIGH".into()),
            compliance_check: Some("Compliant".into()),
            deep_research: Some("long form".into()),
            summary: Some("short form".into()),
            processing_status: "Drafted".into(),
            source: "Alpha Vantage".into(),
            is_customized: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_typed_event() {
        let event = MarketEvent::try_from(row()).unwrap();
        assert_eq!(event.sentiment, Some(Sentiment::Negative));
        assert_eq!(event.priority_flag, Some(Priority::High));
        assert_eq!(event.processing_status, ProcessingStatus::Drafted);
        assert_eq!(event.source, EventSource::AlphaVantage);
    }

    #[test]
    fn corrupt_enum_column_is_an_error() {
        let mut bad = row();
        bad.processing_status = "Enriching".into();
        assert!(matches!(
            MarketEvent::try_from(bad),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn null_enrichment_columns_stay_none() {
        let mut fresh = row();
        fresh.sentiment = None;
        fresh.priority_flag = None;
        fresh.processing_status = "Researching".into();
        let event = MarketEvent::try_from(fresh).unwrap();
        assert!(event.sentiment.is_none());
        assert!(event.priority_flag.is_none());
    }
}
