// Postgres persistence for posts (user-editable derivatives of market events).

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use marketdesk_common::{EventSource, PostStatus};

use crate::error::{Result, StoreError};

#[derive(Clone)]
pub struct PostStore {
    pool: PgPool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    market_event_id: Uuid,
    user_id: Uuid,
    title: String,
    description: String,
    status: String,
    is_customized: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub market_event_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: PostStatus,
    pub is_customized: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = StoreError;

    fn try_from(row: PostRow) -> Result<Self> {
        Ok(Post {
            id: row.id,
            market_event_id: row.market_event_id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            is_customized: row.is_customized,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Parameters for inserting a new post.
pub struct NewPost {
    pub market_event_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub is_customized: bool,
}

/// Listing filters. Everything optional; pagination always applies.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub search: String,
    pub status: Option<PostStatus>,
    pub source: Option<EventSource>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub offset: i64,
    pub limit: i64,
}

/// Per-user post statistics.
#[derive(Debug, Clone, Serialize)]
pub struct PostCounts {
    pub total_posts: i64,
    pub draft_posts: i64,
    pub published_posts: i64,
    pub customized_posts: i64,
}

#[derive(sqlx::FromRow)]
struct PostWithSourceRow {
    #[sqlx(flatten)]
    post: PostRow,
    source: String,
}

fn with_source(row: PostWithSourceRow) -> Result<(Post, EventSource)> {
    let source = row.source.parse().map_err(StoreError::Corrupt)?;
    Ok((Post::try_from(row.post)?, source))
}

impl PostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new: NewPost) -> Result<Post> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            INSERT INTO posts (id, market_event_id, user_id, title, description, status, is_customized)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.market_event_id)
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(PostStatus::Draft.as_str())
        .bind(new.is_customized)
        .fetch_one(&self.pool)
        .await?;

        Post::try_from(row)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Post::try_from).transpose()
    }

    /// Post plus the source of the market event it derives from.
    pub async fn get_with_source(&self, id: Uuid) -> Result<Option<(Post, EventSource)>> {
        let row = sqlx::query_as::<_, PostWithSourceRow>(
            r#"
            SELECT p.*, e.source
            FROM posts p
            JOIN market_events e ON e.id = p.market_event_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(with_source).transpose()
    }

    /// The post a user already generated from a given event, if any.
    pub async fn find_by_user_and_event(
        &self,
        user_id: Uuid,
        market_event_id: Uuid,
    ) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT * FROM posts WHERE user_id = $1 AND market_event_id = $2 LIMIT 1",
        )
        .bind(user_id)
        .bind(market_event_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Post::try_from).transpose()
    }

    /// A user's posts, filtered and paginated, newest-updated first.
    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: &PostFilter,
    ) -> Result<(Vec<(Post, EventSource)>, i64)> {
        self.list(Some(user_id), None, filter).await
    }

    /// Published posts across all users (the public feed).
    pub async fn list_published(
        &self,
        filter: &PostFilter,
    ) -> Result<(Vec<(Post, EventSource)>, i64)> {
        self.list(None, Some(PostStatus::Published), filter).await
    }

    async fn list(
        &self,
        user_id: Option<Uuid>,
        forced_status: Option<PostStatus>,
        filter: &PostFilter,
    ) -> Result<(Vec<(Post, EventSource)>, i64)> {
        let mut count_query: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT COUNT(*) FROM posts p JOIN market_events e ON e.id = p.market_event_id WHERE 1=1",
        );
        let mut rows_query: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT p.*, e.source FROM posts p JOIN market_events e ON e.id = p.market_event_id WHERE 1=1",
        );

        for query in [&mut count_query, &mut rows_query] {
            if let Some(user_id) = user_id {
                query.push(" AND p.user_id = ").push_bind(user_id);
            }
            if let Some(status) = forced_status.or(filter.status) {
                query.push(" AND p.status = ").push_bind(status.as_str());
            }
            if let Some(source) = filter.source {
                query.push(" AND e.source = ").push_bind(source.as_str());
            }
            if !filter.search.is_empty() {
                let pattern = format!("%{}%", filter.search);
                query
                    .push(" AND (p.title ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR p.description ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
            if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
                query
                    .push(" AND p.created_at >= ")
                    .push_bind(start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
                    .push(" AND p.created_at < ")
                    .push_bind(
                        end.succ_opt()
                            .unwrap_or(end)
                            .and_hms_opt(0, 0, 0)
                            .unwrap_or_default()
                            .and_utc(),
                    );
            }
        }

        let total: i64 = count_query.build_query_scalar().fetch_one(&self.pool).await?;

        rows_query
            .push(" ORDER BY p.updated_at DESC OFFSET ")
            .push_bind(filter.offset)
            .push(" LIMIT ")
            .push_bind(filter.limit);

        let rows: Vec<PostWithSourceRow> = rows_query
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        let posts = rows.into_iter().map(with_source).collect::<Result<Vec<_>>>()?;

        Ok((posts, total))
    }

    pub async fn counts_by_user(&self, user_id: Uuid) -> Result<PostCounts> {
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status = 'Draft'),
                   COUNT(*) FILTER (WHERE status = 'Published'),
                   COUNT(*) FILTER (WHERE is_customized)
            FROM posts
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(PostCounts {
            total_posts: row.0,
            draft_posts: row.1,
            published_posts: row.2,
            customized_posts: row.3,
        })
    }

    /// Rewrite a post body. Any edit re-drafts the post and marks it
    /// customized.
    pub async fn update_description(&self, id: Uuid, description: &str) -> Result<Post> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            UPDATE posts
            SET description = $2,
                is_customized = TRUE,
                status = 'Draft',
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        Post::try_from(row)
    }

    pub async fn set_status(&self, id: Uuid, status: PostStatus) -> Result<Post> {
        let row = sqlx::query_as::<_, PostRow>(
            "UPDATE posts SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Post::try_from(row)
    }

    /// Publish every listed post that is currently Approved. Others are
    /// silently left as-is; the updated rows are returned.
    pub async fn publish_many(&self, ids: &[Uuid]) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            UPDATE posts
            SET status = 'Published', updated_at = now()
            WHERE id = ANY($1) AND status = 'Approved'
            RETURNING *
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Post::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_converts_to_typed_post() {
        let row = PostRow {
            id: Uuid::new_v4(),
            market_event_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Fed decision".into(),
            description: "draft body".into(),
            status: "Approved".into(),
            is_customized: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let post = Post::try_from(row).unwrap();
        assert_eq!(post.status, PostStatus::Approved);
        assert!(post.is_customized);
    }

    #[test]
    fn corrupt_status_is_an_error() {
        let row = PostRow {
            id: Uuid::new_v4(),
            market_event_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "t".into(),
            description: "d".into(),
            status: "Archived".into(),
            is_customized: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(Post::try_from(row).is_err());
    }

    #[test]
    fn default_filter_is_unconstrained() {
        let filter = PostFilter::default();
        assert!(filter.status.is_none());
        assert!(filter.source.is_none());
        assert!(filter.search.is_empty());
    }
}
