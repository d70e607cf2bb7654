//! Post lifecycle: create from an event, edit, approve, publish, customize.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use marketdesk_common::{ContentTone, EventSource, PostStatus};
use marketdesk_store::{NewPost, Post, PostFilter};

use crate::auth::AuthUser;
use crate::envelope::{self, ApiError, PageMeta};
use crate::rest::{clamp_page, default_limit, default_page};
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl ListQuery {
    fn into_filter(self) -> (i64, i64, PostFilter) {
        let (page, limit, offset) = clamp_page(self.page, self.limit);
        (
            page,
            limit,
            PostFilter {
                search: self.search,
                status: self.status,
                source: self.source,
                start_date: self.start_date,
                end_date: self.end_date,
                offset,
                limit,
            },
        )
    }
}

#[derive(Serialize)]
struct PostItem {
    #[serde(flatten)]
    post: Post,
    source: EventSource,
}

fn items(posts: Vec<(Post, EventSource)>) -> Vec<PostItem> {
    posts
        .into_iter()
        .map(|(post, source)| PostItem { post, source })
        .collect()
}

/// Fetch a post and check the caller owns it.
async fn owned_post(state: &AppState, user: &AuthUser, post_id: Uuid) -> Result<Post, ApiError> {
    let post = state
        .posts
        .get(post_id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    if post.user_id != user.user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(post)
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let (page, limit, filter) = query.into_filter();
    let (posts, total) = state.posts.list_by_user(user.user_id, &filter).await?;

    Ok(envelope::success_listing(
        "Post fetched successfully",
        PageMeta::new(page, limit, total),
        items(posts),
    ))
}

pub async fn details(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let (post, source) = state
        .posts
        .get_with_source(post_id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    if post.user_id != user.user_id {
        return Err(ApiError::Forbidden);
    }

    Ok(envelope::success(
        "Post fetched successfully",
        PostItem { post, source },
    ))
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub market_event_id: Uuid,
}

/// Create a draft post from a drafted market event. Idempotent per
/// (user, event): a second call returns the existing post.
pub async fn create(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Response, ApiError> {
    if let Some(existing) = state
        .posts
        .find_by_user_and_event(user.user_id, payload.market_event_id)
        .await?
    {
        return Ok(envelope::success("Post created successfully", existing));
    }

    let event = state
        .events
        .get(payload.market_event_id)
        .await?
        .ok_or(ApiError::NotFound("Market event"))?;

    let post = state
        .posts
        .insert(NewPost {
            market_event_id: event.id,
            user_id: user.user_id,
            title: event.title.clone(),
            description: event.deep_research.clone().unwrap_or(event.description),
            is_customized: event.is_customized,
        })
        .await?;

    Ok(envelope::created("Post created successfully", post))
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub description: Option<String>,
}

/// Edit a post body. Any edit re-drafts the post.
pub async fn update(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Response, ApiError> {
    let post = owned_post(&state, &user, post_id).await?;

    let updated = match payload.description {
        Some(description) => state.posts.update_description(post.id, &description).await?,
        None => post,
    };

    Ok(envelope::success("Post updated successfully", updated))
}

#[derive(Deserialize)]
pub struct ApprovePostRequest {
    pub post_id: Uuid,
}

pub async fn approve(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<ApprovePostRequest>,
) -> Result<Response, ApiError> {
    let post = owned_post(&state, &user, payload.post_id).await?;

    if post.status != PostStatus::Draft {
        return Err(ApiError::Validation("Post is not drafted".into()));
    }

    let approved = state.posts.set_status(post.id, PostStatus::Approved).await?;

    Ok(envelope::success("Post approved successfully", approved))
}

#[derive(Deserialize)]
pub struct PublishPostsRequest {
    pub post_ids: Vec<Uuid>,
}

/// Publish the approved posts among the given ids; others are skipped.
pub async fn publish(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(payload): Json<PublishPostsRequest>,
) -> Result<Response, ApiError> {
    let published = state.posts.publish_many(&payload.post_ids).await?;

    Ok(envelope::success("Posts published successfully", published))
}

#[derive(Deserialize)]
pub struct CustomizePostRequest {
    pub prompt: String,
    pub content_tone: ContentTone,
}

/// Rewrite a post body with the model, steered by user instructions and tone.
pub async fn customize(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CustomizePostRequest>,
) -> Result<Response, ApiError> {
    let post = owned_post(&state, &user, post_id).await?;

    let rewritten = state
        .llm
        .rewrite_with_tone(
            &post.description,
            &payload.prompt,
            payload.content_tone.as_str(),
        )
        .await?;

    let updated = state.posts.update_description(post.id, &rewritten).await?;

    Ok(envelope::success("Post customized successfully", updated))
}

#[derive(Deserialize)]
pub struct CustomEventRequest {
    pub event_title: String,
}

/// Kick off user-scoped research for a custom event title. The pipeline
/// streams progress to this user's live connections and leaves a draft post.
pub async fn custom_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<CustomEventRequest>,
) -> Result<Response, ApiError> {
    let title = payload.event_title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::Validation("Event title must not be empty".into()));
    }

    state
        .orchestrator
        .clone()
        .spawn_custom_research(title, user.user_id);

    Ok(envelope::message_only("Customized post created successfully"))
}

pub async fn statistics(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let counts = state.posts.counts_by_user(user.user_id).await?;

    Ok(envelope::success(
        "Post statistics fetched successfully",
        counts,
    ))
}

/// Public feed of published posts; no authentication.
pub async fn published_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let (page, limit, mut filter) = query.into_filter();
    filter.status = None; // forced to Published by the store

    let (posts, total) = state.posts.list_published(&filter).await?;

    Ok(envelope::success_listing(
        "Post fetched successfully",
        PageMeta::new(page, limit, total),
        items(posts),
    ))
}

pub async fn published_detail(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let (post, source) = state
        .posts
        .get_with_source(post_id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    if post.status != PostStatus::Published {
        return Err(ApiError::Validation("Post is not published".into()));
    }

    Ok(envelope::success(
        "Post fetched successfully",
        PostItem { post, source },
    ))
}
