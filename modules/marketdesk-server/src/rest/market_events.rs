//! Market event listing. Only Drafted events are visible; live progress for
//! in-flight events arrives over the WebSocket instead.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};

use marketdesk_store::MarketEvent;

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
}

#[derive(Serialize)]
struct ListedEvent {
    #[serde(flatten)]
    event: MarketEvent,
    post_generated: bool,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let (page, limit, offset) = clamp_page(query.page, query.limit);

    let (events, total) = state.events.list_drafted(&query.search, offset, limit).await?;

    let data: Vec<ListedEvent> = events
        .into_iter()
        .map(|(event, post_generated)| ListedEvent {
            event,
            post_generated,
        })
        .collect();

    Ok(envelope::success_listing(
        "Market event fetched successfully",
        PageMeta::new(page, limit, total),
        data,
    ))
}
