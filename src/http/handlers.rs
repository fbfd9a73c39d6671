use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::social_graph::{BlockEdge, FollowEdge, FollowStats, Page, RelationshipStatus};
use crate::http::{AppError, RequestCaller};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

/// Raw query values; the relationship facade owns parsing.
#[derive(Deserialize)]
pub struct PaginationQuery {
    pub offset: Option<String>,
    pub limit: Option<String>,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<String>,
}

#[derive(Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub has_next: bool,
}

impl<T, U: Into<T>> From<Page<U>> for PageResponse<T> {
    fn from(page: Page<U>) -> Self {
        Self {
            items: page.items.into_iter().map(Into::into).collect(),
            total_count: page.total_count,
            has_next: page.has_next,
        }
    }
}

#[derive(Serialize)]
pub struct FollowEdgeItem {
    pub id: Uuid,
    pub follower_account_id: Option<Uuid>,
    pub external_actor_ref: Option<String>,
    pub followed_account_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<FollowEdge> for FollowEdgeItem {
    fn from(edge: FollowEdge) -> Self {
        let (follower_account_id, external_actor_ref) = edge.follower.columns();
        let external_actor_ref = external_actor_ref.map(str::to_string);
        Self {
            id: edge.id,
            follower_account_id,
            external_actor_ref,
            followed_account_id: edge.followed_account_id,
            created_at: edge.created_at,
        }
    }
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.store.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

pub async fn follow_user(
    Path(username): Path<String>,
    RequestCaller(caller): RequestCaller,
    State(state): State<AppState>,
) -> Result<Json<FollowEdgeItem>, AppError> {
    let edge = state.relationships.follow(&caller, &username).await?;
    Ok(Json(edge.into()))
}

#[derive(Serialize)]
pub struct UnfollowResponse {
    pub unfollowed: bool,
}

pub async fn unfollow_user(
    Path(username): Path<String>,
    RequestCaller(caller): RequestCaller,
    State(state): State<AppState>,
) -> Result<Json<UnfollowResponse>, AppError> {
    state.relationships.unfollow(&caller, &username).await?;
    Ok(Json(UnfollowResponse { unfollowed: true }))
}

pub async fn block_user(
    Path(username): Path<String>,
    RequestCaller(caller): RequestCaller,
    State(state): State<AppState>,
) -> Result<Json<BlockEdge>, AppError> {
    let edge = state.relationships.block(&caller, &username).await?;
    Ok(Json(edge))
}

#[derive(Serialize)]
pub struct UnblockResponse {
    pub unblocked: bool,
}

pub async fn unblock_user(
    Path(username): Path<String>,
    RequestCaller(caller): RequestCaller,
    State(state): State<AppState>,
) -> Result<Json<UnblockResponse>, AppError> {
    state.relationships.unblock(&caller, &username).await?;
    Ok(Json(UnblockResponse { unblocked: true }))
}

pub async fn list_followers(
    Path(username): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PageResponse<FollowEdgeItem>>, AppError> {
    let page = state
        .relationships
        .followers(&username, query.offset.as_deref(), query.limit.as_deref())
        .await?;
    Ok(Json(page.into()))
}

pub async fn list_following(
    Path(username): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PageResponse<FollowEdgeItem>>, AppError> {
    let page = state
        .relationships
        .following(&username, query.offset.as_deref(), query.limit.as_deref())
        .await?;
    Ok(Json(page.into()))
}

#[derive(Serialize)]
pub struct RecentFollowersResponse {
    pub items: Vec<FollowEdgeItem>,
}

pub async fn recent_followers(
    Path(username): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<RecentFollowersResponse>, AppError> {
    let items = state
        .relationships
        .recent_followers(&username, query.limit.as_deref())
        .await?;
    Ok(Json(RecentFollowersResponse {
        items: items.into_iter().map(Into::into).collect(),
    }))
}

pub async fn follow_stats(
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<FollowStats>, AppError> {
    Ok(Json(state.relationships.stats(&username).await?))
}

#[derive(Serialize)]
pub struct FollowStatusResponse {
    pub is_following: bool,
}

pub async fn follow_status(
    Path(username): Path<String>,
    RequestCaller(caller): RequestCaller,
    State(state): State<AppState>,
) -> Result<Json<FollowStatusResponse>, AppError> {
    let is_following = state.relationships.follow_status(&caller, &username).await?;
    Ok(Json(FollowStatusResponse { is_following }))
}

pub async fn relationship_status(
    Path(username): Path<String>,
    RequestCaller(caller): RequestCaller,
    State(state): State<AppState>,
) -> Result<Json<RelationshipStatus>, AppError> {
    Ok(Json(state.relationships.relationship(&caller, &username).await?))
}

#[derive(Deserialize)]
pub struct BulkFollowingRequest {
    pub target_ids: Vec<Uuid>,
}

#[derive(Serialize)]
pub struct BulkFollowingResponse {
    pub following: HashMap<Uuid, bool>,
}

pub async fn bulk_following(
    RequestCaller(caller): RequestCaller,
    State(state): State<AppState>,
    Json(payload): Json<BulkFollowingRequest>,
) -> Result<Json<BulkFollowingResponse>, AppError> {
    let following = state
        .relationships
        .bulk_following(&caller, &payload.target_ids)
        .await?;
    Ok(Json(BulkFollowingResponse { following }))
}

pub async fn list_blocks(
    RequestCaller(caller): RequestCaller,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PageResponse<BlockEdge>>, AppError> {
    let page = state
        .relationships
        .blocked_accounts(&caller, query.offset.as_deref(), query.limit.as_deref())
        .await?;
    Ok(Json(page.into()))
}
