use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn relationships() -> Router<AppState> {
    Router::new()
        .route("/users/:username/follow", post(handlers::follow_user))
        .route("/users/:username/unfollow", post(handlers::unfollow_user))
        .route("/users/:username/block", post(handlers::block_user))
        .route("/users/:username/unblock", post(handlers::unblock_user))
        .route("/users/:username/followers", get(handlers::list_followers))
        .route(
            "/users/:username/followers/recent",
            get(handlers::recent_followers),
        )
        .route("/users/:username/following", get(handlers::list_following))
        .route("/users/:username/stats", get(handlers::follow_stats))
        .route("/users/:username/follow-status", get(handlers::follow_status))
        .route("/users/:username/relationship", get(handlers::relationship_status))
        .route(
            "/relationships/following/bulk",
            post(handlers::bulk_following),
        )
        .route("/blocks", get(handlers::list_blocks))
}
