//! Social Graph HTTP Tests
//!
//! Covers follows, blocks and block enforcement through the router.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

// ===========================================================================
// Follow System
// ===========================================================================

#[tokio::test]
async fn follow_user() {
    let app = app();
    let user_a = app.create_user("soc_follow_a").await;
    let user_b = app.create_user("soc_follow_b").await;

    let resp = app
        .post_json(
            &format!("/users/{}/follow", user_b.username),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["follower_account_id"], json!(user_a.id.to_string()));
    assert_eq!(body["external_actor_ref"], json!(null));
    assert_eq!(body["followed_account_id"], json!(user_b.id.to_string()));
}

#[tokio::test]
async fn follow_already_following() {
    let app = app();
    let user_a = app.create_user("soc_follow_dup_a").await;
    let user_b = app.create_user("soc_follow_dup_b").await;
    let path = format!("/users/{}/follow", user_b.username);

    let resp = app.post_json(&path, json!({}), Some(&user_a.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.post_json(&path, json!({}), Some(&user_a.access_token)).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error_code(), "ALREADY_FOLLOWING");
}

#[tokio::test]
async fn follow_self() {
    let app = app();
    let user = app.create_user("soc_follow_self").await;

    let resp = app
        .post_json(
            &format!("/users/{}/follow", user.username),
            json!({}),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_code(), "SELF_FOLLOW_ERROR");
    assert_eq!(resp.error_message(), "cannot follow yourself");
}

#[tokio::test]
async fn follow_nonexistent_user() {
    let app = app();
    let user = app.create_user("soc_follow_ghost").await;

    let resp = app
        .post_json("/users/nobody_here/follow", json!({}), Some(&user.access_token))
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_code(), "USER_NOT_FOUND");
}

#[tokio::test]
async fn follow_as_external_actor() {
    let app = app();
    let user_b = app.create_user("soc_remote_b").await;

    let resp = app
        .post_as_actor(
            &format!("/users/{}/follow", user_b.username),
            "https://remote.example/users/x",
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["follower_account_id"], json!(null));
    assert_eq!(body["external_actor_ref"], json!("https://remote.example/users/x"));

    let resp = app
        .get(&format!("/users/{}/stats", user_b.username), None)
        .await;
    assert_eq!(resp.json()["follower_count"], json!(1));
}

#[tokio::test]
async fn follow_without_any_identity() {
    let app = app();
    let user_b = app.create_user("soc_anon_b").await;

    let resp = app
        .post_json(&format!("/users/{}/follow", user_b.username), json!({}), None)
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_code(), "NO_FOLLOWER_IDENTITY");
}

#[tokio::test]
async fn blank_actor_header_is_no_identity() {
    let app = app();
    let user_b = app.create_user("soc_blank_actor_b").await;

    let resp = app
        .post_as_actor(&format!("/users/{}/follow", user_b.username), "   ")
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_code(), "NO_FOLLOWER_IDENTITY");
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let app = app();
    let user_b = app.create_user("soc_badtoken_b").await;

    let resp = app
        .post_json(
            &format!("/users/{}/follow", user_b.username),
            json!({}),
            Some("v4.local.garbage"),
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_code(), "AUTHENTICATION_REQUIRED");
}

#[tokio::test]
async fn unfollow_user() {
    let app = app();
    let user_a = app.create_user("soc_unfollow_a").await;
    let user_b = app.create_user("soc_unfollow_b").await;

    app.post_json(
        &format!("/users/{}/follow", user_b.username),
        json!({}),
        Some(&user_a.access_token),
    )
    .await;

    let resp = app
        .post_json(
            &format!("/users/{}/unfollow", user_b.username),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["unfollowed"].as_bool().unwrap(), true);
}

#[tokio::test]
async fn unfollow_not_following() {
    let app = app();
    let user_a = app.create_user("soc_unfollow_none_a").await;
    let user_b = app.create_user("soc_unfollow_none_b").await;

    let resp = app
        .post_json(
            &format!("/users/{}/unfollow", user_b.username),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_code(), "NOT_FOLLOWING");
}

#[tokio::test]
async fn list_followers() {
    let app = app();
    let user_a = app.create_user("soc_listfollowers_a").await;
    let user_b = app.create_user("soc_listfollowers_b").await;

    app.post_json(
        &format!("/users/{}/follow", user_b.username),
        json!({}),
        Some(&user_a.access_token),
    )
    .await;

    let resp = app
        .get(&format!("/users/{}/followers?limit=10", user_b.username), None)
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0]["follower_account_id"].as_str().unwrap(),
        user_a.id.to_string()
    );
    assert_eq!(body["total_count"], json!(1));
    assert_eq!(body["has_next"], json!(false));
}

#[tokio::test]
async fn list_following_with_junk_pagination() {
    let app = app();
    let user_a = app.create_user("soc_listfollowing_a").await;
    let user_b = app.create_user("soc_listfollowing_b").await;

    app.post_json(
        &format!("/users/{}/follow", user_b.username),
        json!({}),
        Some(&user_a.access_token),
    )
    .await;

    let resp = app
        .get(
            &format!("/users/{}/following?offset=abc&limit=xyz", user_a.username),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0]["followed_account_id"].as_str().unwrap(),
        user_b.id.to_string()
    );
}

#[tokio::test]
async fn recent_followers_and_follow_status() {
    let app = app();
    let user_a = app.create_user("soc_recent_a").await;
    let user_b = app.create_user("soc_recent_b").await;

    app.post_json(
        &format!("/users/{}/follow", user_b.username),
        json!({}),
        Some(&user_a.access_token),
    )
    .await;

    let resp = app
        .get(&format!("/users/{}/followers/recent?limit=500", user_b.username), None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["items"].as_array().unwrap().len(), 1);

    let resp = app
        .get(
            &format!("/users/{}/follow-status", user_b.username),
            Some(&user_a.access_token),
        )
        .await;
    assert_eq!(resp.json()["is_following"], json!(true));

    let resp = app
        .get(&format!("/users/{}/follow-status", user_b.username), None)
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bulk_following_check() {
    let app = app();
    let user_a = app.create_user("soc_bulk_a").await;
    let user_b = app.create_user("soc_bulk_b").await;
    let unknown = Uuid::new_v4();

    app.post_json(
        &format!("/users/{}/follow", user_b.username),
        json!({}),
        Some(&user_a.access_token),
    )
    .await;

    let resp = app
        .post_json(
            "/relationships/following/bulk",
            json!({ "target_ids": [user_b.id, unknown] }),
            Some(&user_a.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["following"][user_b.id.to_string()], json!(true));
    assert_eq!(body["following"][unknown.to_string()], json!(false));
}

// ===========================================================================
// Block System
// ===========================================================================

#[tokio::test]
async fn block_removes_follow() {
    let app = app();
    let user_a = app.create_user("soc_blockfollow_a").await;
    let user_b = app.create_user("soc_blockfollow_b").await;

    let resp = app
        .post_json(
            &format!("/users/{}/follow", user_b.username),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    // B blocks A, which drops A's follow of B
    let resp = app
        .post_json(
            &format!("/users/{}/block", user_a.username),
            json!({}),
            Some(&user_b.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.json()["blocked_account_id"].as_str().unwrap(),
        user_a.id.to_string()
    );

    let resp = app
        .get(
            &format!("/users/{}/relationship", user_b.username),
            Some(&user_a.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["is_following"].as_bool().unwrap(), false);
    assert_eq!(body["is_blocked_by"].as_bool().unwrap(), true);
}

#[tokio::test]
async fn blocked_user_cannot_follow() {
    let app = app();
    let user_a = app.create_user("soc_blockfol_a").await;
    let user_b = app.create_user("soc_blockfol_b").await;

    app.post_json(
        &format!("/users/{}/block", user_b.username),
        json!({}),
        Some(&user_a.access_token),
    )
    .await;

    let resp = app
        .post_json(
            &format!("/users/{}/follow", user_a.username),
            json!({}),
            Some(&user_b.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_code(), "FORBIDDEN");
}

#[tokio::test]
async fn block_self() {
    let app = app();
    let user = app.create_user("soc_block_self").await;

    let resp = app
        .post_json(
            &format!("/users/{}/block", user.username),
            json!({}),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_code(), "SELF_BLOCK_ERROR");
    assert_eq!(resp.error_message(), "cannot block yourself");
}

#[tokio::test]
async fn unblock_user() {
    let app = app();
    let user_a = app.create_user("soc_unblock_a").await;
    let user_b = app.create_user("soc_unblock_b").await;
    let unblock = format!("/users/{}/unblock", user_b.username);

    app.post_json(
        &format!("/users/{}/block", user_b.username),
        json!({}),
        Some(&user_a.access_token),
    )
    .await;

    let resp = app.get("/blocks", Some(&user_a.access_token)).await;
    assert_eq!(resp.json()["total_count"], json!(1));

    let resp = app.post_json(&unblock, json!({}), Some(&user_a.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["unblocked"].as_bool().unwrap(), true);

    let resp = app.post_json(&unblock, json!({}), Some(&user_a.access_token)).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_code(), "NOT_BLOCKED");
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let resp = app.get("/health", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], json!("ok"));
}
