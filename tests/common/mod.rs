#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::Row;
use tower::ServiceExt;
use uuid::Uuid;

use kith::app::auth::AuthService;
use kith::app::relationships::{Caller, RelationshipApi};
use kith::config::{AppConfig, QueryParsing, RelationshipSettings, StorageBackend};
use kith::domain::account::Account;
use kith::infra::db::Db;
use kith::infra::store::{MemoryStore, PgStore};
use kith::AppState;

// Test-only key.
const TEST_ACCESS_KEY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";

// ---------------------------------------------------------------------------
// TestApp: one isolated instance per test
// ---------------------------------------------------------------------------

/// Where test accounts get registered.
enum Accounts {
    Memory(Arc<MemoryStore>),
    Postgres(Db),
}

pub struct TestApp {
    router: Router,
    pub state: AppState,
    accounts: Accounts,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_code(&self) -> String {
        self.json()["code"].as_str().unwrap_or("").to_string()
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub access_token: String,
}

impl TestUser {
    pub fn caller(&self) -> Caller {
        Caller::local(self.id)
    }
}

pub fn app() -> TestApp {
    TestApp::with_settings(RelationshipSettings::default())
}

pub fn strict_app() -> TestApp {
    TestApp::with_settings(RelationshipSettings {
        query_parsing: QueryParsing::Strict,
        ..RelationshipSettings::default()
    })
}

/// A Postgres-backed app, or `None` when no test database is configured.
///
/// Reads `TEST_DATABASE_URL`, falling back to `DATABASE_URL`. Tests share the
/// database, so every account gets a unique username.
pub async fn pg_app() -> Option<TestApp> {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;

    // Each #[tokio::test] runs its own runtime, so each gets its own pool.
    let config = AppConfig {
        http_addr: "127.0.0.1:0".into(),
        storage_backend: StorageBackend::Postgres,
        database_url: Some(database_url),
        db_max_connections: 20,
        db_connect_timeout_seconds: 30,
        db_idle_timeout_seconds: 60,
        db_max_lifetime_seconds: 300,
        paseto_access_key: TEST_ACCESS_KEY,
        access_ttl_minutes: 15,
        relationships: RelationshipSettings::default(),
    };

    let db = Db::connect(&config)
        .await
        .expect("cannot connect to test database");
    db.migrate().await.expect("failed to apply schema");

    let store = Arc::new(PgStore::new(db.clone()));
    Some(TestApp::assemble(
        store.clone(),
        store,
        Accounts::Postgres(db),
        config.relationships,
    ))
}

impl TestApp {
    pub fn with_settings(settings: RelationshipSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::assemble(
            store.clone(),
            store.clone(),
            Accounts::Memory(store),
            settings,
        )
    }

    fn assemble(
        store: kith::infra::store::SharedStore,
        directory: kith::infra::store::SharedDirectory,
        accounts: Accounts,
        settings: RelationshipSettings,
    ) -> Self {
        let auth = AuthService::new(TEST_ACCESS_KEY, 15);
        let state = AppState::new(store, directory, auth, settings);
        let router = kith::http::router(state.clone());

        TestApp {
            router,
            state,
            accounts,
        }
    }

    pub fn api(&self) -> &RelationshipApi {
        &self.state.relationships
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::GET, path, None, &headers).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    /// POST on behalf of an external actor, without authentication.
    pub async fn post_as_actor(&self, path: &str, actor_ref: &str) -> TestResponse {
        self.request(
            Method::POST,
            path,
            Some(Value::Object(Default::default())),
            &[("x-actor-ref", actor_ref)],
        )
        .await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Register an active account and mint an access token for it.
    pub async fn create_user(&self, username: &str) -> TestUser {
        self.create_account(username, true).await
    }

    pub async fn create_account(&self, username: &str, is_active: bool) -> TestUser {
        let account = match &self.accounts {
            Accounts::Memory(store) => store
                .insert_account(username, is_active)
                .expect("insert test account failed"),
            Accounts::Postgres(db) => {
                let username = format!("{}_{}", username, Uuid::new_v4().simple());
                let row = sqlx::query(
                    "INSERT INTO accounts (username, is_active) VALUES ($1, $2) \
                     RETURNING id, username, is_active",
                )
                .bind(&username)
                .bind(is_active)
                .fetch_one(db.pool())
                .await
                .expect("insert test account failed");
                Account {
                    id: row.get("id"),
                    username: row.get("username"),
                    is_active: row.get("is_active"),
                }
            }
        };
        let token = self
            .state
            .auth
            .issue_access_token(account.id)
            .expect("issue_access_token failed");

        TestUser {
            id: account.id,
            username: account.username,
            access_token: token.token,
        }
    }
}
