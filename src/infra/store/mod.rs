//! Persistence boundary for the relationship graph.
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`PgStore`] | Production; Postgres through sqlx |
//! | [`MemoryStore`] | Tests and throwaway instances |
//!
//! Every mutating primitive is atomic on its own. Uniqueness of follow and
//! block edges is enforced here, not by the callers.

pub mod memory;
pub mod postgres;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::account::Account;
use crate::domain::social_graph::{BlockEdge, FollowEdge, FollowerIdentity, RelationshipStatus};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type SharedStore = Arc<dyn RelationshipStore>;
pub type SharedDirectory = Arc<dyn AccountDirectory>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal storage error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Internal(err.to_string()),
        }
    }
}

/// Outcome of a follow insert that passed the uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowInsert {
    Inserted(FollowEdge),
    /// A block between the two local accounts appeared before the write.
    Blocked,
}

/// Outcome of a block insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInsert {
    pub edge: BlockEdge,
    /// Follow edges removed by the cascade, or the error text if it failed.
    pub cascade: Result<u64, String>,
}

#[async_trait]
pub trait AccountDirectory: Send + Sync + 'static {
    async fn resolve_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;
}

#[async_trait]
pub trait RelationshipStore: Send + Sync + 'static {
    async fn ping(&self) -> Result<(), StoreError>;

    // --- Follows -------------------------------------------------------------

    /// Insert a follow edge. For a local follower the absence of a block in
    /// either direction is re-checked in the same atomic unit as the insert.
    ///
    /// Returns [`StoreError::Conflict`] when an edge for the pair exists.
    async fn insert_follow(
        &self,
        follower: &FollowerIdentity,
        followed_account_id: Uuid,
    ) -> Result<FollowInsert, StoreError>;

    /// Returns `true` when a row was removed.
    async fn delete_follow(
        &self,
        follower: &FollowerIdentity,
        followed_account_id: Uuid,
    ) -> Result<bool, StoreError>;

    async fn find_follow(
        &self,
        follower: &FollowerIdentity,
        followed_account_id: Uuid,
    ) -> Result<Option<FollowEdge>, StoreError>;

    /// Edges pointing at `account_id`, newest first, ties by id ascending.
    async fn list_followers(
        &self,
        account_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<FollowEdge>, i64), StoreError>;

    /// Edges whose local follower is `account_id`, same ordering as followers.
    async fn list_following(
        &self,
        account_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<FollowEdge>, i64), StoreError>;

    async fn count_followers(&self, account_id: Uuid) -> Result<i64, StoreError>;

    async fn count_following(&self, account_id: Uuid) -> Result<i64, StoreError>;

    /// The subset of `targets` that `follower_account_id` follows.
    async fn following_among(
        &self,
        follower_account_id: Uuid,
        targets: &[Uuid],
    ) -> Result<HashSet<Uuid>, StoreError>;

    // --- Blocks --------------------------------------------------------------

    /// Insert a block and, in the same transaction, remove follow edges
    /// between the pair in both directions.
    ///
    /// Returns [`StoreError::Conflict`] when the block already exists.
    async fn insert_block(
        &self,
        blocker_account_id: Uuid,
        blocked_account_id: Uuid,
    ) -> Result<BlockInsert, StoreError>;

    async fn delete_block(
        &self,
        blocker_account_id: Uuid,
        blocked_account_id: Uuid,
    ) -> Result<bool, StoreError>;

    async fn find_block(
        &self,
        blocker_account_id: Uuid,
        blocked_account_id: Uuid,
    ) -> Result<Option<BlockEdge>, StoreError>;

    async fn is_blocked_either_direction(&self, a: Uuid, b: Uuid) -> Result<bool, StoreError>;

    async fn list_blocks(
        &self,
        blocker_account_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<BlockEdge>, i64), StoreError>;

    async fn relationship_status(
        &self,
        viewer_id: Uuid,
        other_id: Uuid,
    ) -> Result<RelationshipStatus, StoreError>;
}
