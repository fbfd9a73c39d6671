use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Acquire, Postgres, Row, Transaction};
use uuid::Uuid;

use super::{AccountDirectory, BlockInsert, FollowInsert, RelationshipStore, StoreError};
use crate::domain::account::Account;
use crate::domain::social_graph::{BlockEdge, FollowEdge, FollowerIdentity, RelationshipStatus};
use crate::infra::db::Db;

const FOLLOW_COLUMNS: &str =
    "id, follower_account_id, external_actor_ref, followed_account_id, created_at";

#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

fn follow_from_row(row: &PgRow) -> Result<FollowEdge, StoreError> {
    let id: Uuid = row.get("id");
    let follower = FollowerIdentity::from_columns(
        row.get("follower_account_id"),
        row.get("external_actor_ref"),
    )
    .ok_or_else(|| StoreError::Internal(format!("follow edge {} has no single follower", id)))?;

    Ok(FollowEdge {
        id,
        follower,
        followed_account_id: row.get("followed_account_id"),
        created_at: row.get("created_at"),
    })
}

fn block_from_row(row: &PgRow) -> BlockEdge {
    BlockEdge {
        id: row.get("id"),
        blocker_account_id: row.get("blocker_account_id"),
        blocked_account_id: row.get("blocked_account_id"),
        created_at: row.get("created_at"),
    }
}

fn account_from_row(row: &PgRow) -> Account {
    Account {
        id: row.get("id"),
        username: row.get("username"),
        is_active: row.get("is_active"),
    }
}

/// Serializes follow and block writes touching the same pair of accounts.
async fn lock_pair(
    tx: &mut Transaction<'_, Postgres>,
    a: Uuid,
    b: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT id FROM accounts WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(vec![a, b])
        .fetch_all(&mut **tx)
        .await?;
    Ok(())
}

async fn cascade_unfollow(
    tx: &mut Transaction<'_, Postgres>,
    a: Uuid,
    b: Uuid,
) -> Result<u64, sqlx::Error> {
    let mut savepoint = Acquire::begin(&mut *tx).await?;
    let result = sqlx::query(
        "DELETE FROM follow_edges \
         WHERE (follower_account_id = $1 AND followed_account_id = $2) \
            OR (follower_account_id = $2 AND followed_account_id = $1)",
    )
    .bind(a)
    .bind(b)
    .execute(&mut *savepoint)
    .await?;
    savepoint.commit().await?;
    Ok(result.rows_affected())
}

#[async_trait]
impl AccountDirectory for PgStore {
    async fn resolve_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT id, username, is_active FROM accounts WHERE username = $1")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(account_from_row))
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT id, username, is_active FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(account_from_row))
    }
}

#[async_trait]
impl RelationshipStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.db
            .ping()
            .await
            .map_err(|err| StoreError::Internal(err.to_string()))
    }

    async fn insert_follow(
        &self,
        follower: &FollowerIdentity,
        followed_account_id: Uuid,
    ) -> Result<FollowInsert, StoreError> {
        let (account_id, actor_ref) = follower.columns();
        let mut tx = self.db.pool().begin().await?;

        if let Some(account_id) = account_id {
            lock_pair(&mut tx, account_id, followed_account_id).await?;
        }

        let row = sqlx::query(&format!(
            "INSERT INTO follow_edges (follower_account_id, external_actor_ref, followed_account_id) \
             SELECT $1::uuid, $2::text, $3::uuid \
             WHERE $1::uuid IS NULL OR NOT EXISTS ( \
                 SELECT 1 FROM block_edges \
                 WHERE (blocker_account_id = $1 AND blocked_account_id = $3) \
                    OR (blocker_account_id = $3 AND blocked_account_id = $1) \
             ) \
             RETURNING {}",
            FOLLOW_COLUMNS
        ))
        .bind(account_id)
        .bind(actor_ref)
        .bind(followed_account_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(FollowInsert::Blocked);
        };
        let edge = follow_from_row(&row)?;
        tx.commit().await?;

        Ok(FollowInsert::Inserted(edge))
    }

    async fn delete_follow(
        &self,
        follower: &FollowerIdentity,
        followed_account_id: Uuid,
    ) -> Result<bool, StoreError> {
        let (account_id, actor_ref) = follower.columns();
        let result = sqlx::query(
            "DELETE FROM follow_edges \
             WHERE followed_account_id = $3 \
               AND (follower_account_id = $1 OR external_actor_ref = $2)",
        )
        .bind(account_id)
        .bind(actor_ref)
        .bind(followed_account_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_follow(
        &self,
        follower: &FollowerIdentity,
        followed_account_id: Uuid,
    ) -> Result<Option<FollowEdge>, StoreError> {
        let (account_id, actor_ref) = follower.columns();
        let row = sqlx::query(&format!(
            "SELECT {} FROM follow_edges \
             WHERE followed_account_id = $3 \
               AND (follower_account_id = $1 OR external_actor_ref = $2)",
            FOLLOW_COLUMNS
        ))
        .bind(account_id)
        .bind(actor_ref)
        .bind(followed_account_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(follow_from_row).transpose()
    }

    async fn list_followers(
        &self,
        account_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<FollowEdge>, i64), StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM follow_edges \
             WHERE followed_account_id = $1 \
             ORDER BY created_at DESC, id ASC \
             OFFSET $2 LIMIT $3",
            FOLLOW_COLUMNS
        ))
        .bind(account_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let items = rows.iter().map(follow_from_row).collect::<Result<Vec<_>, _>>()?;
        let total = self.count_followers(account_id).await?;
        Ok((items, total))
    }

    async fn list_following(
        &self,
        account_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<FollowEdge>, i64), StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM follow_edges \
             WHERE follower_account_id = $1 \
             ORDER BY created_at DESC, id ASC \
             OFFSET $2 LIMIT $3",
            FOLLOW_COLUMNS
        ))
        .bind(account_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let items = rows.iter().map(follow_from_row).collect::<Result<Vec<_>, _>>()?;
        let total = self.count_following(account_id).await?;
        Ok((items, total))
    }

    async fn count_followers(&self, account_id: Uuid) -> Result<i64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM follow_edges WHERE followed_account_id = $1")
                .bind(account_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(count)
    }

    async fn count_following(&self, account_id: Uuid) -> Result<i64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM follow_edges WHERE follower_account_id = $1")
                .bind(account_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(count)
    }

    async fn following_among(
        &self,
        follower_account_id: Uuid,
        targets: &[Uuid],
    ) -> Result<HashSet<Uuid>, StoreError> {
        if targets.is_empty() {
            return Ok(HashSet::new());
        }

        let followed: Vec<Uuid> = sqlx::query_scalar(
            "SELECT followed_account_id FROM follow_edges \
             WHERE follower_account_id = $1 AND followed_account_id = ANY($2)",
        )
        .bind(follower_account_id)
        .bind(targets.to_vec())
        .fetch_all(self.db.pool())
        .await?;

        Ok(followed.into_iter().collect())
    }

    async fn insert_block(
        &self,
        blocker_account_id: Uuid,
        blocked_account_id: Uuid,
    ) -> Result<BlockInsert, StoreError> {
        let mut tx = self.db.pool().begin().await?;
        lock_pair(&mut tx, blocker_account_id, blocked_account_id).await?;

        let row = sqlx::query(
            "INSERT INTO block_edges (blocker_account_id, blocked_account_id) \
             VALUES ($1, $2) \
             RETURNING id, blocker_account_id, blocked_account_id, created_at",
        )
        .bind(blocker_account_id)
        .bind(blocked_account_id)
        .fetch_one(&mut *tx)
        .await?;
        let edge = block_from_row(&row);

        let cascade = cascade_unfollow(&mut tx, blocker_account_id, blocked_account_id)
            .await
            .map_err(|err| err.to_string());

        tx.commit().await?;

        Ok(BlockInsert { edge, cascade })
    }

    async fn delete_block(
        &self,
        blocker_account_id: Uuid,
        blocked_account_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM block_edges WHERE blocker_account_id = $1 AND blocked_account_id = $2",
        )
        .bind(blocker_account_id)
        .bind(blocked_account_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_block(
        &self,
        blocker_account_id: Uuid,
        blocked_account_id: Uuid,
    ) -> Result<Option<BlockEdge>, StoreError> {
        let row = sqlx::query(
            "SELECT id, blocker_account_id, blocked_account_id, created_at \
             FROM block_edges WHERE blocker_account_id = $1 AND blocked_account_id = $2",
        )
        .bind(blocker_account_id)
        .bind(blocked_account_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(block_from_row))
    }

    async fn is_blocked_either_direction(&self, a: Uuid, b: Uuid) -> Result<bool, StoreError> {
        let blocked: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM block_edges \
                 WHERE (blocker_account_id = $1 AND blocked_account_id = $2) \
                    OR (blocker_account_id = $2 AND blocked_account_id = $1) \
             )",
        )
        .bind(a)
        .bind(b)
        .fetch_one(self.db.pool())
        .await?;
        Ok(blocked)
    }

    async fn list_blocks(
        &self,
        blocker_account_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<BlockEdge>, i64), StoreError> {
        let rows = sqlx::query(
            "SELECT id, blocker_account_id, blocked_account_id, created_at \
             FROM block_edges WHERE blocker_account_id = $1 \
             ORDER BY created_at DESC, id ASC \
             OFFSET $2 LIMIT $3",
        )
        .bind(blocker_account_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM block_edges WHERE blocker_account_id = $1")
                .bind(blocker_account_id)
                .fetch_one(self.db.pool())
                .await?;

        Ok((rows.iter().map(block_from_row).collect(), total))
    }

    async fn relationship_status(
        &self,
        viewer_id: Uuid,
        other_id: Uuid,
    ) -> Result<RelationshipStatus, StoreError> {
        let row = sqlx::query(
            "SELECT \
                EXISTS (SELECT 1 FROM follow_edges WHERE follower_account_id = $1 AND followed_account_id = $2) AS is_following, \
                EXISTS (SELECT 1 FROM follow_edges WHERE follower_account_id = $2 AND followed_account_id = $1) AS is_followed_by, \
                EXISTS (SELECT 1 FROM block_edges WHERE blocker_account_id = $1 AND blocked_account_id = $2) AS is_blocking, \
                EXISTS (SELECT 1 FROM block_edges WHERE blocker_account_id = $2 AND blocked_account_id = $1) AS is_blocked_by",
        )
        .bind(viewer_id)
        .bind(other_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(RelationshipStatus {
            is_following: row.get("is_following"),
            is_followed_by: row.get("is_followed_by"),
            is_blocking: row.get("is_blocking"),
            is_blocked_by: row.get("is_blocked_by"),
        })
    }
}
