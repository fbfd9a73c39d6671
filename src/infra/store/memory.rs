//! In-memory storage.
//!
//! Everything sits behind one [`RwLock`], so each trait call observes and
//! mutates a consistent snapshot. Nothing survives the process.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::{AccountDirectory, BlockInsert, FollowInsert, RelationshipStore, StoreError};
use crate::domain::account::Account;
use crate::domain::social_graph::{BlockEdge, FollowEdge, FollowerIdentity, RelationshipStatus};

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, Account>,
    follows: HashMap<(FollowerIdentity, Uuid), FollowEdge>,
    blocks: HashMap<(Uuid, Uuid), BlockEdge>,
    last_timestamp: Option<OffsetDateTime>,
}

impl Inner {
    /// Microsecond-precision clock that never repeats a value.
    fn next_timestamp(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let now = now
            .replace_nanosecond(now.microsecond() * 1_000)
            .unwrap_or(now);
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn blocked_either(&self, a: Uuid, b: Uuid) -> bool {
        self.blocks.contains_key(&(a, b)) || self.blocks.contains_key(&(b, a))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Internal("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Internal("memory store lock poisoned".into()))
    }

    /// Registers an account with the directory side of the store.
    pub fn insert_account(&self, username: &str, is_active: bool) -> Result<Account, StoreError> {
        let mut inner = self.write()?;
        if inner.accounts.values().any(|a| a.username == username) {
            return Err(StoreError::Conflict(format!("username {} is taken", username)));
        }
        let account = Account {
            id: Uuid::new_v4(),
            username: username.to_string(),
            is_active,
        };
        inner.accounts.insert(account.id, account.clone());
        Ok(account)
    }
}

/// Newest first, ties broken by ascending id, then sliced to one page.
fn page_of<T: Clone>(
    mut items: Vec<T>,
    key: impl Fn(&T) -> (OffsetDateTime, Uuid),
    offset: i64,
    limit: i64,
) -> (Vec<T>, i64) {
    items.sort_by(|a, b| {
        let (a_at, a_id) = key(a);
        let (b_at, b_id) = key(b);
        b_at.cmp(&a_at).then(a_id.cmp(&b_id))
    });
    let total = items.len() as i64;
    let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
    let page = items.into_iter().skip(offset).take(limit).collect();
    (page, total)
}

fn follow_key(edge: &FollowEdge) -> (OffsetDateTime, Uuid) {
    (edge.created_at, edge.id)
}

fn block_key(edge: &BlockEdge) -> (OffsetDateTime, Uuid) {
    (edge.created_at, edge.id)
}

#[async_trait]
impl AccountDirectory for MemoryStore {
    async fn resolve_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }

    async fn insert_follow(
        &self,
        follower: &FollowerIdentity,
        followed_account_id: Uuid,
    ) -> Result<FollowInsert, StoreError> {
        let mut inner = self.write()?;
        let key = (follower.clone(), followed_account_id);
        if inner.follows.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "{} already follows {}",
                follower, followed_account_id
            )));
        }
        if let Some(local) = follower.local_id() {
            if local == followed_account_id {
                return Err(StoreError::Internal("self-follow reached the store".into()));
            }
            if inner.blocked_either(local, followed_account_id) {
                return Ok(FollowInsert::Blocked);
            }
        }

        let edge = FollowEdge {
            id: Uuid::new_v4(),
            follower: follower.clone(),
            followed_account_id,
            created_at: inner.next_timestamp(),
        };
        inner.follows.insert(key, edge.clone());
        Ok(FollowInsert::Inserted(edge))
    }

    async fn delete_follow(
        &self,
        follower: &FollowerIdentity,
        followed_account_id: Uuid,
    ) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        Ok(inner
            .follows
            .remove(&(follower.clone(), followed_account_id))
            .is_some())
    }

    async fn find_follow(
        &self,
        follower: &FollowerIdentity,
        followed_account_id: Uuid,
    ) -> Result<Option<FollowEdge>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .follows
            .get(&(follower.clone(), followed_account_id))
            .cloned())
    }

    async fn list_followers(
        &self,
        account_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<FollowEdge>, i64), StoreError> {
        let inner = self.read()?;
        let edges = inner
            .follows
            .values()
            .filter(|e| e.followed_account_id == account_id)
            .cloned()
            .collect();
        Ok(page_of(edges, follow_key, offset, limit))
    }

    async fn list_following(
        &self,
        account_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<FollowEdge>, i64), StoreError> {
        let inner = self.read()?;
        let edges = inner
            .follows
            .values()
            .filter(|e| e.follower.local_id() == Some(account_id))
            .cloned()
            .collect();
        Ok(page_of(edges, follow_key, offset, limit))
    }

    async fn count_followers(&self, account_id: Uuid) -> Result<i64, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .follows
            .values()
            .filter(|e| e.followed_account_id == account_id)
            .count() as i64)
    }

    async fn count_following(&self, account_id: Uuid) -> Result<i64, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .follows
            .values()
            .filter(|e| e.follower.local_id() == Some(account_id))
            .count() as i64)
    }

    async fn following_among(
        &self,
        follower_account_id: Uuid,
        targets: &[Uuid],
    ) -> Result<HashSet<Uuid>, StoreError> {
        let inner = self.read()?;
        let follower = FollowerIdentity::Local(follower_account_id);
        Ok(targets
            .iter()
            .copied()
            .filter(|target| inner.follows.contains_key(&(follower.clone(), *target)))
            .collect())
    }

    async fn insert_block(
        &self,
        blocker_account_id: Uuid,
        blocked_account_id: Uuid,
    ) -> Result<BlockInsert, StoreError> {
        let mut inner = self.write()?;
        let key = (blocker_account_id, blocked_account_id);
        if inner.blocks.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "{} already blocks {}",
                blocker_account_id, blocked_account_id
            )));
        }

        let edge = BlockEdge {
            id: Uuid::new_v4(),
            blocker_account_id,
            blocked_account_id,
            created_at: inner.next_timestamp(),
        };
        inner.blocks.insert(key, edge.clone());

        let mut removed = 0;
        for (follower, followed) in [
            (blocker_account_id, blocked_account_id),
            (blocked_account_id, blocker_account_id),
        ] {
            if inner
                .follows
                .remove(&(FollowerIdentity::Local(follower), followed))
                .is_some()
            {
                removed += 1;
            }
        }

        Ok(BlockInsert {
            edge,
            cascade: Ok(removed),
        })
    }

    async fn delete_block(
        &self,
        blocker_account_id: Uuid,
        blocked_account_id: Uuid,
    ) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        Ok(inner
            .blocks
            .remove(&(blocker_account_id, blocked_account_id))
            .is_some())
    }

    async fn find_block(
        &self,
        blocker_account_id: Uuid,
        blocked_account_id: Uuid,
    ) -> Result<Option<BlockEdge>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .blocks
            .get(&(blocker_account_id, blocked_account_id))
            .cloned())
    }

    async fn is_blocked_either_direction(&self, a: Uuid, b: Uuid) -> Result<bool, StoreError> {
        Ok(self.read()?.blocked_either(a, b))
    }

    async fn list_blocks(
        &self,
        blocker_account_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<BlockEdge>, i64), StoreError> {
        let inner = self.read()?;
        let edges = inner
            .blocks
            .values()
            .filter(|e| e.blocker_account_id == blocker_account_id)
            .cloned()
            .collect();
        Ok(page_of(edges, block_key, offset, limit))
    }

    async fn relationship_status(
        &self,
        viewer_id: Uuid,
        other_id: Uuid,
    ) -> Result<RelationshipStatus, StoreError> {
        let inner = self.read()?;
        Ok(RelationshipStatus {
            is_following: inner
                .follows
                .contains_key(&(FollowerIdentity::Local(viewer_id), other_id)),
            is_followed_by: inner
                .follows
                .contains_key(&(FollowerIdentity::Local(other_id), viewer_id)),
            is_blocking: inner.blocks.contains_key(&(viewer_id, other_id)),
            is_blocked_by: inner.blocks.contains_key(&(other_id, viewer_id)),
        })
    }
}
