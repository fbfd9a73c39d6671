use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::app::block_graph::BlockGraph;
use crate::app::error::{RelationshipError, RelationshipResult};
use crate::app::pagination::{Pagination, RecentLimit};
use crate::domain::social_graph::{FollowEdge, FollowStats, FollowerIdentity, Page, RelationshipStatus};
use crate::infra::store::{FollowInsert, SharedDirectory, SharedStore, StoreError};

/// Owns the follow-edge lifecycle and every query over follow edges.
#[derive(Clone)]
pub struct FollowGraph {
    store: SharedStore,
    directory: SharedDirectory,
    blocks: BlockGraph,
    bulk_check_max: usize,
}

impl FollowGraph {
    pub fn new(
        store: SharedStore,
        directory: SharedDirectory,
        blocks: BlockGraph,
        bulk_check_max: usize,
    ) -> Self {
        Self {
            store,
            directory,
            blocks,
            bulk_check_max,
        }
    }

    /// Creates `follower -> followed_id`.
    ///
    /// Checks run in a fixed order: the followed account must exist and be
    /// active, a local follower may not follow itself and must still exist,
    /// a block in either direction forbids the edge, and an existing edge is
    /// reported instead of duplicated. The store repeats the block and uniqueness checks
    /// atomically with the insert.
    pub async fn follow_user(
        &self,
        follower: &FollowerIdentity,
        followed_id: Uuid,
    ) -> RelationshipResult<FollowEdge> {
        let followed = self
            .directory
            .find_account(followed_id)
            .await?
            .ok_or(RelationshipError::UserNotFound)?;
        if !followed.is_active {
            return Err(RelationshipError::UserInactive);
        }

        if let Some(local) = follower.local_id() {
            if local == followed_id {
                return Err(RelationshipError::SelfFollow);
            }
            // A token can outlive its account.
            if self.directory.find_account(local).await?.is_none() {
                return Err(RelationshipError::UserNotFound);
            }
            if self.blocks.is_blocked_either_direction(local, followed_id).await? {
                return Err(RelationshipError::Forbidden);
            }
        }

        if self.store.find_follow(follower, followed_id).await?.is_some() {
            return Err(RelationshipError::AlreadyFollowing);
        }

        match self.store.insert_follow(follower, followed_id).await {
            Ok(FollowInsert::Inserted(edge)) => {
                tracing::debug!(follower = %follower, followed_id = %followed_id, edge_id = %edge.id, "followed user");
                Ok(edge)
            }
            Ok(FollowInsert::Blocked) => Err(RelationshipError::Forbidden),
            // Lost the race against a concurrent identical follow.
            Err(StoreError::Conflict(_)) => Err(RelationshipError::AlreadyFollowing),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn unfollow_user(&self, follower_id: Uuid, followed_id: Uuid) -> RelationshipResult<()> {
        let follower = FollowerIdentity::Local(follower_id);
        if self.store.delete_follow(&follower, followed_id).await? {
            tracing::debug!(follower_id = %follower_id, followed_id = %followed_id, "unfollowed user");
            Ok(())
        } else {
            Err(RelationshipError::NotFollowing)
        }
    }

    pub async fn get_followers(
        &self,
        account_id: Uuid,
        pagination: Pagination,
    ) -> RelationshipResult<Page<FollowEdge>> {
        let (items, total) = self
            .store
            .list_followers(account_id, pagination.offset, pagination.limit)
            .await?;
        Ok(Page::new(items, total, pagination.offset))
    }

    pub async fn get_following(
        &self,
        account_id: Uuid,
        pagination: Pagination,
    ) -> RelationshipResult<Page<FollowEdge>> {
        let (items, total) = self
            .store
            .list_following(account_id, pagination.offset, pagination.limit)
            .await?;
        Ok(Page::new(items, total, pagination.offset))
    }

    pub async fn get_follow_stats(&self, account_id: Uuid) -> RelationshipResult<FollowStats> {
        Ok(FollowStats {
            follower_count: self.store.count_followers(account_id).await?,
            following_count: self.store.count_following(account_id).await?,
        })
    }

    pub async fn check_follow_status(&self, follower_id: Uuid, followed_id: Uuid) -> RelationshipResult<bool> {
        let follower = FollowerIdentity::Local(follower_id);
        Ok(self.store.find_follow(&follower, followed_id).await?.is_some())
    }

    /// Answers "does `follower_id` follow X" for every X in `targets`.
    ///
    /// Unknown ids map to `false`. More than `bulk_check_max` distinct ids is
    /// rejected rather than truncated so every input id gets an answer.
    pub async fn bulk_check_following(
        &self,
        follower_id: Uuid,
        targets: &[Uuid],
    ) -> RelationshipResult<HashMap<Uuid, bool>> {
        let distinct: Vec<Uuid> = targets
            .iter()
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if distinct.len() > self.bulk_check_max {
            return Err(RelationshipError::validation(format!(
                "at most {} target ids may be checked at once",
                self.bulk_check_max
            )));
        }

        let followed = self.store.following_among(follower_id, &distinct).await?;
        Ok(distinct
            .into_iter()
            .map(|id| (id, followed.contains(&id)))
            .collect())
    }

    pub async fn get_recent_followers(
        &self,
        account_id: Uuid,
        limit: RecentLimit,
    ) -> RelationshipResult<Vec<FollowEdge>> {
        let (items, _) = self.store.list_followers(account_id, 0, limit.0).await?;
        Ok(items)
    }

    pub async fn relationship_status(
        &self,
        viewer_id: Uuid,
        other_id: Uuid,
    ) -> RelationshipResult<RelationshipStatus> {
        if viewer_id == other_id {
            return Ok(RelationshipStatus::default());
        }
        Ok(self.store.relationship_status(viewer_id, other_id).await?)
    }
}
