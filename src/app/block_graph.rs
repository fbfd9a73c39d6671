use uuid::Uuid;

use crate::app::error::{RelationshipError, RelationshipResult};
use crate::app::pagination::Pagination;
use crate::domain::social_graph::{BlockEdge, Page};
use crate::infra::store::{SharedStore, StoreError};

/// Owns the block-edge lifecycle.
#[derive(Clone)]
pub struct BlockGraph {
    store: SharedStore,
}

impl BlockGraph {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Blocks `blocked_id` on behalf of `blocker_id` and drops any follow
    /// edges between the two in the same transaction.
    pub async fn block_user(&self, blocker_id: Uuid, blocked_id: Uuid) -> RelationshipResult<BlockEdge> {
        if blocker_id == blocked_id {
            return Err(RelationshipError::SelfBlock);
        }
        if self.store.find_block(blocker_id, blocked_id).await?.is_some() {
            return Err(RelationshipError::AlreadyBlocked);
        }

        let inserted = match self.store.insert_block(blocker_id, blocked_id).await {
            Ok(inserted) => inserted,
            Err(StoreError::Conflict(_)) => return Err(RelationshipError::AlreadyBlocked),
            Err(err) => return Err(err.into()),
        };

        match inserted.cascade {
            Ok(removed) => {
                tracing::debug!(blocker_id = %blocker_id, blocked_id = %blocked_id, removed_follows = removed, "blocked user");
            }
            Err(err) => {
                // The block is kept even when the cascade fails.
                tracing::warn!(error = %err, blocker_id = %blocker_id, blocked_id = %blocked_id, "block cascade failed to remove follow edges");
            }
        }

        Ok(inserted.edge)
    }

    /// Unblocking never restores follow edges removed by the block.
    pub async fn unblock_user(&self, blocker_id: Uuid, blocked_id: Uuid) -> RelationshipResult<()> {
        if self.store.delete_block(blocker_id, blocked_id).await? {
            tracing::debug!(blocker_id = %blocker_id, blocked_id = %blocked_id, "unblocked user");
            Ok(())
        } else {
            Err(RelationshipError::NotBlocked)
        }
    }

    /// Does `blocker_id` block `blocked_id`.
    pub async fn is_blocked(&self, blocker_id: Uuid, blocked_id: Uuid) -> RelationshipResult<bool> {
        Ok(self.store.find_block(blocker_id, blocked_id).await?.is_some())
    }

    pub async fn is_blocked_either_direction(&self, a: Uuid, b: Uuid) -> RelationshipResult<bool> {
        Ok(self.store.is_blocked_either_direction(a, b).await?)
    }

    pub async fn get_blocked(
        &self,
        blocker_id: Uuid,
        pagination: Pagination,
    ) -> RelationshipResult<Page<BlockEdge>> {
        let (items, total) = self
            .store
            .list_blocks(blocker_id, pagination.offset, pagination.limit)
            .await?;
        Ok(Page::new(items, total, pagination.offset))
    }
}
