//! Entry point for every relationship operation.
//!
//! The facade resolves who is asking, turns usernames into accounts, calls
//! into [`FollowGraph`] and [`BlockGraph`], and reports failures through
//! [`ERROR_TABLE`]. It holds no graph rules of its own.

use std::collections::HashMap;

use uuid::Uuid;

use crate::app::block_graph::BlockGraph;
use crate::app::error::{ErrorKind, RelationshipError, RelationshipResult};
use crate::app::follow_graph::FollowGraph;
use crate::app::pagination::{Pagination, RecentLimit};
use crate::config::RelationshipSettings;
use crate::domain::account::Account;
use crate::domain::social_graph::{
    BlockEdge, ExternalActorRef, FollowEdge, FollowStats, FollowerIdentity, Page,
    RelationshipStatus,
};
use crate::infra::store::{SharedDirectory, SharedStore};

/// Caller-facing shape of one [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorEntry {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub status: u16,
}

/// Indexed by `ErrorKind as usize`.
pub const ERROR_TABLE: [ErrorEntry; ErrorKind::COUNT] = [
    ErrorEntry { kind: ErrorKind::Validation, code: "VALIDATION_ERROR", status: 400 },
    ErrorEntry { kind: ErrorKind::UserNotFound, code: "USER_NOT_FOUND", status: 404 },
    ErrorEntry { kind: ErrorKind::UserInactive, code: "USER_INACTIVE", status: 403 },
    ErrorEntry { kind: ErrorKind::AuthenticationRequired, code: "AUTHENTICATION_REQUIRED", status: 401 },
    ErrorEntry { kind: ErrorKind::NoFollowerIdentity, code: "NO_FOLLOWER_IDENTITY", status: 401 },
    ErrorEntry { kind: ErrorKind::Forbidden, code: "FORBIDDEN", status: 403 },
    ErrorEntry { kind: ErrorKind::SelfFollow, code: "SELF_FOLLOW_ERROR", status: 400 },
    ErrorEntry { kind: ErrorKind::SelfBlock, code: "SELF_BLOCK_ERROR", status: 400 },
    ErrorEntry { kind: ErrorKind::AlreadyFollowing, code: "ALREADY_FOLLOWING", status: 409 },
    ErrorEntry { kind: ErrorKind::NotFollowing, code: "NOT_FOLLOWING", status: 404 },
    ErrorEntry { kind: ErrorKind::AlreadyBlocked, code: "ALREADY_BLOCKED", status: 409 },
    ErrorEntry { kind: ErrorKind::NotBlocked, code: "NOT_BLOCKED", status: 404 },
    ErrorEntry { kind: ErrorKind::Internal, code: "INTERNAL_ERROR", status: 500 },
];

pub fn error_entry(kind: ErrorKind) -> &'static ErrorEntry {
    &ERROR_TABLE[kind as usize]
}

/// A failed facade call, ready for any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub status: u16,
    pub message: String,
}

impl From<RelationshipError> for ApiFailure {
    fn from(err: RelationshipError) -> Self {
        let entry = error_entry(err.kind());
        let message = match err {
            RelationshipError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        Self {
            kind: entry.kind,
            code: entry.code,
            status: entry.status,
            message,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiFailure>;

/// Who is making a request, as handed over by the transport.
///
/// `account_id` is set only after the transport authenticated the caller.
/// `external_actor` is an unverified reference offered in place of
/// authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub account_id: Option<Uuid>,
    pub external_actor: Option<String>,
}

impl Caller {
    pub fn local(account_id: Uuid) -> Self {
        Self {
            account_id: Some(account_id),
            external_actor: None,
        }
    }

    pub fn external(actor: impl Into<String>) -> Self {
        Self {
            account_id: None,
            external_actor: Some(actor.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated account wins over an external reference.
    pub fn follower_identity(&self) -> RelationshipResult<FollowerIdentity> {
        if let Some(id) = self.account_id {
            return Ok(FollowerIdentity::Local(id));
        }
        match self.external_actor.as_deref() {
            Some(raw) => ExternalActorRef::parse(raw)
                .map(FollowerIdentity::External)
                .map_err(|err| RelationshipError::validation(err.to_string())),
            None => Err(RelationshipError::NoFollowerIdentity),
        }
    }

    pub fn require_local(&self) -> RelationshipResult<Uuid> {
        self.account_id
            .ok_or(RelationshipError::AuthenticationRequired)
    }
}

#[derive(Clone)]
pub struct RelationshipApi {
    follows: FollowGraph,
    blocks: BlockGraph,
    directory: SharedDirectory,
    settings: RelationshipSettings,
}

impl RelationshipApi {
    pub fn new(store: SharedStore, directory: SharedDirectory, settings: RelationshipSettings) -> Self {
        let blocks = BlockGraph::new(store.clone());
        let follows = FollowGraph::new(
            store,
            directory.clone(),
            blocks.clone(),
            settings.bulk_check_max,
        );
        Self {
            follows,
            blocks,
            directory,
            settings,
        }
    }

    async fn account(&self, username: &str) -> RelationshipResult<Account> {
        self.directory
            .resolve_by_username(username)
            .await?
            .ok_or(RelationshipError::UserNotFound)
    }

    pub async fn follow(&self, caller: &Caller, username: &str) -> ApiResult<FollowEdge> {
        let result: RelationshipResult<_> = async {
            let follower = caller.follower_identity()?;
            let target = self.account(username).await?;
            self.follows.follow_user(&follower, target.id).await
        }
        .await;
        result.map_err(|err| failure("follow", err))
    }

    pub async fn unfollow(&self, caller: &Caller, username: &str) -> ApiResult<()> {
        let result: RelationshipResult<_> = async {
            let follower_id = caller.require_local()?;
            let target = self.account(username).await?;
            self.follows.unfollow_user(follower_id, target.id).await
        }
        .await;
        result.map_err(|err| failure("unfollow", err))
    }

    pub async fn block(&self, caller: &Caller, username: &str) -> ApiResult<BlockEdge> {
        let result: RelationshipResult<_> = async {
            let blocker_id = caller.require_local()?;
            let target = self.account(username).await?;
            if self.directory.find_account(blocker_id).await?.is_none() {
                return Err(RelationshipError::UserNotFound);
            }
            self.blocks.block_user(blocker_id, target.id).await
        }
        .await;
        result.map_err(|err| failure("block", err))
    }

    pub async fn unblock(&self, caller: &Caller, username: &str) -> ApiResult<()> {
        let result: RelationshipResult<_> = async {
            let blocker_id = caller.require_local()?;
            let target = self.account(username).await?;
            self.blocks.unblock_user(blocker_id, target.id).await
        }
        .await;
        result.map_err(|err| failure("unblock", err))
    }

    pub async fn followers(
        &self,
        username: &str,
        offset: Option<&str>,
        limit: Option<&str>,
    ) -> ApiResult<Page<FollowEdge>> {
        let result: RelationshipResult<_> = async {
            let pagination = Pagination::parse(offset, limit, self.settings.query_parsing)?;
            let account = self.account(username).await?;
            self.follows.get_followers(account.id, pagination).await
        }
        .await;
        result.map_err(|err| failure("list followers", err))
    }

    pub async fn following(
        &self,
        username: &str,
        offset: Option<&str>,
        limit: Option<&str>,
    ) -> ApiResult<Page<FollowEdge>> {
        let result: RelationshipResult<_> = async {
            let pagination = Pagination::parse(offset, limit, self.settings.query_parsing)?;
            let account = self.account(username).await?;
            self.follows.get_following(account.id, pagination).await
        }
        .await;
        result.map_err(|err| failure("list following", err))
    }

    pub async fn recent_followers(
        &self,
        username: &str,
        limit: Option<&str>,
    ) -> ApiResult<Vec<FollowEdge>> {
        let result: RelationshipResult<_> = async {
            let limit = RecentLimit::parse(limit, self.settings.query_parsing)?;
            let account = self.account(username).await?;
            self.follows.get_recent_followers(account.id, limit).await
        }
        .await;
        result.map_err(|err| failure("list recent followers", err))
    }

    pub async fn stats(&self, username: &str) -> ApiResult<FollowStats> {
        let result: RelationshipResult<_> = async {
            let account = self.account(username).await?;
            self.follows.get_follow_stats(account.id).await
        }
        .await;
        result.map_err(|err| failure("follow stats", err))
    }

    /// Does the caller follow `username`.
    pub async fn follow_status(&self, caller: &Caller, username: &str) -> ApiResult<bool> {
        let result: RelationshipResult<_> = async {
            let follower_id = caller.require_local()?;
            let target = self.account(username).await?;
            self.follows.check_follow_status(follower_id, target.id).await
        }
        .await;
        result.map_err(|err| failure("follow status", err))
    }

    pub async fn bulk_following(
        &self,
        caller: &Caller,
        target_ids: &[Uuid],
    ) -> ApiResult<HashMap<Uuid, bool>> {
        let result: RelationshipResult<_> = async {
            let follower_id = caller.require_local()?;
            self.follows.bulk_check_following(follower_id, target_ids).await
        }
        .await;
        result.map_err(|err| failure("bulk follow check", err))
    }

    pub async fn relationship(&self, caller: &Caller, username: &str) -> ApiResult<RelationshipStatus> {
        let result: RelationshipResult<_> = async {
            let viewer_id = caller.require_local()?;
            let other = self.account(username).await?;
            self.follows.relationship_status(viewer_id, other.id).await
        }
        .await;
        result.map_err(|err| failure("relationship status", err))
    }

    pub async fn blocked_accounts(
        &self,
        caller: &Caller,
        offset: Option<&str>,
        limit: Option<&str>,
    ) -> ApiResult<Page<BlockEdge>> {
        let result: RelationshipResult<_> = async {
            let blocker_id = caller.require_local()?;
            let pagination = Pagination::parse(offset, limit, self.settings.query_parsing)?;
            self.blocks.get_blocked(blocker_id, pagination).await
        }
        .await;
        result.map_err(|err| failure("list blocks", err))
    }
}

fn failure(operation: &'static str, err: RelationshipError) -> ApiFailure {
    if err.kind() == ErrorKind::Internal {
        tracing::error!(error = ?err, operation, "relationship operation failed");
    }
    err.into()
}
