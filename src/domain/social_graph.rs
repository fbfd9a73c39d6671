use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The "who" of a follow edge.
///
/// A follower is either an account on this instance or an actor that lives
/// elsewhere and is known only by its reference URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FollowerIdentity {
    Local(Uuid),
    External(ExternalActorRef),
}

impl FollowerIdentity {
    pub fn local_id(&self) -> Option<Uuid> {
        match self {
            FollowerIdentity::Local(id) => Some(*id),
            FollowerIdentity::External(_) => None,
        }
    }

    pub fn external_ref(&self) -> Option<&ExternalActorRef> {
        match self {
            FollowerIdentity::Local(_) => None,
            FollowerIdentity::External(actor) => Some(actor),
        }
    }

    /// Storage columns `(follower_account_id, external_actor_ref)`; exactly one is set.
    pub fn columns(&self) -> (Option<Uuid>, Option<&str>) {
        match self {
            FollowerIdentity::Local(id) => (Some(*id), None),
            FollowerIdentity::External(actor) => (None, Some(actor.as_str())),
        }
    }

    /// Rebuilds an identity from its storage columns.
    ///
    /// Returns `None` when both or neither column is set.
    pub fn from_columns(account_id: Option<Uuid>, actor_ref: Option<String>) -> Option<Self> {
        match (account_id, actor_ref) {
            (Some(id), None) => Some(FollowerIdentity::Local(id)),
            (None, Some(actor)) => Some(FollowerIdentity::External(ExternalActorRef(actor))),
            _ => None,
        }
    }
}

impl fmt::Display for FollowerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowerIdentity::Local(id) => write!(f, "local:{}", id),
            FollowerIdentity::External(actor) => write!(f, "external:{}", actor),
        }
    }
}

/// Opaque reference to a follower that is not a local account.
///
/// Construct through [`ExternalActorRef::parse`] so the value is known to be a
/// usable absolute URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ExternalActorRef(String);

impl ExternalActorRef {
    pub const MAX_LEN: usize = 2048;

    pub fn parse(raw: &str) -> Result<Self, InvalidActorRef> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidActorRef::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(InvalidActorRef::TooLong);
        }
        let parsed = url::Url::parse(trimmed).map_err(|_| InvalidActorRef::NotAUri)?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(InvalidActorRef::NotAUri);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidActorRef {
    #[error("external actor reference is empty")]
    Empty,
    #[error("external actor reference is longer than 2048 bytes")]
    TooLong,
    #[error("external actor reference must be an absolute http(s) URI")]
    NotAUri,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowEdge {
    pub id: Uuid,
    pub follower: FollowerIdentity,
    pub followed_account_id: Uuid,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEdge {
    pub id: Uuid,
    pub blocker_account_id: Uuid,
    pub blocked_account_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FollowStats {
    pub follower_count: i64,
    pub following_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RelationshipStatus {
    pub is_following: bool,
    pub is_followed_by: bool,
    pub is_blocking: bool,
    pub is_blocked_by: bool,
}

/// One page of an offset-paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: i64, offset: i64) -> Self {
        let has_next = total_count > offset + items.len() as i64;
        Self {
            items,
            total_count,
            has_next,
        }
    }
}
