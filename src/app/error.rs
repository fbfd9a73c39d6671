use crate::infra::store::StoreError;

/// Stable, transport-independent failure categories.
///
/// Callers and tests match on the kind; message text may change freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    UserNotFound,
    UserInactive,
    AuthenticationRequired,
    NoFollowerIdentity,
    Forbidden,
    SelfFollow,
    SelfBlock,
    AlreadyFollowing,
    NotFollowing,
    AlreadyBlocked,
    NotBlocked,
    Internal,
}

impl ErrorKind {
    pub const COUNT: usize = 13;

    pub const ALL: [ErrorKind; ErrorKind::COUNT] = [
        ErrorKind::Validation,
        ErrorKind::UserNotFound,
        ErrorKind::UserInactive,
        ErrorKind::AuthenticationRequired,
        ErrorKind::NoFollowerIdentity,
        ErrorKind::Forbidden,
        ErrorKind::SelfFollow,
        ErrorKind::SelfBlock,
        ErrorKind::AlreadyFollowing,
        ErrorKind::NotFollowing,
        ErrorKind::AlreadyBlocked,
        ErrorKind::NotBlocked,
        ErrorKind::Internal,
    ];
}

#[derive(Debug, thiserror::Error)]
pub enum RelationshipError {
    #[error("{0}")]
    Validation(String),
    #[error("user not found")]
    UserNotFound,
    #[error("user is inactive")]
    UserInactive,
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("no follower identity supplied")]
    NoFollowerIdentity,
    #[error("relationship is blocked")]
    Forbidden,
    #[error("cannot follow yourself")]
    SelfFollow,
    #[error("cannot block yourself")]
    SelfBlock,
    #[error("already following")]
    AlreadyFollowing,
    #[error("not following")]
    NotFollowing,
    #[error("already blocked")]
    AlreadyBlocked,
    #[error("not blocked")]
    NotBlocked,
    #[error(transparent)]
    Internal(#[from] StoreError),
}

impl RelationshipError {
    pub fn validation(message: impl Into<String>) -> Self {
        RelationshipError::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RelationshipError::Validation(_) => ErrorKind::Validation,
            RelationshipError::UserNotFound => ErrorKind::UserNotFound,
            RelationshipError::UserInactive => ErrorKind::UserInactive,
            RelationshipError::AuthenticationRequired => ErrorKind::AuthenticationRequired,
            RelationshipError::NoFollowerIdentity => ErrorKind::NoFollowerIdentity,
            RelationshipError::Forbidden => ErrorKind::Forbidden,
            RelationshipError::SelfFollow => ErrorKind::SelfFollow,
            RelationshipError::SelfBlock => ErrorKind::SelfBlock,
            RelationshipError::AlreadyFollowing => ErrorKind::AlreadyFollowing,
            RelationshipError::NotFollowing => ErrorKind::NotFollowing,
            RelationshipError::AlreadyBlocked => ErrorKind::AlreadyBlocked,
            RelationshipError::NotBlocked => ErrorKind::NotBlocked,
            RelationshipError::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type RelationshipResult<T> = Result<T, RelationshipError>;
