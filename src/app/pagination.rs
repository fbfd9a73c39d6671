use std::str::FromStr;

use crate::app::error::{RelationshipError, RelationshipResult};
use crate::config::QueryParsing;

/// Offset pagination window for follower, following and block listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    /// Parses raw query values.
    ///
    /// Lenient mode never fails: an oversized limit is clamped to
    /// [`Self::MAX_LIMIT`], anything else unusable falls back to the default.
    /// Strict mode rejects what lenient mode would repair.
    pub fn parse(
        offset: Option<&str>,
        limit: Option<&str>,
        mode: QueryParsing,
    ) -> RelationshipResult<Self> {
        let offset = match parse_number::<i64>(offset, "offset", mode)? {
            Some(value) if value >= 0 => value,
            Some(_) if mode == QueryParsing::Strict => {
                return Err(RelationshipError::validation("offset must be zero or greater"))
            }
            _ => 0,
        };
        let limit = parse_bounded(limit, "limit", Self::DEFAULT_LIMIT, Self::MAX_LIMIT, mode)?;
        Ok(Self { offset, limit })
    }
}

/// Size of the "recent followers" window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentLimit(pub i64);

impl Default for RecentLimit {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl RecentLimit {
    pub const DEFAULT: i64 = 10;
    pub const MAX: i64 = 50;

    pub fn parse(limit: Option<&str>, mode: QueryParsing) -> RelationshipResult<Self> {
        parse_bounded(limit, "limit", Self::DEFAULT, Self::MAX, mode).map(Self)
    }
}

fn parse_number<T: FromStr>(
    raw: Option<&str>,
    name: &str,
    mode: QueryParsing,
) -> RelationshipResult<Option<T>> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<T>() {
        Ok(value) => Ok(Some(value)),
        Err(_) if mode == QueryParsing::Strict => Err(RelationshipError::validation(format!(
            "{} must be a number",
            name
        ))),
        Err(_) => Ok(None),
    }
}

fn parse_bounded(
    raw: Option<&str>,
    name: &str,
    default: i64,
    max: i64,
    mode: QueryParsing,
) -> RelationshipResult<i64> {
    match parse_number::<i64>(raw, name, mode)? {
        None => Ok(default),
        Some(value) if (1..=max).contains(&value) => Ok(value),
        Some(_) if mode == QueryParsing::Strict => Err(RelationshipError::validation(format!(
            "{} must be between 1 and {}",
            name, max
        ))),
        Some(value) if value > max => Ok(max),
        Some(_) => Ok(default),
    }
}
