use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use axum::http::HeaderName;

use crate::app::relationships::Caller;
use crate::http::AppError;
use crate::AppState;

/// Header carrying an external actor reference for unauthenticated follows.
pub const ACTOR_REF_HEADER: HeaderName = HeaderName::from_static("x-actor-ref");

/// The caller of a request.
///
/// A missing `Authorization` header yields an anonymous caller, leaving the
/// facade to decide whether the operation needs an account. A header that is
/// present but unusable is rejected here.
#[derive(Debug, Clone)]
pub struct RequestCaller(pub Caller);

#[axum::async_trait]
impl FromRequestParts<AppState> for RequestCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let external_actor = parts
            .headers
            .get(ACTOR_REF_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string);

        let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(RequestCaller(Caller {
                account_id: None,
                external_actor,
            }));
        };

        let token = auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))?;

        let session = state
            .auth
            .authenticate_access_token(token)
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to authenticate");
                AppError::internal("failed to authenticate")
            })?
            .ok_or_else(|| AppError::unauthorized("invalid token"))?;

        Ok(RequestCaller(Caller {
            account_id: Some(session.account_id),
            external_actor,
        }))
    }
}
