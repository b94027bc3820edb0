use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use mapforge_core::error::AppError;
use mapforge_core::user::{User, hash_token};

use crate::error::ApiError;
use crate::state::AppState;

/// Pull the token out of an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn lookup_user(state: &AppState, token: &str) -> Result<Option<User>, AppError> {
    // Tokens are stored digested; hash the presented key and look it up.
    let digest = hash_token(token);
    state.db.user_repo().get_by_token_digest(&digest).await
}

/// Extractor for endpoints that require an authenticated caller.
///
/// Rejects with 401 / `InvalidToken` when the header is missing or the
/// token resolves to no user.
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let user = lookup_user(state, token)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(AuthUser(user))
    }
}

/// Extractor for endpoints with optional authentication.
///
/// A missing or unresolvable token yields an anonymous caller rather
/// than a rejection; handlers honor the identity when present.
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybeUser(None));
        };
        Ok(MaybeUser(lookup_user(state, token).await?))
    }
}
