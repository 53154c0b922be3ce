//! Request handlers for the `/api/v1` routes and `/health`
//!
//! Every route is a GET with query parameters. Handlers only extract and
//! check parameters; all decisions live in the core engines.

use crate::error::{ApiError, ApiResult};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chback_core::rating::MSG_VARIATION_NOT_FOUND;
use chback_core::{Backend, CoreError, ItemId, VoteOp};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub type AppState = Arc<Backend>;

/// Union of every query parameter the API understands
#[derive(Debug, Default, Deserialize)]
pub struct Params {
    pub email: Option<String>,
    pub password: Option<String>,
    pub agree_to_privacy_policy: Option<String>,
    pub agree_to_terms_of_service: Option<String>,
    pub token: Option<String>,
    pub oldpassword: Option<String>,
    pub newpassword: Option<String>,
    pub endsessions: Option<String>,
    #[serde(rename = "variationId")]
    pub variation_id: Option<String>,
}

fn require(value: Option<String>, name: &'static str, status: StatusCode) -> ApiResult<String> {
    value.ok_or_else(|| ApiError::missing(name, status))
}

/// Case-insensitive "true"; anything else, including absence, is false
fn flag(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Report a missing parameter only after the token itself checks out
async fn missing_after_token(
    backend: &Backend,
    token: &str,
    name: &'static str,
    status: StatusCode,
) -> ApiError {
    match backend.accounts.verify(token).await {
        Ok(_) => ApiError::missing(name, status),
        Err(e) => e.into(),
    }
}

// ============================================================================
// Account handlers
// ============================================================================

/// GET /api/v1/register
pub async fn register(
    State(backend): State<AppState>,
    Query(params): Query<Params>,
) -> ApiResult<&'static str> {
    let email = require(params.email, "email", StatusCode::NOT_FOUND)?;
    let password = require(params.password, "password", StatusCode::NOT_FOUND)?;

    backend
        .accounts
        .register(
            &email,
            &password,
            flag(&params.agree_to_privacy_policy),
            flag(&params.agree_to_terms_of_service),
        )
        .await?;
    Ok("Account created")
}

/// GET /api/v1/auth
pub async fn auth(
    State(backend): State<AppState>,
    Query(params): Query<Params>,
) -> ApiResult<String> {
    let email = require(params.email, "email", StatusCode::NOT_FOUND)?;
    let password = require(params.password, "password", StatusCode::NOT_FOUND)?;

    Ok(backend.accounts.authenticate(&email, &password).await?)
}

/// GET /api/v1/logout
pub async fn logout(
    State(backend): State<AppState>,
    Query(params): Query<Params>,
) -> ApiResult<impl IntoResponse> {
    let token = require(params.token, "token", StatusCode::UNAUTHORIZED)?;

    backend.accounts.logout(&token).await?;
    Ok(Json(json!({ "loggedOut": true })))
}

/// GET /api/v1/change_password
pub async fn change_password(
    State(backend): State<AppState>,
    Query(params): Query<Params>,
) -> ApiResult<StatusCode> {
    let token = require(params.token, "token", StatusCode::UNAUTHORIZED)?;
    let Some(old_password) = params.oldpassword else {
        return Err(missing_after_token(&backend, &token, "password", StatusCode::UNAUTHORIZED).await);
    };
    let Some(new_password) = params.newpassword else {
        return Err(missing_after_token(&backend, &token, "new password", StatusCode::NOT_FOUND).await);
    };

    backend
        .accounts
        .change_password(&token, &old_password, &new_password, flag(&params.endsessions))
        .await?;
    Ok(StatusCode::OK)
}

/// GET /api/v1/delete
pub async fn delete(
    State(backend): State<AppState>,
    Query(params): Query<Params>,
) -> ApiResult<&'static str> {
    let token = require(params.token, "token", StatusCode::UNAUTHORIZED)?;
    let Some(password) = params.password else {
        return Err(missing_after_token(&backend, &token, "password", StatusCode::UNAUTHORIZED).await);
    };

    backend.accounts.delete_account(&token, &password).await?;
    Ok("Deleted account")
}

/// GET /api/v1/verify_token
pub async fn verify_token(
    State(backend): State<AppState>,
    Query(params): Query<Params>,
) -> ApiResult<impl IntoResponse> {
    let token = require(params.token, "token", StatusCode::BAD_REQUEST)?;

    let principal = backend.accounts.verify(&token).await?;
    Ok(Json(json!({
        "id": principal.claims.jti,
        "email": principal.email,
    })))
}

// ============================================================================
// Rating handlers
// ============================================================================

async fn vote(backend: &Backend, params: Params, op: VoteOp) -> ApiResult<impl IntoResponse> {
    let raw_id = require(params.variation_id, "variationId", StatusCode::NOT_FOUND)?;
    let token = require(params.token, "token", StatusCode::NOT_FOUND)?;

    let item: ItemId = match raw_id.parse() {
        Ok(item) => item,
        Err(_) => {
            backend.accounts.verify(&token).await?;
            return Err(CoreError::not_found(MSG_VARIATION_NOT_FOUND).into());
        }
    };

    backend.vote(&token, op, item).await?;

    let body = if op.is_cast() {
        json!({ "rated": true })
    } else {
        json!({ "unrated": true })
    };
    Ok(Json(body))
}

/// GET /api/v1/like
pub async fn like(
    State(backend): State<AppState>,
    Query(params): Query<Params>,
) -> ApiResult<impl IntoResponse> {
    vote(&backend, params, VoteOp::Like).await
}

/// GET /api/v1/dislike
pub async fn dislike(
    State(backend): State<AppState>,
    Query(params): Query<Params>,
) -> ApiResult<impl IntoResponse> {
    vote(&backend, params, VoteOp::Dislike).await
}

/// GET /api/v1/unlike
pub async fn unlike(
    State(backend): State<AppState>,
    Query(params): Query<Params>,
) -> ApiResult<impl IntoResponse> {
    vote(&backend, params, VoteOp::Unlike).await
}

/// GET /api/v1/undislike
pub async fn undislike(
    State(backend): State<AppState>,
    Query(params): Query<Params>,
) -> ApiResult<impl IntoResponse> {
    vote(&backend, params, VoteOp::Undislike).await
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health(State(backend): State<AppState>) -> impl IntoResponse {
    let report = backend.health.check().await;
    let status = StatusCode::from_u16(report.status.to_http_status())
        .unwrap_or(StatusCode::SERVICE_UNAVAILABLE);

    (status, Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_parsing() {
        assert!(flag(&Some("true".to_string())));
        assert!(flag(&Some("TRUE".to_string())));
        assert!(!flag(&Some("yes".to_string())));
        assert!(!flag(&None));
    }

    #[test]
    fn test_require() {
        assert_eq!(require(Some("x".into()), "email", StatusCode::NOT_FOUND).unwrap(), "x");

        let err = require(None, "email", StatusCode::NOT_FOUND).unwrap_err();
        assert_eq!(err.to_string(), "No email specified");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
