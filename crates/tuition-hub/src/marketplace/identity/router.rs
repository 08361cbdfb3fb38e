use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::marketplace::error::MarketplaceError;

use super::repository::{SessionStore, UserRepository};
use super::service::{IdentityService, NewUser, PasswordChange};

/// Pull the bearer token out of the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, MarketplaceError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(MarketplaceError::Unauthorized)
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Router builder exposing registration, login, and account endpoints.
pub fn identity_router<U, S>(service: Arc<IdentityService<U, S>>) -> Router
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    Router::new()
        .route("/api/auth/register", post(register_handler::<U, S>))
        .route("/api/auth/login", post(login_handler::<U, S>))
        .route("/api/auth/me", get(me_handler::<U, S>))
        .route("/api/auth/password", put(password_handler::<U, S>))
        .with_state(service)
}

async fn register_handler<U, S>(
    State(service): State<Arc<IdentityService<U, S>>>,
    Json(new_user): Json<NewUser>,
) -> Result<Response, MarketplaceError>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let authenticated = service.register(new_user)?;
    Ok((StatusCode::CREATED, Json(authenticated)).into_response())
}

async fn login_handler<U, S>(
    State(service): State<Arc<IdentityService<U, S>>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, MarketplaceError>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let authenticated = service.login(&request.email, &request.password)?;
    Ok(Json(authenticated).into_response())
}

async fn me_handler<U, S>(
    State(service): State<Arc<IdentityService<U, S>>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let identity = service.authenticate(bearer_token(&headers)?)?;
    let view = service.me(identity)?;
    Ok(Json(view).into_response())
}

async fn password_handler<U, S>(
    State(service): State<Arc<IdentityService<U, S>>>,
    headers: HeaderMap,
    Json(change): Json<PasswordChange>,
) -> Result<Response, MarketplaceError>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let identity = service.authenticate(bearer_token(&headers)?)?;
    service.change_password(identity, change)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
