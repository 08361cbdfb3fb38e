use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::marketplace::error::MarketplaceError;
use crate::marketplace::identity::{bearer_token, IdentityService, SessionStore, UserRepository};
use crate::realtime::EventPublisher;

use super::domain::{ApplicationId, PostId};
use super::filter::PostQuery;
use super::lifecycle::ApplicationDecision;
use super::repository::PostRepository;
use super::service::{ApplicationRequest, NewTuitionPost, TuitionPostService, UpdateTuitionPost};

/// Shared handler state: the post service plus the identity service used to
/// resolve bearer tokens.
pub struct PostRoutes<P, U, S, E> {
    service: Arc<TuitionPostService<P, U, E>>,
    identity: Arc<IdentityService<U, S>>,
}

impl<P, U, S, E> Clone for PostRoutes<P, U, S, E> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            identity: self.identity.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusChangeRequest {
    status: ApplicationDecision,
}

/// Router builder exposing the tuition post endpoints.
pub fn post_router<P, U, S, E>(
    service: Arc<TuitionPostService<P, U, E>>,
    identity: Arc<IdentityService<U, S>>,
) -> Router
where
    P: PostRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
    E: EventPublisher + 'static,
{
    let state = PostRoutes { service, identity };
    Router::new()
        .route(
            "/api/tuition-posts",
            get(list_handler::<P, U, S, E>).post(create_handler::<P, U, S, E>),
        )
        .route("/api/tuition-posts/my/posts", get(my_posts_handler::<P, U, S, E>))
        .route(
            "/api/tuition-posts/my/applications",
            get(my_applications_handler::<P, U, S, E>),
        )
        .route(
            "/api/tuition-posts/:id",
            get(get_handler::<P, U, S, E>).put(update_handler::<P, U, S, E>),
        )
        .route(
            "/api/tuition-posts/:id/apply",
            post(apply_handler::<P, U, S, E>),
        )
        .route(
            "/api/tuition-posts/:id/withdraw",
            post(withdraw_handler::<P, U, S, E>),
        )
        .route(
            "/api/tuition-posts/:post_id/applications/:application_id",
            put(application_status_handler::<P, U, S, E>),
        )
        .with_state(state)
}

fn parse_post_id(raw: &str) -> Result<PostId, MarketplaceError> {
    Uuid::parse_str(raw)
        .map(PostId)
        .map_err(|_| MarketplaceError::NotFound("tuition post"))
}

fn parse_application_id(raw: &str) -> Result<ApplicationId, MarketplaceError> {
    Uuid::parse_str(raw)
        .map(ApplicationId)
        .map_err(|_| MarketplaceError::NotFound("application"))
}

async fn list_handler<P, U, S, E>(
    State(routes): State<PostRoutes<P, U, S, E>>,
    Query(query): Query<PostQuery>,
) -> Result<Response, MarketplaceError>
where
    P: PostRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
    E: EventPublisher + 'static,
{
    let page = routes.service.list_posts(&query)?;
    Ok(Json(page).into_response())
}

async fn get_handler<P, U, S, E>(
    State(routes): State<PostRoutes<P, U, S, E>>,
    Path(id): Path<String>,
) -> Result<Response, MarketplaceError>
where
    P: PostRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
    E: EventPublisher + 'static,
{
    let view = routes.service.get_post(parse_post_id(&id)?)?;
    Ok(Json(view).into_response())
}

async fn create_handler<P, U, S, E>(
    State(routes): State<PostRoutes<P, U, S, E>>,
    headers: HeaderMap,
    Json(new_post): Json<NewTuitionPost>,
) -> Result<Response, MarketplaceError>
where
    P: PostRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
    E: EventPublisher + 'static,
{
    let identity = routes.identity.authenticate(bearer_token(&headers)?)?;
    let view = routes.service.create_post(identity, new_post)?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn update_handler<P, U, S, E>(
    State(routes): State<PostRoutes<P, U, S, E>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<UpdateTuitionPost>,
) -> Result<Response, MarketplaceError>
where
    P: PostRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
    E: EventPublisher + 'static,
{
    let identity = routes.identity.authenticate(bearer_token(&headers)?)?;
    let view = routes
        .service
        .update_post(identity, parse_post_id(&id)?, update)?;
    Ok(Json(view).into_response())
}

async fn apply_handler<P, U, S, E>(
    State(routes): State<PostRoutes<P, U, S, E>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ApplicationRequest>,
) -> Result<Response, MarketplaceError>
where
    P: PostRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
    E: EventPublisher + 'static,
{
    let identity = routes.identity.authenticate(bearer_token(&headers)?)?;
    let view = routes
        .service
        .apply(identity, parse_post_id(&id)?, request)?;
    Ok(Json(view).into_response())
}

async fn withdraw_handler<P, U, S, E>(
    State(routes): State<PostRoutes<P, U, S, E>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    P: PostRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
    E: EventPublisher + 'static,
{
    let identity = routes.identity.authenticate(bearer_token(&headers)?)?;
    let view = routes
        .service
        .withdraw_application(identity, parse_post_id(&id)?)?;
    Ok(Json(view).into_response())
}

async fn application_status_handler<P, U, S, E>(
    State(routes): State<PostRoutes<P, U, S, E>>,
    Path((post_id, application_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Response, MarketplaceError>
where
    P: PostRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
    E: EventPublisher + 'static,
{
    let identity = routes.identity.authenticate(bearer_token(&headers)?)?;
    let view = routes.service.update_application_status(
        identity,
        parse_post_id(&post_id)?,
        parse_application_id(&application_id)?,
        request.status,
    )?;
    Ok(Json(view).into_response())
}

async fn my_posts_handler<P, U, S, E>(
    State(routes): State<PostRoutes<P, U, S, E>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    P: PostRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
    E: EventPublisher + 'static,
{
    let identity = routes.identity.authenticate(bearer_token(&headers)?)?;
    let views = routes.service.my_posts(identity)?;
    Ok(Json(views).into_response())
}

async fn my_applications_handler<P, U, S, E>(
    State(routes): State<PostRoutes<P, U, S, E>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    P: PostRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
    E: EventPublisher + 'static,
{
    let identity = routes.identity.authenticate(bearer_token(&headers)?)?;
    let views = routes.service.my_applications(identity)?;
    Ok(Json(views).into_response())
}
