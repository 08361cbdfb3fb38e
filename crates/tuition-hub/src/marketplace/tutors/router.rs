use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::marketplace::error::MarketplaceError;
use crate::marketplace::identity::{bearer_token, IdentityService, SessionStore, UserRepository};

use super::domain::TutorProfileId;
use super::repository::TutorRepository;
use super::service::{
    NewTutorProfile, ReviewRequest, TutorQuery, TutorService, UpdateTutorProfile,
};

/// Shared handler state for the tutor endpoints.
pub struct TutorRoutes<T, U, S> {
    service: Arc<TutorService<T, U>>,
    identity: Arc<IdentityService<U, S>>,
}

impl<T, U, S> Clone for TutorRoutes<T, U, S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            identity: self.identity.clone(),
        }
    }
}

/// Router builder exposing the tutor profile endpoints.
pub fn tutor_router<T, U, S>(
    service: Arc<TutorService<T, U>>,
    identity: Arc<IdentityService<U, S>>,
) -> Router
where
    T: TutorRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let state = TutorRoutes { service, identity };
    Router::new()
        .route(
            "/api/tutors",
            get(list_handler::<T, U, S>).post(create_handler::<T, U, S>),
        )
        .route("/api/tutors/my/profile", get(my_profile_handler::<T, U, S>))
        .route(
            "/api/tutors/:id",
            get(get_handler::<T, U, S>).put(update_handler::<T, U, S>),
        )
        .route("/api/tutors/:id/reviews", post(review_handler::<T, U, S>))
        .with_state(state)
}

fn parse_profile_id(raw: &str) -> Result<TutorProfileId, MarketplaceError> {
    Uuid::parse_str(raw)
        .map(TutorProfileId)
        .map_err(|_| MarketplaceError::NotFound("tutor"))
}

async fn list_handler<T, U, S>(
    State(routes): State<TutorRoutes<T, U, S>>,
    Query(query): Query<TutorQuery>,
) -> Result<Response, MarketplaceError>
where
    T: TutorRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let views = routes.service.list_profiles(&query)?;
    Ok(Json(views).into_response())
}

async fn get_handler<T, U, S>(
    State(routes): State<TutorRoutes<T, U, S>>,
    Path(id): Path<String>,
) -> Result<Response, MarketplaceError>
where
    T: TutorRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let view = routes.service.get_profile(parse_profile_id(&id)?)?;
    Ok(Json(view).into_response())
}

async fn create_handler<T, U, S>(
    State(routes): State<TutorRoutes<T, U, S>>,
    headers: HeaderMap,
    Json(new_profile): Json<NewTutorProfile>,
) -> Result<Response, MarketplaceError>
where
    T: TutorRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let identity = routes.identity.authenticate(bearer_token(&headers)?)?;
    let view = routes.service.create_profile(identity, new_profile)?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn update_handler<T, U, S>(
    State(routes): State<TutorRoutes<T, U, S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<UpdateTutorProfile>,
) -> Result<Response, MarketplaceError>
where
    T: TutorRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let identity = routes.identity.authenticate(bearer_token(&headers)?)?;
    let view = routes
        .service
        .update_profile(identity, parse_profile_id(&id)?, update)?;
    Ok(Json(view).into_response())
}

async fn review_handler<T, U, S>(
    State(routes): State<TutorRoutes<T, U, S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ReviewRequest>,
) -> Result<Response, MarketplaceError>
where
    T: TutorRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let identity = routes.identity.authenticate(bearer_token(&headers)?)?;
    let view = routes
        .service
        .add_review(identity, parse_profile_id(&id)?, request)?;
    Ok(Json(view).into_response())
}

async fn my_profile_handler<T, U, S>(
    State(routes): State<TutorRoutes<T, U, S>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    T: TutorRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let identity = routes.identity.authenticate(bearer_token(&headers)?)?;
    let view = routes.service.my_profile(identity)?;
    Ok(Json(view).into_response())
}
