use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use tuition_hub::marketplace::identity::{
    identity_router, IdentityService, SessionStore, UserRepository,
};
use tuition_hub::marketplace::posts::{post_router, PostRepository, TuitionPostService};
use tuition_hub::marketplace::tutors::{tutor_router, TutorRepository, TutorService};
use tuition_hub::realtime::{relay_router, RoomRelay};

use crate::infra::AppState;

/// Compose the marketplace routers with the operational endpoints.
pub(crate) fn marketplace_router<P, T, U, S>(
    identity: Arc<IdentityService<U, S>>,
    posts: Arc<TuitionPostService<P, U, RoomRelay>>,
    tutors: Arc<TutorService<T, U>>,
    relay: Arc<RoomRelay>,
) -> Router
where
    P: PostRepository + 'static,
    T: TutorRepository + 'static,
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    identity_router(identity.clone())
        .merge(post_router(posts, identity.clone()))
        .merge(tutor_router(tutors, identity))
        .merge(relay_router(relay))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{
        InMemoryPostRepository, InMemorySessionStore, InMemoryTutorRepository,
        InMemoryUserRepository,
    };
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let users = Arc::new(InMemoryUserRepository::default());
        let sessions = Arc::new(InMemorySessionStore::default());
        let posts = Arc::new(InMemoryPostRepository::default());
        let tutors = Arc::new(InMemoryTutorRepository::default());
        let relay = Arc::new(RoomRelay::new());

        let identity = Arc::new(IdentityService::new(users.clone(), sessions, 72));
        let post_service = Arc::new(TuitionPostService::new(
            posts,
            users.clone(),
            relay.clone(),
            30,
        ));
        let tutor_service = Arc::new(TutorService::new(tutors, users));

        marketplace_router(identity, post_service, tutor_service, relay)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("request handled");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    async fn register(app: &Router, name: &str, email: &str, role: &str) -> String {
        let (status, body) = send(
            app,
            json_request(
                "POST",
                "/api/auth/register",
                None,
                json!({
                    "name": name,
                    "email": email,
                    "password": "hunter22",
                    "role": role,
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().expect("session token").to_string()
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let app = test_app();
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("request builds");
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn registered_token_resolves_on_me() {
        let app = test_app();
        let token = register(&app, "Amina", "amina@example.com", "guardian").await;

        let request = Request::builder()
            .method("GET")
            .uri("/api/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request builds");
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "guardian");
        assert_eq!(body["email"], "amina@example.com");
    }

    #[tokio::test]
    async fn application_round_trip_over_http() {
        let app = test_app();
        let guardian = register(&app, "Amina", "amina@example.com", "guardian").await;
        let tutor = register(&app, "Tanvir", "tanvir@example.com", "tutor").await;

        let (status, post) = send(
            &app,
            json_request(
                "POST",
                "/api/tuition-posts",
                Some(&guardian),
                json!({
                    "title": "Algebra tutor needed",
                    "description": "Twice a week after school.",
                    "subjects": [{ "name": "Mathematics", "level": "high" }],
                    "budget": { "min": 20, "max": 40 },
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let post_id = post["id"].as_str().expect("post id").to_string();

        let (status, applied) = send(
            &app,
            json_request(
                "POST",
                &format!("/api/tuition-posts/{post_id}/apply"),
                Some(&tutor),
                json!({ "cover_letter": "I teach algebra.", "proposed_rate": 25 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let application_id = applied["applications"][0]["id"]
            .as_str()
            .expect("application id")
            .to_string();

        let (status, resolved) = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/tuition-posts/{post_id}/applications/{application_id}"),
                Some(&guardian),
                json!({ "status": "accepted" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resolved["status"], "filled");
        assert_eq!(resolved["applications"][0]["status"], "accepted");
        assert_eq!(
            resolved["selected_tutor"]["name"].as_str(),
            Some("Tanvir")
        );
    }

    #[tokio::test]
    async fn unauthenticated_post_creation_is_refused() {
        let app = test_app();
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/tuition-posts",
                None,
                json!({
                    "title": "Algebra tutor needed",
                    "description": "Twice a week.",
                    "subjects": [{ "name": "Mathematics", "level": "high" }],
                    "budget": { "min": 20, "max": 40 },
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["message"].is_string());
    }
}
