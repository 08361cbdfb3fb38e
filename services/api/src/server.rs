use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;
use tuition_hub::config::AppConfig;
use tuition_hub::error::AppError;
use tuition_hub::marketplace::identity::IdentityService;
use tuition_hub::marketplace::posts::TuitionPostService;
use tuition_hub::marketplace::tutors::TutorService;
use tuition_hub::realtime::RoomRelay;
use tuition_hub::telemetry;

use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryPostRepository, InMemorySessionStore, InMemoryTutorRepository,
    InMemoryUserRepository,
};
use crate::routes::marketplace_router;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let users = Arc::new(InMemoryUserRepository::default());
    let sessions = Arc::new(InMemorySessionStore::default());
    let posts = Arc::new(InMemoryPostRepository::default());
    let tutors = Arc::new(InMemoryTutorRepository::default());
    let relay = Arc::new(RoomRelay::new());

    let identity = Arc::new(IdentityService::new(
        users.clone(),
        sessions,
        config.marketplace.session_ttl_hours,
    ));
    let post_service = Arc::new(TuitionPostService::new(
        posts,
        users.clone(),
        relay.clone(),
        config.marketplace.post_expiry_days,
    ));
    let tutor_service = Arc::new(TutorService::new(tutors, users));

    let app = marketplace_router(identity, post_service, tutor_service, relay)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "tuition marketplace api ready");

    axum::serve(listener, app).await?;
    Ok(())
}
