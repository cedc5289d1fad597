use crate::cli::ServeArgs;
use crate::infra::{open_repository, AppState};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hr_portal::config::AppConfig;
use hr_portal::error::AppError;
use hr_portal::hiring::{portal_router, HiringPortal, PortalState, ResumeBackend, SessionManager};
use hr_portal::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(open_repository(&config).await?);
    let resumes = Arc::new(ResumeBackend::from_config(&config.storage.backend).await?);
    let portal = Arc::new(HiringPortal::new(repository, resumes));
    if let Some(admin) = &config.bootstrap_admin {
        portal.ensure_admin(&admin.email, &admin.password).await?;
    }
    let state = PortalState::new(portal, SessionManager::new(&config.session));

    let app = with_operational_routes(portal_router(state, config.storage.max_resume_bytes))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, storage = ?config.storage.backend, "hr portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
