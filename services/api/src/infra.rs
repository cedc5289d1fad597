use hr_portal::config::AppConfig;
use hr_portal::db;
use hr_portal::error::AppError;
use hr_portal::hiring::SqliteRepository;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Connect to the configured database and bring its schema up to date.
pub(crate) async fn open_repository(config: &AppConfig) -> Result<SqliteRepository, AppError> {
    let pool = db::connect(&config.database).await?;
    db::migrate(&pool).await?;
    Ok(SqliteRepository::new(pool))
}
