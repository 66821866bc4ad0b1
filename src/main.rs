//! Event admission engine
//!
//! Service entry point: loads configuration, prepares the database and
//! verifies that the admission coordinator can be assembled.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use event_admission::{
    admission::{AdmissionCoordinator, SystemClock},
    config::Settings,
    database::{create_pool, health_check, run_migrations, DatabaseService},
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", event_admission::info());

    // Initialize database connection
    info!("Connecting to database...");
    let db_pool = create_pool(&settings.database).await?;

    run_migrations(&db_pool).await?;
    health_check(&db_pool).await.context("database health check failed")?;

    let database_service = Arc::new(DatabaseService::new(db_pool));
    let coordinator = AdmissionCoordinator::new(
        database_service.clone(),
        database_service,
        Arc::new(SystemClock),
        settings.admission.clone(),
    )?;

    info!(
        lock_timeout_ms = settings.admission.lock_timeout_ms,
        default_token_expiry_hours = settings.admission.default_token_expiry_hours,
        ?coordinator,
        "Admission coordinator ready"
    );

    Ok(())
}
