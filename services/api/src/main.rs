use anyhow::Result;
use api::{configuration::get_configuration, startup};
use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    let settings = get_configuration()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    let listener = TcpListener::bind(settings.address()).await?;
    let state = startup::build_state(settings, pool)?;

    if let Err(e) = state.auth.sessions.cleanup_expired_sessions().await {
        warn!("Failed to remove expired sessions: {}", e);
    }

    info!("API service initialized successfully");
    startup::run(listener, state).await
}
