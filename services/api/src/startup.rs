//! Wiring of the application state and the HTTP server

use std::net::SocketAddr;

use anyhow::Result;
use auth::{
    AuthState,
    extract::{CookieSettings, TrustedProxies},
    google::GoogleConfig,
    jwt::{JwtConfig, JwtService},
};
use common::cache::{RedisConfig, RedisPool};
use media::{CloudinaryClient, CloudinaryConfig};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{configuration::Settings, routes::create_router, state::AppState};

/// Build the application state from the environment.
///
/// Google sign-in and media uploads are optional: without their
/// configuration the corresponding routes answer with an error.
pub fn build_state(settings: Settings, pool: PgPool) -> Result<AppState> {
    let jwt_service = JwtService::new(&JwtConfig::from_env()?);
    let redis = RedisPool::new(&RedisConfig::from_env())?;

    let auth = AuthState::new(
        pool.clone(),
        jwt_service,
        redis.clone(),
        GoogleConfig::from_env(),
        CookieSettings::secure_from_env(),
    )?
    .with_trusted_proxies(TrustedProxies::from_env());

    let media = match CloudinaryConfig::from_env() {
        Ok(config) => {
            info!("Media uploads go to Cloudinary cloud {}", config.cloud_name);
            Some(CloudinaryClient::new(config)?)
        }
        Err(e) => {
            warn!("Media uploads disabled: {}", e);
            None
        }
    };

    Ok(AppState::new(pool, redis, settings, auth, media))
}

/// Serve the application on `listener` until the process stops
pub async fn run(listener: TcpListener, state: AppState) -> Result<()> {
    let app = create_router(state);

    info!("API service listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
