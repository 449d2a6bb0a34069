//! API service routes

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde_json::json;

use crate::{AppState, middleware::log_requests};

pub mod analytics;
pub mod media;
pub mod properties;
pub mod testimonials;

/// Create the router for the API service
///
/// Public catalog routes, the admin console behind `require_admin`, and the
/// authentication routes from the `auth` crate.
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/api/admin/properties",
            get(properties::admin_list).post(properties::create),
        )
        .route(
            "/api/admin/properties/:id",
            get(properties::admin_get)
                .put(properties::update)
                .delete(properties::delete),
        )
        .route(
            "/api/admin/properties/:id/featured",
            patch(properties::set_featured),
        )
        .route("/api/admin/testimonials", get(testimonials::admin_list))
        .route(
            "/api/admin/testimonials/:id",
            get(testimonials::admin_get)
                .patch(testimonials::set_approved)
                .delete(testimonials::delete),
        )
        .route("/api/admin/analytics", get(analytics::dashboard))
        .route(
            "/api/upload",
            post(media::upload).layer(DefaultBodyLimit::max(state.settings.upload_limit_bytes)),
        )
        .route("/api/delete", post(media::delete))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth::middleware::require_admin,
        ));

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/properties", get(properties::list))
        .route("/api/properties/:id", get(properties::get))
        .route(
            "/api/testimonials",
            get(testimonials::list).post(testimonials::create),
        )
        .route("/api/track", post(analytics::track));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state.clone())
        .merge(auth::routes::create_router(state.auth.clone()))
        .merge(auth::routes::admin_router(state.auth))
        .layer(middleware::from_fn(log_requests))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);
    let redis = state.redis.health_check().await.unwrap_or(false);

    Json(json!({
        "status": "ok",
        "service": "api",
        "database": database,
        "redis": redis,
        "media": state.media.is_some(),
        "google": state.auth.google.is_some(),
    }))
}
