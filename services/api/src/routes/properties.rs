//! Listing routes: the public catalog and the admin CRUD

use auth::models::User;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::property::{FeaturedUpdate, NewProperty, PropertyQuery, PropertyStatus},
    routes::media::destroy_all,
};

fn not_found() -> ApiError {
    ApiError::NotFound("Property not found".to_string())
}

/// Public catalog; only active listings
pub async fn list(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<PropertyQuery>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .property_repository
        .list(&query, Some(PropertyStatus::Active))
        .await?;
    Ok(Json(page))
}

/// Public listing detail
pub async fn get(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let property = state
        .property_repository
        .find_by_id(id, Some(PropertyStatus::Active))
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(property))
}

/// Admin listing, any status
pub async fn admin_list(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<PropertyQuery>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let page = state.property_repository.list(&query, None).await?;
    Ok(Json(page))
}

pub async fn admin_get(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let property = state
        .property_repository
        .find_by_id(id, None)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(property))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    WithRejection(Json(payload), _): WithRejection<Json<NewProperty>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let new = payload.validate().map_err(ApiError::BadRequest)?;
    let property = state.property_repository.create(&new, user.id).await?;

    info!("User {} created property {}", user.id, property.id);
    Ok((StatusCode::CREATED, Json(property)))
}

/// Replace a listing; media it no longer references is deleted at the provider
pub async fn update(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<NewProperty>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let new = payload.validate().map_err(ApiError::BadRequest)?;
    let (property, removed) = state
        .property_repository
        .update(id, &new)
        .await?
        .ok_or_else(not_found)?;

    destroy_all(&state, &removed).await;
    Ok(Json(property))
}

pub async fn set_featured(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<FeaturedUpdate>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let property = state
        .property_repository
        .set_featured(id, payload.featured)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(property))
}

/// Delete a listing and its media
pub async fn delete(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let media = state
        .property_repository
        .delete(id)
        .await?
        .ok_or_else(not_found)?;

    destroy_all(&state, &media).await;
    Ok(Json(json!({ "success": true })))
}
