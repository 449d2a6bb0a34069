//! Testimonial submission, listing and moderation

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::testimonial::{ApprovalUpdate, NewTestimonial},
};

fn not_found() -> ApiError {
    ApiError::NotFound("Testimonial not found".to_string())
}

/// Public submission
pub async fn create(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<NewTestimonial>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let new = payload.validate().map_err(ApiError::BadRequest)?;
    let testimonial = state.testimonial_repository.create(&new).await?;
    Ok((StatusCode::CREATED, Json(testimonial)))
}

/// Approved testimonials, newest first
pub async fn list(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let testimonials = state.testimonial_repository.list(false).await?;
    Ok(Json(testimonials))
}

pub async fn admin_list(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let testimonials = state.testimonial_repository.list(true).await?;
    Ok(Json(testimonials))
}

pub async fn admin_get(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let testimonial = state
        .testimonial_repository
        .find_by_id(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(testimonial))
}

pub async fn set_approved(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<ApprovalUpdate>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let testimonial = state
        .testimonial_repository
        .set_approved(id, payload.approved)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(testimonial))
}

pub async fn delete(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    if !state.testimonial_repository.delete(id).await? {
        return Err(not_found());
    }
    Ok(Json(json!({ "success": true })))
}
