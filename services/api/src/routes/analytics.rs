//! Page-view beacon and the admin dashboard

use std::net::SocketAddr;

use auth::extract::client_ip;
use axum::{
    Json,
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::{
        TrackRequest,
        analytics::{AnalyticsQuery, NewPageView, is_trackable, normalize_path},
    },
};

/// Record a page view. Admin and API paths are acknowledged but not stored.
pub async fn track(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    WithRejection(Json(payload), _): WithRejection<Json<TrackRequest>, ApiError>,
) -> ApiResult<StatusCode> {
    let path = normalize_path(&payload.path);
    if path.is_empty() {
        return Err(ApiError::BadRequest("Path is required".to_string()));
    }
    if !is_trackable(&path) {
        return Ok(StatusCode::NO_CONTENT);
    }

    let user = state.auth.optional_user(&headers).await;
    let view = NewPageView {
        path,
        user_id: user.as_ref().map(|u| u.id),
        user_role: user.as_ref().map(|u| u.role.as_str().to_string()),
        ip: client_ip(
            &headers,
            peer.map(|ConnectInfo(addr)| addr),
            &state.auth.trusted_proxies,
        ),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    state.analytics_repository.record(&view).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Aggregates for the admin dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<AnalyticsQuery>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let dashboard = state
        .analytics_repository
        .dashboard(Utc::now().date_naive(), query.days())
        .await?;
    Ok(Json(dashboard))
}
