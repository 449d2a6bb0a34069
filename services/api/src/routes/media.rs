//! Upload and deletion of listing media

use axum::{
    Json,
    extract::{Multipart, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::DeleteMediaRequest,
};

fn client(state: &AppState) -> ApiResult<&::media::CloudinaryClient> {
    state
        .media
        .as_ref()
        .ok_or(ApiError::Unavailable("Media storage"))
}

/// Upload the multipart field `file` and return its public URL
pub async fn upload(
    State(state): State<AppState>,
    WithRejection(mut multipart, _): WithRejection<Multipart, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let client = client(&state)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let uploaded = client.upload(&bytes, &file_name, &content_type).await?;
        info!("Uploaded {} to {}", file_name, uploaded.url);
        return Ok(Json(uploaded));
    }

    Err(ApiError::BadRequest("No file provided".to_string()))
}

/// Delete an uploaded asset by its URL
pub async fn delete(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<DeleteMediaRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let client = client(&state)?;

    if payload.url.trim().is_empty() {
        return Err(ApiError::BadRequest("URL is required".to_string()));
    }

    client.destroy(payload.url.trim()).await?;
    Ok(Json(json!({ "success": true })))
}

/// Delete each URL at the provider. Failures are logged and skipped.
pub async fn destroy_all(state: &AppState, urls: &[String]) {
    if urls.is_empty() {
        return;
    }

    let Some(client) = state.media.as_ref() else {
        warn!(
            "Media storage not configured; leaving {} files in place",
            urls.len()
        );
        return;
    };

    for url in urls {
        if let Err(e) = client.destroy(url).await {
            warn!("Failed to delete media {}: {}", url, e);
        }
    }
}
