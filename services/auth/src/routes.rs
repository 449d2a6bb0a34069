//! Authentication routes

use std::net::SocketAddr;

use axum::{
    Extension, Json, Router,
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::{IntoResponse, Redirect},
    routing::{get, patch, post},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    AuthState,
    error::{AuthError, AuthResult},
    extract::{client_ip, session_token},
    middleware::{require_admin, require_user},
    models::{LoginCredentials, NewUser, Role, User},
    repositories::user::{verify_dummy_password, verify_password},
    validation::{normalize_email, validate_email, validate_name, validate_password},
};

/// One-Tap sign-in payload
#[derive(Deserialize)]
pub struct OneTapRequest {
    pub credential: String,
}

/// Query string Google sends to the callback
#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Role change requested from the admin console
#[derive(Deserialize)]
pub struct RoleUpdate {
    pub role: String,
}

/// Create the router for the authentication endpoints
pub fn create_router(state: AuthState) -> Router {
    let signed_in = Router::new()
        .route("/api/me", get(me))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    Router::new()
        .route("/api/users", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/google-one-tap", post(google_one_tap))
        .route("/api/auth/google", get(google_start))
        .route("/api/auth/callback/google", get(google_callback))
        .route("/api/logout", post(logout))
        .merge(signed_in)
        .with_state(state)
}

/// Admin console user management, guarded by [`require_admin`]
pub fn admin_router(state: AuthState) -> Router {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route(
            "/api/admin/users/:id",
            get(get_user).patch(update_user_role).delete(delete_user),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .with_state(state)
}

/// Credential signup
pub async fn signup(
    State(state): State<AuthState>,
    WithRejection(Json(payload), _): WithRejection<Json<NewUser>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    let email = normalize_email(&payload.email);
    validate_email(&email).map_err(AuthError::Validation)?;
    validate_password(&payload.password).map_err(AuthError::Validation)?;

    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    if let Some(name) = name {
        validate_name(name).map_err(AuthError::Validation)?;
    }

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AuthError::UserExists);
    }

    let user = state
        .users
        .create_with_password(&email, name, &payload.password, Role::User)
        .await
        .map_err(|e| match e.downcast_ref::<sqlx::Error>() {
            Some(db_err) if common::error::is_unique_violation(db_err) => AuthError::UserExists,
            _ => AuthError::Internal(e),
        })?;

    info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

/// Credential login
pub async fn login(
    State(state): State<AuthState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    WithRejection(Json(payload), _): WithRejection<Json<LoginCredentials>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    let key = client_ip(
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        &state.trusted_proxies,
    )
    .unwrap_or_else(|| "unknown".to_string());

    if !state.rate_limiter.is_allowed(&key).await {
        warn!("Login rate limit hit for {}", key);
        return Err(AuthError::RateLimited);
    }

    let email = normalize_email(&payload.email);
    let user = state.users.find_by_email(&email).await?;

    // Unknown emails and provider-only accounts pay for a hash check too.
    let Some(user) = user.filter(|u| u.password_hash.is_some()) else {
        verify_dummy_password(&payload.password);
        return Err(AuthError::InvalidCredentials);
    };
    let hash = user.password_hash.as_deref().unwrap_or_default();
    if !verify_password(hash, &payload.password)? {
        return Err(AuthError::InvalidCredentials);
    }

    state.rate_limiter.reset(&key).await;
    let session = state.sessions.create_session(&user).await?;

    Ok((
        [(header::SET_COOKIE, state.cookies.session_cookie(&session.token))],
        Json(json!({ "user": user, "expires_at": session.expires_at })),
    ))
}

/// Google One-Tap sign-in
pub async fn google_one_tap(
    State(state): State<AuthState>,
    WithRejection(Json(payload), _): WithRejection<Json<OneTapRequest>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    let google = state.google.as_ref().ok_or(AuthError::ProviderUnavailable)?;

    if payload.credential.trim().is_empty() {
        return Err(AuthError::Validation("Missing credential".to_string()));
    }

    let profile = google.one_tap.verify(payload.credential.trim()).await?;
    let (user, session) = state.sessions.sign_in_with_provider(&profile).await?;

    Ok((
        [(header::SET_COOKIE, state.cookies.session_cookie(&session.token))],
        Json(json!({ "user": user })),
    ))
}

/// Redirect to Google's consent screen
pub async fn google_start(State(state): State<AuthState>) -> AuthResult<Redirect> {
    let google = state.google.as_ref().ok_or(AuthError::ProviderUnavailable)?;
    let url = google.oauth.authorize_url().await?;
    Ok(Redirect::to(&url))
}

/// Google redirect target
pub async fn google_callback(
    State(state): State<AuthState>,
    WithRejection(Query(query), _): WithRejection<Query<CallbackQuery>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    let google = state.google.as_ref().ok_or(AuthError::ProviderUnavailable)?;

    if let Some(reason) = query.error {
        warn!("Google sign-in was not completed: {}", reason);
        return Err(AuthError::InvalidToken(reason));
    }

    let (code, csrf_state) = match (query.code, query.state) {
        (Some(code), Some(csrf_state)) => (code, csrf_state),
        _ => return Err(AuthError::Validation("Missing code or state".to_string())),
    };

    let profile = google.oauth.exchange(&code, &csrf_state).await?;
    let (_user, session) = state.sessions.sign_in_with_provider(&profile).await?;

    Ok((
        [(header::SET_COOKIE, state.cookies.session_cookie(&session.token))],
        Redirect::to(&google.app_url),
    ))
}

/// Current user
pub async fn me(Extension(user): Extension<User>) -> impl IntoResponse {
    Json(json!({ "user": user }))
}

/// Logout; always clears the cookie
pub async fn logout(State(state): State<AuthState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.sessions.revoke(&token).await {
            error!("Failed to revoke session: {}", e);
        }
    }

    (
        [(header::SET_COOKIE, state.cookies.clear_cookie())],
        Json(json!({ "success": true })),
    )
}

/// All users, newest first
pub async fn list_users(State(state): State<AuthState>) -> AuthResult<impl IntoResponse> {
    let users = state.users.list().await?;
    Ok(Json(users))
}

/// One user by id
pub async fn get_user(
    State(state): State<AuthState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    Ok(Json(user))
}

/// Assign a role
pub async fn update_user_role(
    State(state): State<AuthState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AuthError>,
    WithRejection(Json(payload), _): WithRejection<Json<RoleUpdate>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    let role: Role = payload.role.parse().map_err(AuthError::Validation)?;

    let user = state
        .users
        .update_role(id, role)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(user))
}

/// Delete a user together with their accounts and sessions
pub async fn delete_user(
    State(state): State<AuthState>,
    Extension(admin): Extension<User>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    if admin.id == id {
        return Err(AuthError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }

    if !state.users.delete(id).await? {
        return Err(AuthError::UserNotFound);
    }

    info!("Admin {} deleted user {}", admin.id, id);
    Ok(Json(json!({ "success": true })))
}
