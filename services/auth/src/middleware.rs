//! Session guards for protected routes
//!
//! Both guards put the resolved [`User`] into the request extensions, so
//! handlers behind them take it with `Extension<User>`.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{
    AuthState,
    error::{AuthError, AuthResult},
    extract::session_token,
    models::User,
};

async fn resolve_user(state: &AuthState, token: Option<String>) -> AuthResult<User> {
    let token = token.ok_or(AuthError::Unauthorized)?;
    state.sessions.authenticate(&token).await
}

/// Require a signed-in user
pub async fn require_user(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> AuthResult<Response> {
    let token = session_token(req.headers());
    let user = resolve_user(&state, token).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Require a signed-in admin
pub async fn require_admin(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> AuthResult<Response> {
    let token = session_token(req.headers());
    let user = resolve_user(&state, token).await?;

    if !user.role.is_admin() {
        warn!(
            "User {} denied access to {} {}",
            user.id,
            req.method(),
            req.uri().path()
        );
        return Err(AuthError::Forbidden);
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
