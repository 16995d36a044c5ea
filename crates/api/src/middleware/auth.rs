//! Admin role middleware.
//!
//! Guards destructive operations (hard delete, draft purge, cache clear) behind the
//! configured admin role asserted in `X-User-Roles`.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;

/// Rejects callers without the admin role.
///
/// The parsed [`Caller`] is stored in request extensions for the handler.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let caller = match Caller::from_headers(req.headers()) {
        Ok(caller) => caller,
        Err(err) => return err.into_response(),
    };

    if !caller.has_role(&state.config.server.admin_role) {
        tracing::warn!(user_id = %caller.user_id, path = %req.uri().path(), "Admin role required");
        return ApiError::access_denied("Admin access required").into_response();
    }

    req.extensions_mut().insert(caller);
    next.run(req).await
}
