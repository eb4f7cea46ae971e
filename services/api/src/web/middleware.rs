//! services/api/src/web/middleware.rs
//!
//! Resolves the calling user for protected routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use lireon_core::ports::PortError;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

/// Header carrying the authenticated user id, set by the auth layer in front
/// of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Middleware that checks the `x-user-id` header names an existing user.
///
/// If valid, inserts the user id into request extensions for handlers to use.
/// A missing, malformed or unknown id is a 401; a storage failure while
/// looking the user up is a 500.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing or malformed {USER_ID_HEADER}")))?;

    state
        .db
        .get_user(user_id)
        .await
        .map_err(|e| lookup_failed(user_id, e))?;

    req.extensions_mut().insert(user_id);

    Ok(next.run(req).await)
}

fn lookup_failed(user_id: Uuid, err: PortError) -> ApiError {
    match err {
        PortError::NotFound(_) => {
            warn!("Rejected request for unknown user {}", user_id);
            ApiError::Unauthorized(format!("unknown user {user_id}"))
        }
        other => ApiError::Port(other),
    }
}
