//! services/api/src/web/users.rs
//!
//! User profile and UI preference endpoints.

use crate::error::ApiError;
use crate::web::protocol::{
    CreateUserRequest, PreferencesResponse, UpdatePreferencesRequest, UserResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use lireon_core::domain::{Goals, Preference};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// POST /users - Create a user profile with optional page goals
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Empty display name")
    )
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let display_name = req.display_name.trim();
    if display_name.is_empty() {
        return Err(ApiError::BadRequest("display_name must not be empty".to_string()));
    }

    let user = state
        .db
        .create_user(
            display_name,
            Goals {
                daily: req.daily_goal,
                weekly: req.weekly_goal,
                monthly: req.monthly_goal,
            },
        )
        .await?;
    info!("User {} created", user.user_id);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /user/me - The caller's profile and lifetime page count
#[utoipa::path(
    get,
    path = "/user/me",
    responses((status = 200, description = "The caller", body = UserResponse)),
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user."))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.db.get_user(user_id).await?;
    Ok(Json(user.into()))
}

/// GET /user/preferences - The caller's UI flags
#[utoipa::path(
    get,
    path = "/user/preferences",
    responses((status = 200, description = "UI flags", body = PreferencesResponse)),
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user."))
)]
pub async fn get_preferences_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    Ok(Json(load_preferences(&state, user_id).await?))
}

/// PATCH /user/preferences - Set or reset UI flags
#[utoipa::path(
    patch,
    path = "/user/preferences",
    request_body = UpdatePreferencesRequest,
    responses((status = 200, description = "UI flags after the update", body = PreferencesResponse)),
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user."))
)]
pub async fn update_preferences_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<UpdatePreferencesRequest>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let updates = [
        (Preference::TutorialSeen, req.tutorial_seen),
        (Preference::WelcomeDismissed, req.welcome_dismissed),
    ];
    for (preference, value) in updates {
        if let Some(value) = value {
            state
                .preferences
                .set_preference(user_id, preference, value)
                .await?;
        }
    }
    Ok(Json(load_preferences(&state, user_id).await?))
}

async fn load_preferences(state: &AppState, user_id: Uuid) -> Result<PreferencesResponse, ApiError> {
    let prefs = &state.preferences;
    Ok(PreferencesResponse {
        tutorial_seen: prefs.get_preference(user_id, Preference::TutorialSeen).await?,
        welcome_dismissed: prefs
            .get_preference(user_id, Preference::WelcomeDismissed)
            .await?,
    })
}
