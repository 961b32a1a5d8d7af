use axum::{extract::State, routing::get, Json, Router};
use tracing::{instrument, warn};

use crate::auth::jwt::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::dto::{
    PreferencesResponse, ProfileResponse, ProfileUser, UpdatePreferencesRequest,
    UpdatePreferencesResponse, UpdateProfileRequest,
};
use crate::users::services;

const MAX_PREFERENCE_IDS: usize = 50;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/me/preferences",
            get(get_preferences).put(put_preferences),
        )
        .route("/users/me/profile", get(get_profile).put(put_profile))
}

#[instrument(skip(state))]
pub async fn get_preferences(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let result = services::get_preferences(state.users.as_ref(), user_id).await?;
    Ok(Json(PreferencesResponse {
        preferences: result.preferences,
        total_count: result.total_count,
    }))
}

#[instrument(skip(state, payload))]
pub async fn put_preferences(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdatePreferencesRequest>,
) -> Result<Json<UpdatePreferencesResponse>, ApiError> {
    if payload.category_ids.len() > MAX_PREFERENCE_IDS {
        warn!(count = payload.category_ids.len(), "too many category ids");
        return Err(ApiError::Validation(format!(
            "At most {MAX_PREFERENCE_IDS} category IDs are allowed"
        )));
    }

    let updated = services::update_preferences(
        state.users.as_ref(),
        state.categories.as_ref(),
        user_id,
        &payload.category_ids,
    )
    .await?;

    Ok(Json(UpdatePreferencesResponse {
        success: true,
        updated_preferences: updated,
    }))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = services::get_profile(state.users.as_ref(), user_id).await?;
    Ok(Json(profile_response(profile)))
}

#[instrument(skip(state, payload))]
pub async fn put_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = services::update_profile(state.users.as_ref(), user_id, &payload.name).await?;
    Ok(Json(profile_response(profile)))
}

fn profile_response(profile: services::Profile) -> ProfileResponse {
    ProfileResponse {
        user: ProfileUser {
            id: profile.user.id,
            name: profile.user.name,
            email: profile.user.email,
            created_at: profile.user.created_at,
        },
        preferences: profile.preferences,
    }
}
