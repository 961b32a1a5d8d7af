use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::auth::dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest};
use crate::auth::jwt::JwtKeys;
use crate::auth::services::{self, is_valid_email, AuthOutcome};
use crate::error::ApiError;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

fn auth_response(outcome: AuthOutcome) -> Json<AuthResponse> {
    Json(AuthResponse {
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        user: outcome.user.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if payload.name.trim().is_empty() {
        return Err(ApiError::EmptyName);
    }

    let keys = JwtKeys::from_ref(&state);
    let outcome = services::register(
        state.users.as_ref(),
        &keys,
        &email,
        &payload.name,
        &payload.password,
    )
    .await?;
    Ok((StatusCode::CREATED, auth_response(outcome)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let outcome =
        services::authenticate(state.users.as_ref(), &keys, &email, &payload.password).await?;
    Ok(auth_response(outcome))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let outcome = services::refresh(state.users.as_ref(), &keys, &payload.refresh_token).await?;
    Ok(auth_response(outcome))
}
