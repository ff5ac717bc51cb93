use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::auth::dto::{
    AuthResponse, HealthResponse, LoginRequest, LogoutResponse, MeResponse, RegisterRequest,
};
use crate::auth::extractors::MaybeAuthUser;
use crate::auth::jwt::JwtKeys;
use crate::auth::services::{self, is_valid_email};
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo_types::NewUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/health", get(health))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("email", "invalid email address"));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::validation(
            "password",
            "password must be at least 8 characters",
        ));
    }

    let user = services::register(
        state.users.as_ref(),
        NewUser {
            email: payload.email,
            password: payload.password,
            display_name: payload.display_name,
            role: payload.role,
            phone: payload.phone,
        },
    )
    .await?;

    let token = JwtKeys::from_ref(&state).sign(&user)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("email", "invalid email address"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("password", "password is required"));
    }

    let user = services::login(state.users.as_ref(), &payload.email, &payload.password).await?;

    let token = JwtKeys::from_ref(&state).sign(&user)?;
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

pub async fn logout() -> Json<LogoutResponse> {
    Json(services::logout())
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    MaybeAuthUser(identity): MaybeAuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    Ok(Json(services::me(state.users.as_ref(), identity).await?))
}

pub async fn health() -> Json<HealthResponse> {
    Json(services::health_check())
}
