use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::extractors::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::dto::{ChangePasswordRequest, UpdateProfileRequest};
use crate::users::repo_types::{ProfileUpdate, PublicUser, UserRole};

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    Ok(Json(state.users.list_all().await?))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .users
        .update_profile(
            id,
            ProfileUpdate {
                display_name: payload.display_name,
                phone: payload.phone,
                avatar: payload.avatar,
            },
        )
        .await?;
    info!(user_id = %id, "profile updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    if payload.password.len() < 8 {
        return Err(ApiError::validation(
            "password",
            "password must be at least 8 characters",
        ));
    }

    // non-admins may only change their own credential
    if caller.id != id && caller.role != UserRole::Admin {
        warn!(caller_id = %caller.id, target_id = %id, "password change on another account denied");
        return Err(ApiError::Forbidden);
    }

    state.users.change_password(id, &payload.password).await?;
    info!(user_id = %id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.users.deactivate(id).await?;
    info!(user_id = %id, "user deactivated");
    Ok(StatusCode::NO_CONTENT)
}
