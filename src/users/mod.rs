use axum::{
    middleware,
    routing::{get, patch, post},
    Extension, Router,
};

use crate::auth::guard::{self, RequiredRoles};
use crate::state::AppState;
use crate::users::repo_types::UserRole;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

/// Admin management surface. Required-role sets are declared per route
/// group and enforced by the authorization guard.
pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/users", get(handlers::list_users))
        .route(
            "/users/:id",
            patch(handlers::update_user).delete(handlers::deactivate_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::authorize_request,
        ))
        .route_layer(Extension(RequiredRoles(&[UserRole::Admin])));

    let self_service = Router::new()
        .route("/users/:id/password", post(handlers::change_password))
        .route_layer(middleware::from_fn_with_state(
            state,
            guard::authorize_request,
        ))
        .route_layer(Extension(RequiredRoles(UserRole::ALL)));

    admin.merge(self_service)
}
