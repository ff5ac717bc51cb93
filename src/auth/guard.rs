use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::extractors::{bearer_token, CurrentUser};
use crate::auth::jwt::JwtKeys;
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo_types::UserRole;

/// Required-role set declared on a route via
/// `route_layer(Extension(RequiredRoles(...)))`. Routes without the
/// declaration carry no requirement and are allowed unconditionally.
#[derive(Debug, Clone, Copy)]
pub struct RequiredRoles(pub &'static [UserRole]);

/// Pure authorization decision, layered after authentication.
///
/// An absent declaration is the only implicit-allow path; a declared set is
/// always checked, including the empty set (which admits no one).
pub fn authorize(
    required: Option<RequiredRoles>,
    caller: Option<&CurrentUser>,
) -> Result<(), ApiError> {
    let Some(RequiredRoles(required)) = required else {
        return Ok(());
    };

    let Some(caller) = caller else {
        warn!("access attempt without authenticated caller");
        return Err(ApiError::Unauthenticated);
    };

    if required.contains(&caller.role) {
        debug!(user_id = %caller.id, role = %caller.role, "caller authorized");
        Ok(())
    } else {
        warn!(
            user_id = %caller.id,
            email = %caller.email,
            role = %caller.role,
            required = ?required,
            "access denied: insufficient role"
        );
        Err(ApiError::Forbidden)
    }
}

/// Middleware enforcing the route's declared role set.
///
/// Authenticates the bearer token, resolves the live user from the store
/// (a deactivated or deleted account does not count as a caller), runs the
/// role decision, then exposes the caller to handlers via extensions.
pub async fn authorize_request(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let required = req.extensions().get::<RequiredRoles>().copied();
    let caller = resolve_caller(&state, req.headers()).await?;

    authorize(required, caller.as_ref())?;

    if let Some(caller) = caller {
        req.extensions_mut().insert(caller);
    }
    Ok(next.run(req).await)
}

async fn resolve_caller(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<CurrentUser>, ApiError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };

    let keys = JwtKeys::from_config(&state.config.jwt);
    let claims = match keys.verify(token) {
        Ok(claims) => claims,
        Err(_) => {
            warn!("invalid or expired token");
            return Ok(None);
        }
    };

    // The token is only a claim; the account must still exist and be active.
    match state.users.find_by_id(claims.sub).await? {
        Some(user) if user.is_active => Ok(Some(CurrentUser::from(&user))),
        _ => Ok(None),
    }
}
