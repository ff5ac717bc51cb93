use lazy_static::lazy_static;
use regex::Regex;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::dto::{HealthResponse, LogoutResponse, MeResponse};
use crate::auth::password;
use crate::error::ApiError;
use crate::users::repo::UserStore;
use crate::users::repo_types::{NewUser, User};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Creates the account. The store's unique constraint is the authoritative
/// duplicate check; the lookup here only gives the common case a friendlier
/// path than a constraint violation.
pub async fn register(store: &dyn UserStore, new_user: NewUser) -> Result<User, ApiError> {
    if store.find_by_email(&new_user.email).await?.is_some() {
        warn!(email = %new_user.email, "email already registered");
        return Err(ApiError::DuplicateEmail);
    }

    let user = store.create(new_user).await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Unknown email and wrong password both surface as `InvalidCredentials`
/// so a caller cannot probe which addresses have accounts. A deactivated
/// account is only reported once the password has verified.
pub async fn login(store: &dyn UserStore, email: &str, password_plain: &str) -> Result<User, ApiError> {
    let Some(user) = store.find_by_email(email).await? else {
        warn!(email = %email, "login with unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    let ok = password::verify_password(password_plain, &user.password_hash)?;
    if !ok {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on deactivated account");
        return Err(ApiError::InactiveAccount);
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(user)
}

/// Stateless acknowledgment. Tokens are short-lived and there is no
/// server-side session to discard.
pub fn logout() -> LogoutResponse {
    info!("logout acknowledged");
    LogoutResponse {
        message: "logout successful".into(),
    }
}

/// Reports authentication state for an already-resolved identity. A missing,
/// unknown or deactivated identity is an unauthenticated answer, not an
/// error; only store failures propagate.
pub async fn me(store: &dyn UserStore, identity: Option<Uuid>) -> Result<MeResponse, ApiError> {
    let Some(id) = identity else {
        return Ok(MeResponse::unauthenticated());
    };

    match store.find_by_id(id).await? {
        Some(user) if user.is_active => Ok(MeResponse {
            authenticated: true,
            user: Some(user.into()),
        }),
        _ => Ok(MeResponse::unauthenticated()),
    }
}

/// Liveness probe; exercises no dependencies.
pub fn health_check() -> HealthResponse {
    HealthResponse {
        status: "ok",
        service: "agendo",
        timestamp: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo::testing::MemoryUserStore;
    use crate::users::repo_types::{PublicUser, UserRole};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password: "longenough1".into(),
            display_name: "A".into(),
            role: None,
            phone: None,
        }
    }

    #[tokio::test]
    async fn register_defaults_role_and_strips_hash_from_view() {
        let store = MemoryUserStore::new();
        let user = register(&store, new_user("a@b.com")).await.expect("register");
        assert_eq!(user.role, UserRole::Client);
        assert!(user.is_active);

        let view = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert!(view.get("password_hash").is_none());
        assert!(view.get("password").is_none());
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        register(&store, new_user("a@b.com")).await.expect("first register");

        let err = register(&store, new_user("a@b.com")).await.unwrap_err();
        assert!(matches!(err, ApiError::DuplicateEmail));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn login_returns_the_registered_user() {
        let store = MemoryUserStore::new();
        let registered = register(&store, new_user("a@b.com")).await.expect("register");

        let user = login(&store, "a@b.com", "longenough1").await.expect("login");
        assert_eq!(user.id, registered.id);
    }

    #[tokio::test]
    async fn login_is_uniform_for_unknown_email_and_wrong_password() {
        let store = MemoryUserStore::new();
        register(&store, new_user("a@b.com")).await.expect("register");

        let unknown = login(&store, "nobody@b.com", "longenough1").await.unwrap_err();
        let wrong = login(&store, "a@b.com", "wrong-password").await.unwrap_err();
        assert!(matches!(unknown, ApiError::InvalidCredentials));
        assert!(matches!(wrong, ApiError::InvalidCredentials));
        // same outward message, no account enumeration
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn deactivated_account_is_rejected_but_row_survives() {
        let store = MemoryUserStore::new();
        let user = register(&store, new_user("a@b.com")).await.expect("register");
        store.deactivate(user.id).await.expect("deactivate");

        let err = login(&store, "a@b.com", "longenough1").await.unwrap_err();
        assert!(matches!(err, ApiError::InactiveAccount));

        let who = me(&store, Some(user.id)).await.expect("me");
        assert!(!who.authenticated);
        assert!(who.user.is_none());

        let row = store.find_by_id(user.id).await.unwrap().expect("row kept");
        assert!(!row.is_active);
    }

    #[tokio::test]
    async fn me_without_identity_reports_unauthenticated() {
        let store = MemoryUserStore::new();
        let who = me(&store, None).await.expect("me");
        assert!(!who.authenticated);

        let who = me(&store, Some(Uuid::new_v4())).await.expect("me");
        assert!(!who.authenticated);
    }

    #[tokio::test]
    async fn me_reports_active_user() {
        let store = MemoryUserStore::new();
        let user = register(&store, new_user("a@b.com")).await.expect("register");

        let who = me(&store, Some(user.id)).await.expect("me");
        assert!(who.authenticated);
        assert_eq!(who.user.expect("user view").id, user.id);
    }

    #[test]
    fn logout_acknowledges() {
        assert!(!logout().message.is_empty());
    }

    #[test]
    fn health_reports_ok_with_timestamp() {
        let health = health_check();
        assert_eq!(health.status, "ok");
        assert!(!health.timestamp.is_empty());
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two words@example.com"));
    }
}
