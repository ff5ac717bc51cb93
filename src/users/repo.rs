use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::password;
use crate::users::repo_types::{NewUser, ProfileUpdate, PublicUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Persistence abstraction over the users table.
///
/// Rows are never physically deleted; `deactivate` flips `is_active` and the
/// row stays reachable through the lookup methods.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Hashes the password, then inserts. A unique violation on the email
    /// column surfaces as `DuplicateEmail`.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Updates profile fields only; the password cannot travel this path.
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User, StoreError>;

    /// Re-hashes unconditionally before persisting.
    async fn change_password(&self, id: Uuid, new_password: &str) -> Result<(), StoreError>;

    /// Soft delete.
    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError>;

    /// Fresh snapshot in creation order; the hash column never leaves the
    /// store on this path.
    async fn list_all(&self) -> Result<Vec<PublicUser>, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation))
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, display_name, role, is_active,
                   phone, avatar, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, display_name, role, is_active,
                   phone, avatar, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let password_hash = password::hash_password(&new_user.password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, display_name, role, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, display_name, role, is_active,
                      phone, avatar, created_at, updated_at
            "#,
        )
        .bind(&new_user.email)
        .bind(&password_hash)
        .bind(&new_user.display_name)
        .bind(new_user.role.unwrap_or_default())
        .bind(&new_user.phone)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateEmail
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET display_name = COALESCE($2, display_name),
                phone = COALESCE($3, phone),
                avatar = COALESCE($4, avatar),
                updated_at = now()
            WHERE id = $1
            RETURNING id, email, password_hash, display_name, role, is_active,
                      phone, avatar, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&update.display_name)
        .bind(&update.phone)
        .bind(&update.avatar)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)?;
        Ok(user)
    }

    async fn change_password(&self, id: Uuid, new_password: &str) -> Result<(), StoreError> {
        let password_hash = password::hash_password(new_password)?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&password_hash)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = FALSE, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<PublicUser>, StoreError> {
        let users = sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT id, email, display_name, role, is_active,
                   phone, avatar, created_at
            FROM users
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryUserStore;
    use super::*;

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
    async fn change_password_rehashes_the_credential() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("a@b.com")).await.expect("create");

        store
            .change_password(user.id, "another-password")
            .await
            .expect("change password");

        let row = store.find_by_id(user.id).await.unwrap().expect("row");
        assert_ne!(row.password_hash, user.password_hash);
        assert!(password::verify_password("another-password", &row.password_hash).unwrap());
        assert!(!password::verify_password("longenough1", &row.password_hash).unwrap());
    }

    #[tokio::test]
    async fn mutations_on_unknown_id_are_not_found() {
        let store = MemoryUserStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.update_profile(id, ProfileUpdate::default()).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.change_password(id, "longenough1").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(store.deactivate(id).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn list_all_reports_every_row_without_hashes() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@b.com")).await.expect("create");
        store.create(new_user("b@b.com")).await.expect("create");

        let listed = store.list_all().await.expect("list");
        assert_eq!(listed.len(), 2);
        let body = serde_json::to_value(&listed).unwrap();
        assert!(body.to_string().find("password").is_none());
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use time::OffsetDateTime;

    use super::*;

    /// In-memory store used by service and guard tests.
    #[derive(Default)]
    pub struct MemoryUserStore {
        rows: Mutex<Vec<User>>,
    }

    impl MemoryUserStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            Ok(self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned())
        }

        async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
            let password_hash = password::hash_password(&new_user.password)?;
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|u| u.email == new_user.email) {
                return Err(StoreError::DuplicateEmail);
            }
            let now = OffsetDateTime::now_utc();
            let user = User {
                id: Uuid::new_v4(),
                email: new_user.email,
                password_hash,
                display_name: new_user.display_name,
                role: new_user.role.unwrap_or_default(),
                is_active: true,
                phone: new_user.phone,
                avatar: None,
                created_at: now,
                updated_at: now,
            };
            rows.push(user.clone());
            Ok(user)
        }

        async fn update_profile(
            &self,
            id: Uuid,
            update: ProfileUpdate,
        ) -> Result<User, StoreError> {
            let mut rows = self.rows.lock().unwrap();
            let user = rows
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or(StoreError::NotFound)?;
            if let Some(display_name) = update.display_name {
                user.display_name = display_name;
            }
            if let Some(phone) = update.phone {
                user.phone = Some(phone);
            }
            if let Some(avatar) = update.avatar {
                user.avatar = Some(avatar);
            }
            user.updated_at = OffsetDateTime::now_utc();
            Ok(user.clone())
        }

        async fn change_password(&self, id: Uuid, new_password: &str) -> Result<(), StoreError> {
            let password_hash = password::hash_password(new_password)?;
            let mut rows = self.rows.lock().unwrap();
            let user = rows
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or(StoreError::NotFound)?;
            user.password_hash = password_hash;
            user.updated_at = OffsetDateTime::now_utc();
            Ok(())
        }

        async fn deactivate(&self, id: Uuid) -> Result<(), StoreError> {
            let mut rows = self.rows.lock().unwrap();
            let user = rows
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or(StoreError::NotFound)?;
            user.is_active = false;
            user.updated_at = OffsetDateTime::now_utc();
            Ok(())
        }

        async fn list_all(&self) -> Result<Vec<PublicUser>, StoreError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .cloned()
                .map(PublicUser::from)
                .collect())
        }
    }
}
