use crate::entities::{prelude::*, *};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Username '{0}' already exists")]
    UsernameTaken(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Persisted user identities and their password hashes
#[derive(Clone)]
pub struct CredentialStore {
    db: DatabaseConnection,
}

impl CredentialStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers a new user. An existing username leaves the store untouched.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<users::Model, CredentialError> {
        if self.find_by_username(username).await?.is_some() {
            return Err(CredentialError::UsernameTaken(username.to_string()));
        }

        let password_hash = hash_password(password)?;

        let user = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            ..Default::default()
        };

        // The unique index still guards against a concurrent registration
        match user.insert(&self.db).await {
            Ok(model) => {
                tracing::info!("👤 Registered user '{}' (id {})", model.username, model.id);
                Ok(model)
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(CredentialError::UsernameTaken(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<users::Model>, DbErr> {
        Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<users::Model>, DbErr> {
        Users::find_by_id(id).one(&self.db).await
    }

    /// Looks the user up and checks the password. Unknown users and wrong
    /// passwords both yield `None`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<users::Model>, DbErr> {
        let user = self.find_by_username(username).await?;
        Ok(user.filter(|u| verify_password(u, password)))
    }
}

pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hashing(e.to_string()))
}

pub fn verify_password(user: &users::Model, password: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(&user.password_hash) else {
        tracing::warn!("Stored password hash for '{}' is malformed", user.username);
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
