use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub activation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    Registration,
    PasswordReset,
}

/// One-time code tied to a user. Deleting it is what consumes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activation {
    pub id: Uuid,
    pub code: String,
    pub user_id: Uuid,
    pub kind: ActivationKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Activation {
    pub fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at < Utc::now())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to hash password: {0}")]
    PasswordHash(String),
    #[error("user {0} no longer exists")]
    UnknownUser(Uuid),
}

/// Owns credential storage and the lifecycle of activation and reset codes.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, RegistryError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RegistryError>;

    /// Unexpired activations only.
    async fn get_activation_by_code(&self, code: &str)
        -> Result<Option<Activation>, RegistryError>;

    /// `false` when the activation was already gone, e.g. consumed by a concurrent request.
    async fn delete_activation(&self, activation: &Activation) -> Result<bool, RegistryError>;

    /// Replaces whatever activation the user had pending.
    async fn create_activation(
        &self,
        user: &User,
        kind: ActivationKind,
        ttl: Option<Duration>,
    ) -> Result<Activation, RegistryError>;

    /// `None` when nobody is registered with `email`.
    async fn create_password_reset_token(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, RegistryError>;

    async fn get_user_by_password_reset_token(
        &self,
        code: &str,
    ) -> Result<Option<User>, RegistryError>;

    /// Consumes `code` and stores the new hash in one step. `false` when `code` is no
    /// longer a live reset code of `user`; the password is left untouched then.
    async fn set_password(
        &self,
        user: &User,
        password: &str,
        code: &str,
    ) -> Result<bool, RegistryError>;

    async fn create_session(&self, user: &User, ttl: Duration) -> Result<Session, RegistryError>;
}
