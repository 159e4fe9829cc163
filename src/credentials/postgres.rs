use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::Instrument;
use uuid::Uuid;

use super::password::{generate_code, hash_password, CODE_LENGTH};
use super::registry::{Activation, ActivationKind, RegistryError, Session, User, UserRegistry};

const USER_COLUMNS: &str =
    "users.id, users.username, users.email, users.password_hash, users.activation_id, users.created_at, users.updated_at";

pub struct PgUserRegistry {
    db_pool: PgPool,
    reset_token_ttl: Duration,
}

impl PgUserRegistry {
    pub fn new(db_pool: PgPool, reset_token_ttl: Duration) -> Self {
        PgUserRegistry {
            db_pool,
            reset_token_ttl,
        }
    }

    async fn replace_activation(
        transaction: &mut Transaction<'_, Postgres>,
        user: &User,
        kind: ActivationKind,
        ttl: Option<Duration>,
    ) -> Result<Activation, RegistryError> {
        let delete_res = sqlx::query("DELETE FROM activations WHERE user_id = $1")
            .bind(user.id)
            .execute(&mut **transaction)
            .await?;
        tracing::info!(
            "Number of stale activations deleted = {}",
            delete_res.rows_affected()
        );

        let now = Utc::now();
        let activation = Activation {
            id: Uuid::new_v4(),
            code: generate_code(CODE_LENGTH),
            user_id: user.id,
            kind,
            created_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        };

        sqlx::query(
            r#"
                INSERT INTO activations (id, code, user_id, kind, created_at, expires_at)
                VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(activation.id)
        .bind(activation.code.as_str())
        .bind(activation.user_id)
        .bind(activation.kind)
        .bind(activation.created_at)
        .bind(activation.expires_at)
        .execute(&mut **transaction)
        .await?;

        sqlx::query("UPDATE users SET activation_id = $1, updated_at = $2 WHERE id = $3")
            .bind(activation.id)
            .bind(now)
            .bind(user.id)
            .execute(&mut **transaction)
            .await?;

        Ok(activation)
    }
}

#[async_trait]
impl UserRegistry for PgUserRegistry {
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, RegistryError> {
        let query_span = tracing::info_span!("Get user by id", %id);
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db_pool)
        .instrument(query_span)
        .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RegistryError> {
        let query_span = tracing::info_span!("Get user by email", email);
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db_pool)
        .instrument(query_span)
        .await?;
        Ok(user)
    }

    async fn get_activation_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Activation>, RegistryError> {
        let query_span = tracing::info_span!("Get activation by code");
        let activation = sqlx::query_as::<_, Activation>(
            r#"
                SELECT id, code, user_id, kind, created_at, expires_at FROM activations
                WHERE code = $1 AND (expires_at IS NULL OR expires_at > now())
            "#,
        )
        .bind(code)
        .fetch_optional(&self.db_pool)
        .instrument(query_span)
        .await?;
        Ok(activation)
    }

    async fn delete_activation(&self, activation: &Activation) -> Result<bool, RegistryError> {
        let query_span = tracing::info_span!("Delete activation", id = %activation.id);
        let delete_res = sqlx::query("DELETE FROM activations WHERE id = $1")
            .bind(activation.id)
            .execute(&self.db_pool)
            .instrument(query_span)
            .await?;
        tracing::info!("Number of rows deleted = {}", delete_res.rows_affected());
        Ok(delete_res.rows_affected() > 0)
    }

    async fn create_activation(
        &self,
        user: &User,
        kind: ActivationKind,
        ttl: Option<Duration>,
    ) -> Result<Activation, RegistryError> {
        let query_span = tracing::info_span!("Create activation", user_id = %user.id, ?kind);
        async {
            let mut transaction = self.db_pool.begin().await?;
            let activation = Self::replace_activation(&mut transaction, user, kind, ttl).await?;
            transaction.commit().await?;
            Ok::<_, RegistryError>(activation)
        }
        .instrument(query_span)
        .await
    }

    async fn create_password_reset_token(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, RegistryError> {
        let user = match self.get_user_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::info!("User with email {} not found in database", email);
                return Ok(None);
            }
        };
        let activation = self
            .create_activation(&user, ActivationKind::PasswordReset, Some(self.reset_token_ttl))
            .await?;
        let user = User {
            activation_id: Some(activation.id),
            ..user
        };
        Ok(Some((user, activation.code)))
    }

    async fn get_user_by_password_reset_token(
        &self,
        code: &str,
    ) -> Result<Option<User>, RegistryError> {
        let query_span = tracing::info_span!("Get user by password reset token");
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
                SELECT {} FROM users
                INNER JOIN activations ON activations.id = users.activation_id
                WHERE activations.code = $1
                AND activations.kind = $2
                AND (activations.expires_at IS NULL OR activations.expires_at > now())
            "#,
            USER_COLUMNS
        ))
        .bind(code)
        .bind(ActivationKind::PasswordReset)
        .fetch_optional(&self.db_pool)
        .instrument(query_span)
        .await?;
        Ok(user)
    }

    async fn set_password(
        &self,
        user: &User,
        password: &str,
        code: &str,
    ) -> Result<bool, RegistryError> {
        let query_span = tracing::info_span!("Update User Password", user_id = %user.id);
        let password_hash = hash_password(password)?;
        async {
            let mut transaction = self.db_pool.begin().await?;
            // Row lock on the activation serializes concurrent resets with the same code.
            let consumed = sqlx::query(
                r#"
                    DELETE FROM activations
                    WHERE code = $1 AND user_id = $2 AND kind = $3
                    AND (expires_at IS NULL OR expires_at > now())
                    RETURNING id
                "#,
            )
            .bind(code)
            .bind(user.id)
            .bind(ActivationKind::PasswordReset)
            .fetch_optional(&mut *transaction)
            .await?;
            if consumed.is_none() {
                tracing::info!("Password reset code already consumed");
                transaction.rollback().await?;
                return Ok(false);
            }

            let update_res = sqlx::query(
                "UPDATE users SET password_hash = $1, activation_id = NULL, updated_at = $2 WHERE id = $3",
            )
            .bind(password_hash)
            .bind(Utc::now())
            .bind(user.id)
            .execute(&mut *transaction)
            .await?;
            if update_res.rows_affected() == 0 {
                transaction.rollback().await?;
                return Err(RegistryError::UnknownUser(user.id));
            }
            transaction.commit().await?;
            tracing::info!("User Password updated successfully");
            Ok(true)
        }
        .instrument(query_span)
        .await
    }

    async fn create_session(&self, user: &User, ttl: Duration) -> Result<Session, RegistryError> {
        let query_span = tracing::info_span!("Create session", user_id = %user.id);
        let now = Utc::now();
        let session = sqlx::query_as::<_, Session>(
            r#"
                INSERT INTO sessions (id, user_id, created_at, expires_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id, user_id, created_at, expires_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(now)
        .bind(now + ttl)
        .fetch_one(&self.db_pool)
        .instrument(query_span)
        .await?;
        Ok(session)
    }
}
