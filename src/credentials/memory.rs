use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::password::{generate_code, hash_password, CODE_LENGTH};
use super::registry::{Activation, ActivationKind, RegistryError, Session, User, UserRegistry};

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    activations: HashMap<Uuid, Activation>,
    sessions: HashMap<Uuid, Session>,
}

impl Store {
    fn remove_activation(&mut self, id: Uuid) -> Option<Activation> {
        let activation = self.activations.remove(&id)?;
        if let Some(user) = self.users.get_mut(&activation.user_id) {
            if user.activation_id == Some(id) {
                user.activation_id = None;
            }
        }
        Some(activation)
    }
}

/// Process-local registry used when no database is configured.
pub struct InMemoryUserRegistry {
    store: Mutex<Store>,
    reset_token_ttl: Duration,
}

impl InMemoryUserRegistry {
    pub fn new(reset_token_ttl: Duration) -> Self {
        InMemoryUserRegistry {
            store: Mutex::new(Store::default()),
            reset_token_ttl,
        }
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        // A panic while holding the lock leaves the maps consistent, so keep going.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_user(
        &self,
        username: &str,
        email: &str,
        password: Option<&str>,
    ) -> Result<User, RegistryError> {
        let password_hash = password.map(hash_password).transpose()?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            activation_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store().users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn session_count(&self) -> usize {
        self.store().sessions.len()
    }
}

#[async_trait]
impl UserRegistry for InMemoryUserRegistry {
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, RegistryError> {
        Ok(self.store().users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RegistryError> {
        Ok(self
            .store()
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_activation_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Activation>, RegistryError> {
        Ok(self
            .store()
            .activations
            .values()
            .find(|activation| activation.code == code && !activation.is_expired())
            .cloned())
    }

    async fn delete_activation(&self, activation: &Activation) -> Result<bool, RegistryError> {
        Ok(self.store().remove_activation(activation.id).is_some())
    }

    async fn create_activation(
        &self,
        user: &User,
        kind: ActivationKind,
        ttl: Option<Duration>,
    ) -> Result<Activation, RegistryError> {
        let mut store = self.store();
        if !store.users.contains_key(&user.id) {
            return Err(RegistryError::UnknownUser(user.id));
        }
        let stale: Vec<Uuid> = store
            .activations
            .values()
            .filter(|activation| activation.user_id == user.id)
            .map(|activation| activation.id)
            .collect();
        for id in stale {
            store.remove_activation(id);
        }

        let now = Utc::now();
        let activation = Activation {
            id: Uuid::new_v4(),
            code: generate_code(CODE_LENGTH),
            user_id: user.id,
            kind,
            created_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        };
        store.activations.insert(activation.id, activation.clone());
        if let Some(stored) = store.users.get_mut(&user.id) {
            stored.activation_id = Some(activation.id);
            stored.updated_at = now;
        }
        Ok(activation)
    }

    async fn create_password_reset_token(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, RegistryError> {
        let user = match self.get_user_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::info!("User with email {} not found", email);
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
        let store = self.store();
        let Some(activation) = store.activations.values().find(|activation| {
            activation.code == code
                && activation.kind == ActivationKind::PasswordReset
                && !activation.is_expired()
        }) else {
            return Ok(None);
        };
        Ok(store
            .users
            .get(&activation.user_id)
            .filter(|user| user.activation_id == Some(activation.id))
            .cloned())
    }

    async fn set_password(
        &self,
        user: &User,
        password: &str,
        code: &str,
    ) -> Result<bool, RegistryError> {
        let password_hash = hash_password(password)?;
        let mut store = self.store();
        if !store.users.contains_key(&user.id) {
            return Err(RegistryError::UnknownUser(user.id));
        }
        let consumed = store
            .activations
            .values()
            .find(|activation| {
                activation.code == code
                    && activation.user_id == user.id
                    && activation.kind == ActivationKind::PasswordReset
                    && !activation.is_expired()
            })
            .map(|activation| activation.id);
        let Some(activation_id) = consumed else {
            tracing::info!("Password reset code already consumed");
            return Ok(false);
        };
        store.remove_activation(activation_id);

        if let Some(stored) = store.users.get_mut(&user.id) {
            stored.password_hash = Some(password_hash);
            stored.updated_at = Utc::now();
        }
        tracing::info!("User Password updated successfully");
        Ok(true)
    }

    async fn create_session(&self, user: &User, ttl: Duration) -> Result<Session, RegistryError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            created_at: now,
            expires_at: now + ttl,
        };
        self.store().sessions.insert(session.id, session.clone());
        Ok(session)
    }
}
