use std::sync::Arc;

use crate::credentials::{Activation, User};

#[derive(Clone, Debug)]
pub enum CredentialEvent {
    RegistrationActivated { user: User, activation: Activation },
    PasswordReset { user: User },
}

impl CredentialEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CredentialEvent::RegistrationActivated { .. } => "registration_activated",
            CredentialEvent::PasswordReset { .. } => "password_reset",
        }
    }
}

pub trait EventSubscriber: Send + Sync {
    fn handle(&self, event: &CredentialEvent);
}

/// Synchronous fan-out to every subscriber, in registration order.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn subscribe(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn notify(&self, event: &CredentialEvent) {
        tracing::info!("Dispatching {} to {} subscribers", event.name(), self.subscribers.len());
        for subscriber in self.subscribers.iter() {
            subscriber.handle(event);
        }
    }
}

pub struct LoggingSubscriber;

impl EventSubscriber for LoggingSubscriber {
    fn handle(&self, event: &CredentialEvent) {
        match event {
            CredentialEvent::RegistrationActivated { user, activation } => tracing::info!(
                user_id = %user.id,
                activation_id = %activation.id,
                "User activated their account"
            ),
            CredentialEvent::PasswordReset { user } => {
                tracing::info!(user_id = %user.id, "User completed the password reset process")
            }
        }
    }
}
