use actix_web::{HttpRequest, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::error::CredentialError;
use super::registry::{User, UserRegistry};
use crate::configuration::CredentialSettings;
use crate::events::{CredentialEvent, EventBus};
use crate::flash::{self, FlashMessage};
use crate::login::LoginService;
use crate::mail::{send_templated_mail, MailTemplate, Mailer};

/// Route name the reset link in the forgot password email points at.
pub const RESET_PASSWORD_ROUTE: &str = "reset_password";

/// Collaborators shared by every request.
pub struct CredentialContext {
    pub registry: Arc<dyn UserRegistry>,
    pub mailer: Arc<dyn Mailer>,
    pub events: EventBus,
    pub login: Arc<dyn LoginService>,
    pub settings: CredentialSettings,
}

/// Activation and password reset steps for a single request.
pub struct CredentialActivityService<'a> {
    request: &'a HttpRequest,
    context: &'a CredentialContext,
}

fn not_found(message: &str) -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "message": message
    }))
}

impl<'a> CredentialActivityService<'a> {
    pub fn new(request: &'a HttpRequest, context: &'a CredentialContext) -> Self {
        CredentialActivityService { request, context }
    }

    /// Activate a user who followed the link from their activation email.
    ///
    /// Answers 404 unless `activation_code` is the pending activation of the user
    /// identified by `user_token`. On success the activation is consumed and the
    /// user is either logged in or redirected to the after-activation page.
    pub async fn activate(
        &self,
        user_token: &str,
        activation_code: &str,
    ) -> Result<HttpResponse, CredentialError> {
        let registry = &self.context.registry;

        let activation = match registry.get_activation_by_code(activation_code).await? {
            Some(activation) => activation,
            None => {
                tracing::info!("Activation code not found");
                return Ok(not_found("Activation code not found"));
            }
        };

        let user = match Uuid::parse_str(user_token) {
            Ok(user_id) => registry.get_user_by_id(user_id).await?,
            Err(_) => {
                tracing::info!("Invalid user token {}", user_token);
                None
            }
        };
        let user = match user {
            Some(user) if user.activation_id == Some(activation.id) => user,
            Some(_) => {
                tracing::info!("Activation code does not belong to user");
                return Ok(not_found("Activation code not found"));
            }
            None => {
                tracing::info!("User {} not found", user_token);
                return Ok(not_found("User not found"));
            }
        };

        if !registry.delete_activation(&activation).await? {
            tracing::info!("Activation already consumed");
            return Ok(not_found("Activation code not found"));
        }
        let user = User {
            activation_id: None,
            ..user
        };

        if self.context.settings.login_after_activation {
            return self.context.login.authenticate(self.request, &user).await;
        }

        self.context
            .events
            .notify(&CredentialEvent::RegistrationActivated { user, activation });
        Ok(flash::redirect(
            self.request,
            self.context.settings.after_activate_url.as_str(),
        ))
    }

    /// Issue a reset token for `email`, mail the reset link and redirect.
    ///
    /// Fails with [`CredentialError::CannotResetPassword`] when the registry
    /// will not issue a token; nothing is sent in that case.
    pub async fn create_forgot_password_request(
        &self,
        email: &str,
        location: Option<&str>,
    ) -> Result<HttpResponse, CredentialError> {
        let (user, token) = self
            .context
            .registry
            .create_password_reset_token(email)
            .await?
            .ok_or_else(|| CredentialError::CannotResetPassword(email.to_string()))?;

        let link = self.request.url_for(RESET_PASSWORD_ROUTE, [token.as_str()])?;
        send_templated_mail(
            self.context.mailer.as_ref(),
            &[email],
            MailTemplate::ForgotPassword {
                link: link.as_str(),
                username: user.username.as_str(),
            },
        )
        .await?;

        flash::add(
            self.request,
            FlashMessage::success(
                "Please check your email to continue password reset.",
                "msg-check-email",
            ),
        );

        let location = location.unwrap_or(self.context.settings.reset_password_redirect.as_str());
        Ok(flash::redirect(self.request, location))
    }

    pub async fn get_user_for_password_reset_token(
        &self,
        activation_code: &str,
    ) -> Result<Option<User>, CredentialError> {
        let user = self
            .context
            .registry
            .get_user_by_password_reset_token(activation_code)
            .await?;
        Ok(user)
    }

    /// Set a new password for the holder of `activation_code`.
    ///
    /// The user comes here from the reset link or by typing the code into a form.
    pub async fn reset_password(
        &self,
        activation_code: &str,
        password: &str,
        location: Option<&str>,
    ) -> Result<HttpResponse, CredentialError> {
        let registry = &self.context.registry;
        let user = match registry.get_user_by_password_reset_token(activation_code).await? {
            Some(user) => user,
            None => {
                tracing::info!("Password reset code not found");
                return Ok(not_found("Activation code not found"));
            }
        };

        if !registry.set_password(&user, password, activation_code).await? {
            return Ok(not_found("Activation code not found"));
        }

        flash::add(
            self.request,
            FlashMessage::success(
                "The password reset complete. Please sign in with your new password.",
                "msg-password-reset-complete",
            ),
        );
        self.context
            .events
            .notify(&CredentialEvent::PasswordReset { user });

        let location = location.unwrap_or(self.context.settings.reset_password_redirect.as_str());
        Ok(flash::redirect(self.request, location))
    }
}
