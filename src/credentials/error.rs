use actix_web::{error::UrlGenerationError, http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use super::registry::RegistryError;
use crate::mail::MailError;

#[derive(thiserror::Error, Debug)]
pub enum CredentialError {
    /// The registry refused to issue a reset token, usually an unknown email.
    #[error("Cannot reset password for email: {0}")]
    CannotResetPassword(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error("failed to build link: {0}")]
    UrlGeneration(#[from] UrlGenerationError),
}

impl ResponseError for CredentialError {
    fn status_code(&self) -> StatusCode {
        match self {
            CredentialError::CannotResetPassword(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            CredentialError::CannotResetPassword(_) => {
                tracing::info!("{}", self);
                HttpResponse::BadRequest().json(json!({
                    "Error": self.to_string()
                }))
            }
            _ => {
                tracing::error!("Credential activity failed {:#?}", self);
                HttpResponse::InternalServerError().json(json!({
                    "Error": "something went wrong"
                }))
            }
        }
    }
}
