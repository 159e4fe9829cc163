use actix_web::{
    web::{Data, Json, Path},
    HttpRequest, HttpResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::Instrument;
use validator::Validate;

use super::util::validate_location;
use crate::credentials::password::validate_password;
use crate::credentials::{CredentialActivityService, CredentialContext, CredentialError};
use crate::util::validation_error_response;

#[derive(Deserialize, Validate)]
pub struct NewPassword {
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    #[validate(custom(function = "validate_location"))]
    pub location: Option<String>,
}

/// Lets the front end check a reset link before showing the new password form.
pub async fn get_reset_password(
    req: HttpRequest,
    code: Path<String>,
    context: Data<CredentialContext>,
) -> Result<HttpResponse, CredentialError> {
    let query_span = tracing::info_span!("Validate password reset code");
    let user = CredentialActivityService::new(&req, &context)
        .get_user_for_password_reset_token(code.as_str())
        .instrument(query_span)
        .await?;

    match user {
        Some(user) => {
            tracing::info!("Correct password reset code");
            Ok(HttpResponse::Ok().json(json!({
                "data": {
                    "id": user.id.to_string(),
                    "username": user.username,
                    "email": user.email,
                }
            })))
        }
        None => {
            tracing::info!("Password reset code not found");
            Ok(HttpResponse::NotFound().json(json!({
                "message": "Activation code not found"
            })))
        }
    }
}

pub async fn post_reset_password(
    req: HttpRequest,
    code: Path<String>,
    body: Json<NewPassword>,
    context: Data<CredentialContext>,
) -> Result<HttpResponse, CredentialError> {
    if let Err(error) = body.validate() {
        return Ok(validation_error_response(error));
    }
    let query_span = tracing::info_span!("Reset user password");

    CredentialActivityService::new(&req, &context)
        .reset_password(code.as_str(), body.password.as_str(), body.location.as_deref())
        .instrument(query_span)
        .await
}
