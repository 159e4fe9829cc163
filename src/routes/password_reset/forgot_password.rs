use actix_web::{
    web::{Data, Json},
    HttpRequest, HttpResponse,
};
use serde::Deserialize;
use tracing::Instrument;
use validator::Validate;

use super::util::validate_location;
use crate::credentials::{CredentialActivityService, CredentialContext, CredentialError};
use crate::util::validation_error_response;

#[derive(Deserialize, Validate, Debug)]
pub struct ForgotPassword {
    #[validate(email(message = "Not a valid email"))]
    pub email: String,
    #[validate(custom(function = "validate_location"))]
    pub location: Option<String>,
}

pub async fn forgot_password(
    req: HttpRequest,
    body: Json<ForgotPassword>,
    context: Data<CredentialContext>,
) -> Result<HttpResponse, CredentialError> {
    if let Err(error) = body.validate() {
        return Ok(validation_error_response(error));
    }
    let query_span = tracing::info_span!("Forgot password request", email = body.email.as_str());

    CredentialActivityService::new(&req, &context)
        .create_forgot_password_request(body.email.as_str(), body.location.as_deref())
        .instrument(query_span)
        .await
}
