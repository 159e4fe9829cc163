use actix_web::{
    web::{self, Data, Path},
    HttpRequest, HttpResponse, Resource,
};
use serde::Deserialize;
use tracing::Instrument;

use crate::credentials::{CredentialActivityService, CredentialContext, CredentialError};

#[derive(Deserialize)]
pub struct ActivationPath {
    pub user_token: String,
    pub code: String,
}

pub async fn activate(
    req: HttpRequest,
    path: Path<ActivationPath>,
    context: Data<CredentialContext>,
) -> Result<HttpResponse, CredentialError> {
    let query_span = tracing::info_span!("Activate user", user_token = path.user_token.as_str());
    CredentialActivityService::new(&req, &context)
        .activate(path.user_token.as_str(), path.code.as_str())
        .instrument(query_span)
        .await
}

pub fn activation_source() -> Resource {
    web::resource("/activate/{user_token}/{code}")
        .name("activate")
        .route(web::get().to(activate))
}
