use std::borrow::Cow;

use actix_web::{web, Scope};
use validator::ValidationError;

use super::{forgot_password, get_reset_password, post_reset_password};
use crate::credentials::RESET_PASSWORD_ROUTE;

pub fn password_source() -> Scope {
    web::scope("/password")
        .service(
            web::resource("/forgot")
                .name("forgot_password")
                .route(web::post().to(forgot_password)),
        )
        .service(
            web::resource("/reset/{code}")
                .name(RESET_PASSWORD_ROUTE)
                .route(web::get().to(get_reset_password))
                .route(web::post().to(post_reset_password)),
        )
}

/// Only same-site paths are accepted as redirect targets.
pub fn validate_location(location: &str) -> Result<(), ValidationError> {
    if !location.starts_with('/') || location.starts_with("//") || location.contains('\\') {
        return Err(ValidationError::new("Invalid location")
            .with_message(Cow::from("Location must be a path on this site")));
    }
    Ok(())
}
