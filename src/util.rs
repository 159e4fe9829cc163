use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::ValidationErrors;

#[derive(Serialize, Deserialize)]
pub struct ResponseMessage {
    pub message: String,
}

/// First readable validation message as a 400, or an empty 400 if none carries one.
pub fn validation_error_response(error: ValidationErrors) -> HttpResponse {
    let source = error.field_errors();
    for i in source.iter() {
        for err in i.1.iter() {
            if let Some(message) = err.message.as_ref() {
                tracing::error!("Error: {}", message.as_ref());
                return HttpResponse::BadRequest().json(json!({
                    "Error" : message.as_ref()
                }));
            }
        }
    }
    HttpResponse::BadRequest().finish()
}
