use crate::util::ResponseMessage;
use actix_web::HttpResponse;

pub async fn health_check() -> HttpResponse {
    tracing::info!("Health check handler");
    HttpResponse::Ok().json(ResponseMessage {
        message: "credential service is up".to_string(),
    })
}
