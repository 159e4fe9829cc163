//! One-shot notices carried to the front end with the next response.

use actix_web::{http::header, HttpMessage, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub msg: String,
    pub kind: FlashKind,
    pub msg_id: String,
}

impl FlashMessage {
    pub fn success(msg: &str, msg_id: &str) -> Self {
        FlashMessage {
            msg: msg.to_string(),
            kind: FlashKind::Success,
            msg_id: msg_id.to_string(),
        }
    }
}

#[derive(Default)]
struct FlashMessages(Vec<FlashMessage>);

pub fn add(req: &HttpRequest, message: FlashMessage) {
    tracing::info!("Flash message {}", message.msg_id);
    let mut extensions = req.extensions_mut();
    match extensions.get_mut::<FlashMessages>() {
        Some(messages) => messages.0.push(message),
        None => {
            extensions.insert(FlashMessages(vec![message]));
        }
    }
}

pub fn take(req: &HttpRequest) -> Vec<FlashMessage> {
    req.extensions_mut()
        .remove::<FlashMessages>()
        .map(|messages| messages.0)
        .unwrap_or_default()
}

/// 302 to `location`, handing over any pending flash messages in the body.
pub fn redirect(req: &HttpRequest, location: &str) -> HttpResponse {
    let messages = take(req);
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .json(json!({
            "location": location,
            "messages": messages,
        }))
}
