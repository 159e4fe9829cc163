use actix_web::{
    cookie::{time::OffsetDateTime, Cookie, Expiration, SameSite},
    http::header,
    HttpRequest, HttpResponse,
};
use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;
use std::sync::Arc;

use crate::credentials::{CredentialError, User, UserRegistry};
use crate::flash;

pub const SESSION_COOKIE: &str = "session";

#[async_trait(?Send)]
pub trait LoginService: Send + Sync {
    async fn authenticate(
        &self,
        req: &HttpRequest,
        user: &User,
    ) -> Result<HttpResponse, CredentialError>;
}

/// Opens a server side session and hands its id to the browser as the `session` cookie.
pub struct SessionLoginService {
    registry: Arc<dyn UserRegistry>,
    session_ttl: Duration,
    after_login_url: String,
}

impl SessionLoginService {
    pub fn new(
        registry: Arc<dyn UserRegistry>,
        session_ttl: Duration,
        after_login_url: String,
    ) -> Self {
        SessionLoginService {
            registry,
            session_ttl,
            after_login_url,
        }
    }
}

#[async_trait(?Send)]
impl LoginService for SessionLoginService {
    async fn authenticate(
        &self,
        req: &HttpRequest,
        user: &User,
    ) -> Result<HttpResponse, CredentialError> {
        let session = self.registry.create_session(user, self.session_ttl).await?;
        tracing::info!(user_id = %user.id, "Opened session for user");

        let expires = OffsetDateTime::from_unix_timestamp(session.expires_at.timestamp())
            .unwrap_or_else(|_| OffsetDateTime::now_utc());
        let cookie = Cookie::build(SESSION_COOKIE, session.id.to_string())
            .secure(true)
            .http_only(true)
            .same_site(SameSite::Strict)
            .path("/")
            .expires(Expiration::DateTime(expires))
            .finish();

        Ok(HttpResponse::Found()
            .insert_header((header::LOCATION, self.after_login_url.as_str()))
            .cookie(cookie)
            .json(json!({
                "location": self.after_login_url,
                "messages": flash::take(req),
                "data": {
                    "id": user.id.to_string(),
                    "email": user.email,
                    "username": user.username,
                }
            })))
    }
}
