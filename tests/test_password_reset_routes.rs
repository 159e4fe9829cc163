
use credential_activity::credentials::password::verify_password;
use credential_activity::credentials::UserRegistry;
use reqwest::{header::LOCATION, StatusCode};
use serde::{Deserialize, Serialize};
use test_startup::*;

#[derive(Serialize)]
struct ForgotPasswordBody<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

#[derive(Serialize)]
struct NewPasswordBody<'a> {
    password: &'a str,
}

#[derive(Deserialize)]
struct FlashMessage {
    kind: String,
    msg_id: String,
}

#[derive(Deserialize)]
struct RedirectBody {
    location: String,
    messages: Vec<FlashMessage>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "Error")]
    error: String,
}

fn extract_code(text: &str) -> String {
    let start = text
        .find("/password/reset/")
        .expect("No reset link in email")
        + "/password/reset/".len();
    text[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect()
}

async fn request_reset(app: &TestApp, body: &ForgotPasswordBody<'_>) -> reqwest::Response {
    app.client()
        .post(format!("{}/password/forgot", app.address))
        .json(body)
        .send()
        .await
        .expect("Failed to execute request")
}

async fn reset_code_for(app: &TestApp, email: &str) -> String {
    let res = request_reset(
        app,
        &ForgotPasswordBody {
            email,
            location: None,
        },
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    let sent = app.mailer.sent();
    extract_code(sent.last().expect("No email sent").text.as_str())
}

#[actix_rt::test]
async fn forgot_password_for_unknown_email_sends_nothing() {
    let app = spawn_app().await;

    let res = request_reset(
        &app,
        &ForgotPasswordBody {
            email: "nobody@gmail.com",
            location: None,
        },
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<ErrorBody>().await.unwrap();
    assert_eq!(body.error, "Cannot reset password for email: nobody@gmail.com");
    assert!(app.mailer.sent().is_empty());
}

#[actix_rt::test]
async fn forgot_password_rejects_malformed_email() {
    let app = spawn_app().await;

    let res = request_reset(
        &app,
        &ForgotPasswordBody {
            email: "not-an-email",
            location: None,
        },
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<ErrorBody>().await.unwrap();
    assert_eq!(body.error, "Not a valid email");
    assert!(app.mailer.sent().is_empty());
}

#[actix_rt::test]
async fn forgot_password_mails_link_and_redirects() {
    let app = spawn_app().await;
    app.registry
        .insert_user("username123", "test@gmail.com", Some("Password@123"))
        .unwrap();

    let res = request_reset(
        &app,
        &ForgotPasswordBody {
            email: "test@gmail.com",
            location: None,
        },
    )
    .await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers().get(LOCATION).unwrap(), "/login");
    let body = res.json::<RedirectBody>().await.unwrap();
    assert_eq!(body.location, "/login");
    assert_eq!(body.messages.len(), 1);
    assert_eq!(body.messages[0].kind, "success");
    assert_eq!(body.messages[0].msg_id, "msg-check-email");

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["test@gmail.com".to_string()]);
    let link = format!("{}/password/reset/", app.address);
    assert!(sent[0].text.contains(link.as_str()));
    assert!(sent[0].html.contains("username123"));
}

#[actix_rt::test]
async fn forgot_password_honours_given_location() {
    let app = spawn_app().await;
    app.registry
        .insert_user("username123", "test@gmail.com", None)
        .unwrap();

    let res = request_reset(
        &app,
        &ForgotPasswordBody {
            email: "test@gmail.com",
            location: Some("/check-your-inbox"),
        },
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers().get(LOCATION).unwrap(), "/check-your-inbox");

    let res = request_reset(
        &app,
        &ForgotPasswordBody {
            email: "test@gmail.com",
            location: Some("https://evil.example/phish"),
        },
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.mailer.sent().len(), 1);
}

#[actix_rt::test]
async fn reset_link_lookup() {
    let app = spawn_app().await;
    app.registry
        .insert_user("username123", "test@gmail.com", None)
        .unwrap();
    let code = reset_code_for(&app, "test@gmail.com").await;

    let res = app
        .client()
        .get(format!("{}/password/reset/{}", app.address, code))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["data"]["email"], "test@gmail.com");

    let res = app
        .client()
        .get(format!("{}/password/reset/{}", app.address, "doesnotexist"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn reset_password_with_unknown_code_is_not_found() {
    let app = spawn_app().await;
    let user = app
        .registry
        .insert_user("username123", "test@gmail.com", Some("Password@123"))
        .unwrap();

    let res = app
        .client()
        .post(format!("{}/password/reset/{}", app.address, "doesnotexist"))
        .json(&NewPasswordBody {
            password: "NewPassword@123",
        })
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(app.events.events().is_empty());
    let stored = app.registry.get_user_by_id(user.id).await.unwrap().unwrap();
    assert!(verify_password(
        "Password@123",
        stored.password_hash.as_deref().unwrap()
    ));
}

#[actix_rt::test]
async fn reset_password_updates_once_and_consumes_code() {
    let app = spawn_app().await;
    let user = app
        .registry
        .insert_user("username123", "test@gmail.com", Some("Password@123"))
        .unwrap();
    let code = reset_code_for(&app, "test@gmail.com").await;
    let reset_url = format!("{}/password/reset/{}", app.address, code);

    let res = app
        .client()
        .post(reset_url.as_str())
        .json(&NewPasswordBody {
            password: "NewPassword@123",
        })
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers().get(LOCATION).unwrap(), "/login");
    let body = res.json::<RedirectBody>().await.unwrap();
    assert_eq!(body.messages.len(), 1);
    assert_eq!(body.messages[0].msg_id, "msg-password-reset-complete");

    let stored = app.registry.get_user_by_id(user.id).await.unwrap().unwrap();
    assert!(verify_password(
        "NewPassword@123",
        stored.password_hash.as_deref().unwrap()
    ));
    assert_eq!(app.events.events(), vec![("password_reset", user.id)]);

    let res = app
        .client()
        .post(reset_url.as_str())
        .json(&NewPasswordBody {
            password: "OtherPassword@123",
        })
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.events.events().len(), 1);
    let stored = app.registry.get_user_by_id(user.id).await.unwrap().unwrap();
    assert!(verify_password(
        "NewPassword@123",
        stored.password_hash.as_deref().unwrap()
    ));
}

#[actix_rt::test]
async fn weak_password_keeps_code_usable() {
    let app = spawn_app().await;
    app.registry
        .insert_user("username123", "test@gmail.com", None)
        .unwrap();
    let code = reset_code_for(&app, "test@gmail.com").await;

    let res = app
        .client()
        .post(format!("{}/password/reset/{}", app.address, code))
        .json(&NewPasswordBody { password: "short" })
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<ErrorBody>().await.unwrap();
    assert_eq!(body.error, "Password must be at least 8 characters long");
    assert!(app
        .registry
        .get_user_by_password_reset_token(code.as_str())
        .await
        .unwrap()
        .is_some());
    assert!(app.events.events().is_empty());
}

#[actix_rt::test]
async fn concurrent_resets_with_one_code_apply_once() {
    let app = spawn_app().await;
    let user = app
        .registry
        .insert_user("username123", "test@gmail.com", Some("Password@123"))
        .unwrap();
    let code = reset_code_for(&app, "test@gmail.com").await;
    let reset_url = format!("{}/password/reset/{}", app.address, code);
    let client = app.client();

    let (first, second) = tokio::join!(
        client
            .post(reset_url.as_str())
            .json(&NewPasswordBody {
                password: "FirstPassword@123",
            })
            .send(),
        client
            .post(reset_url.as_str())
            .json(&NewPasswordBody {
                password: "SecondPassword@123",
            })
            .send(),
    );
    let mut statuses = vec![first.unwrap().status(), second.unwrap().status()];
    statuses.sort();

    assert_eq!(statuses, vec![StatusCode::FOUND, StatusCode::NOT_FOUND]);
    assert_eq!(app.events.events(), vec![("password_reset", user.id)]);
}
