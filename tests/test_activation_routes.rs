
use credential_activity::credentials::{ActivationKind, UserRegistry};
use reqwest::{header::LOCATION, header::SET_COOKIE, StatusCode};
use test_startup::*;

#[actix_rt::test]
async fn activation_redirects_and_notifies() {
    let app = spawn_app().await;
    let user = app
        .registry
        .insert_user("username123", "test@gmail.com", Some("Password@123"))
        .unwrap();
    let activation = app
        .registry
        .create_activation(&user, ActivationKind::Registration, None)
        .await
        .unwrap();
    let url = format!("{}/activate/{}/{}", app.address, user.id, activation.code);

    let res = app.client().get(url.as_str()).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers().get(LOCATION).unwrap(), "/welcome");
    assert_eq!(
        app.events.events(),
        vec![("registration_activated", user.id)]
    );
    let stored = app.registry.get_user_by_id(user.id).await.unwrap().unwrap();
    assert!(stored.activation_id.is_none());

    let res = app.client().get(url.as_str()).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.events.events().len(), 1);
}

#[actix_rt::test]
async fn activation_for_another_user_is_not_found() {
    let app = spawn_app().await;
    let owner = app
        .registry
        .insert_user("owner123", "owner@gmail.com", None)
        .unwrap();
    let intruder = app
        .registry
        .insert_user("intruder123", "intruder@gmail.com", None)
        .unwrap();
    let activation = app
        .registry
        .create_activation(&owner, ActivationKind::Registration, None)
        .await
        .unwrap();

    let res = app
        .client()
        .get(format!(
            "{}/activate/{}/{}",
            app.address, intruder.id, activation.code
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(app.events.events().is_empty());
    assert!(app
        .registry
        .get_activation_by_code(activation.code.as_str())
        .await
        .unwrap()
        .is_some());
}

#[actix_rt::test]
async fn activation_with_unknown_code_or_user_is_not_found() {
    let app = spawn_app().await;
    let user = app
        .registry
        .insert_user("username123", "test@gmail.com", None)
        .unwrap();
    let activation = app
        .registry
        .create_activation(&user, ActivationKind::Registration, None)
        .await
        .unwrap();

    let res = app
        .client()
        .get(format!("{}/activate/{}/{}", app.address, user.id, "doesnotexist"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .client()
        .get(format!(
            "{}/activate/{}/{}",
            app.address, "not-a-uuid", activation.code
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    assert!(app.events.events().is_empty());
    let stored = app.registry.get_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.activation_id, Some(activation.id));
}

#[actix_rt::test]
async fn activation_can_log_the_user_in() {
    let app = spawn_app_with(|settings| settings.credentials.login_after_activation = true).await;
    let user = app
        .registry
        .insert_user("username123", "test@gmail.com", Some("Password@123"))
        .unwrap();
    let activation = app
        .registry
        .create_activation(&user, ActivationKind::Registration, None)
        .await
        .unwrap();

    let res = app
        .client()
        .get(format!(
            "{}/activate/{}/{}",
            app.address,
            user.id.simple(),
            activation.code
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers().get(LOCATION).unwrap(), "/");
    let cookie = res
        .headers()
        .get(SET_COOKIE)
        .expect("No session cookie")
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));
    assert_eq!(app.registry.session_count(), 1);
    assert!(app.events.events().is_empty());
}

#[actix_rt::test]
async fn concurrent_activations_with_one_code_apply_once() {
    let app = spawn_app().await;
    let user = app
        .registry
        .insert_user("username123", "test@gmail.com", None)
        .unwrap();
    let activation = app
        .registry
        .create_activation(&user, ActivationKind::Registration, None)
        .await
        .unwrap();
    let url = format!("{}/activate/{}/{}", app.address, user.id, activation.code);
    let client = app.client();

    let (first, second) = tokio::join!(client.get(url.as_str()).send(), client.get(url.as_str()).send());
    let mut statuses = vec![first.unwrap().status(), second.unwrap().status()];
    statuses.sort();

    assert_eq!(statuses, vec![StatusCode::FOUND, StatusCode::NOT_FOUND]);
    assert_eq!(
        app.events.events(),
        vec![("registration_activated", user.id)]
    );
}
