//! Sign-in, current user and logout through the mock identity provider.

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::test;
use fanwiki_lib::entity::user;

use super::mock_identity_provider::TestClaims;
use super::test_helpers::*;

#[actix_web::test]
async fn test_sign_in_creates_user_and_session() {
    let env = TestEnv::start().await;
    let created = sample_user("player-7", false);
    let app = create_test_app(
        &env,
        mock_db([Vec::<user::Model>::new(), vec![created.clone()], vec![created]]),
    )
    .await;

    let id_token = env.sign(&TestClaims::id_token("player-7").with_name("Wanderer"));
    let req = with_csrf(test::TestRequest::post().uri("/api/auth/session"))
        .set_json(serde_json::json!({ "idToken": id_token }))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK, "body: {}", resp.body);
    assert_eq!(resp.body["user"]["uid"], "player-7");
    assert_eq!(resp.body["user"]["isAdmin"], false);
    assert_eq!(env.mock.sessions_created(), 1);

    let session = resp.cookie("session").expect("session cookie").clone();
    assert_eq!(session.http_only(), Some(true));
    assert!(!session.value().is_empty());
    assert_eq!(resp.cookie("admin-session").map(|c| c.value()), Some(""));

    // The minted cookie is accepted on later requests
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .cookie(Cookie::new("session", session.value().to_string()))
        .to_request();
    let resp = call(&app, req).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["user"]["uid"], "player-7");
}

#[actix_web::test]
async fn test_sign_in_requires_recent_authentication() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let id_token = env.sign(&TestClaims::id_token("player-7").stale_sign_in());
    let req = with_csrf(test::TestRequest::post().uri("/api/auth/session"))
        .set_json(serde_json::json!({ "idToken": id_token }))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(env.mock.sessions_created(), 0);
}

#[actix_web::test]
async fn test_sign_in_rejects_foreign_issuer() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let id_token =
        env.sign(&TestClaims::id_token("player-7").with_issuer("https://accounts.example.com"));
    let req = with_csrf(test::TestRequest::post().uri("/api/auth/session"))
        .set_json(serde_json::json!({ "idToken": id_token }))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(env.mock.sessions_created(), 0);
}

#[actix_web::test]
async fn test_sign_in_needs_csrf_token() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let id_token = env.sign(&TestClaims::id_token("player-7"));
    let req = test::TestRequest::post()
        .uri("/api/auth/session")
        .set_json(serde_json::json!({ "idToken": id_token }))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(env.mock.sessions_created(), 0);
}

#[actix_web::test]
async fn test_me_without_session_is_null() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body["user"].is_null());
}

#[actix_web::test]
async fn test_logout_clears_cookies() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let req = with_csrf(test::TestRequest::post().uri("/api/auth/logout")).to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    for name in ["session", "admin-session"] {
        let cookie = resp.cookie(name).expect("removal cookie");
        assert_eq!(cookie.value(), "");
        assert_eq!(
            cookie.max_age(),
            Some(actix_web::cookie::time::Duration::ZERO)
        );
    }
}
