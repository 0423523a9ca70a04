//! CSRF and rate-limit middleware in front of the real routes.

use actix_web::cookie::Cookie;
use actix_web::http::{StatusCode, header};
use actix_web::test;

use super::test_helpers::*;

#[actix_web::test]
async fn test_post_without_csrf_token_is_forbidden() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let req = test::TestRequest::post().uri("/api/auth/logout").to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_code(), Some("CSRF_TOKEN_INVALID"));
}

#[actix_web::test]
async fn test_mismatched_csrf_token_is_forbidden() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/logout")
        .insert_header(("x-csrf-token", "header-value"))
        .cookie(Cookie::new("csrf-token", "cookie-value"))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_issued_csrf_token_round_trips() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let req = test::TestRequest::get().uri("/api/auth/csrf").to_request();
    let resp = call(&app, req).await;
    assert_eq!(resp.status, StatusCode::OK);

    let token = resp.body["csrfToken"].as_str().expect("token in body").to_string();
    let cookie = resp.cookie("csrf-token").expect("token cookie");
    assert_eq!(cookie.value(), token);
    assert_eq!(cookie.http_only(), Some(false));

    let req = test::TestRequest::post()
        .uri("/api/auth/logout")
        .insert_header(("x-csrf-token", token.as_str()))
        .cookie(Cookie::new("csrf-token", token.clone()))
        .to_request();
    let resp = call(&app, req).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[actix_web::test]
async fn test_csrf_passes_before_authentication() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let req = with_csrf(test::TestRequest::post().uri("/api/admin/wiki"))
        .set_json(serde_json::json!({"title": "Ember Knight", "category": "characters"}))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_admin_key_requests_skip_csrf() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    // Blank title fails validation before any query
    let req = test::TestRequest::post()
        .uri("/api/admin/wiki")
        .insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
        .set_json(serde_json::json!({"title": "  ", "category": "lore"}))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_code(), Some("INVALID_INPUT"));
}

#[actix_web::test]
async fn test_wrong_admin_key_does_not_skip_csrf() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let req = test::TestRequest::put()
        .uri("/api/auth/profile")
        .insert_header(("X-Admin-Key", "not-the-key"))
        .insert_header(("x-csrf-token", "header-value"))
        .cookie(Cookie::new("csrf-token", "cookie-value"))
        .set_json(serde_json::json!({"displayName": "Ember"}))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_code(), Some("CSRF_TOKEN_INVALID"));

    let req = test::TestRequest::post()
        .uri("/api/auth/logout")
        .insert_header(("X-Admin-Key", "not-the-key"))
        .to_request();
    let resp = call(&app, req).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_wrong_admin_key_is_unauthorized() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let req = test::TestRequest::get()
        .uri("/api/admin/users")
        .insert_header(("X-Admin-Key", "guess"))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_rate_limit_per_client() {
    let mut env = TestEnv::start().await;
    env.config.security.rate_limit_max_requests = 3;
    let app = create_test_app(&env, empty_db()).await;
    let client = "10.1.1.1:5000".parse().unwrap();

    for remaining in ["2", "1", "0"] {
        let req = test::TestRequest::get()
            .uri("/api/health")
            .peer_addr(client)
            .to_request();
        let resp = call(&app, req).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.headers.get("x-ratelimit-limit").unwrap(), "3");
        assert_eq!(resp.headers.get("x-ratelimit-remaining").unwrap(), remaining);
    }

    let req = test::TestRequest::get()
        .uri("/api/health")
        .peer_addr(client)
        .to_request();
    let resp = call(&app, req).await;
    assert_eq!(resp.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.error_code(), Some("RATE_LIMITED"));
    assert!(resp.headers.contains_key(header::RETRY_AFTER));

    // Limited clients are rejected before the CSRF check
    let req = test::TestRequest::post()
        .uri("/api/auth/logout")
        .peer_addr(client)
        .to_request();
    let resp = call(&app, req).await;
    assert_eq!(resp.status, StatusCode::TOO_MANY_REQUESTS);

    let other = "10.1.1.2:5000".parse().unwrap();
    let req = test::TestRequest::get()
        .uri("/api/health")
        .peer_addr(other)
        .to_request();
    let resp = call(&app, req).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[actix_web::test]
async fn test_rotating_forwarded_for_does_not_evade_limit() {
    let mut env = TestEnv::start().await;
    env.config.security.rate_limit_max_requests = 2;
    let app = create_test_app(&env, empty_db()).await;
    let client = "10.0.0.7:5000".parse().unwrap();

    let mut limited = 0;
    for i in 0..10 {
        let req = test::TestRequest::get()
            .uri("/api/health")
            .peer_addr(client)
            .insert_header(("X-Forwarded-For", format!("203.0.113.{}", i)))
            .to_request();
        if call(&app, req).await.status == StatusCode::TOO_MANY_REQUESTS {
            limited += 1;
        }
    }

    assert_eq!(limited, 8);
}
