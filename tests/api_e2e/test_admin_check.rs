//! Admin check endpoint: status codes, admin hint cookie and latency floor.

use std::time::{Duration, Instant};

use actix_web::http::StatusCode;
use actix_web::test;
use fanwiki_lib::entity::user;

use super::mock_identity_provider::TestClaims;
use super::test_helpers::*;

const CHECK_URI: &str = "/api/auth/check-admin";

#[actix_web::test]
async fn test_missing_cookie_is_unauthorized_after_min_latency() {
    let mut env = TestEnv::start().await;
    env.config.security.admin_check_min_latency_ms = 150;
    let app = create_test_app(&env, empty_db()).await;

    let started = Instant::now();
    let req = test::TestRequest::get().uri(CHECK_URI).to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_code(), Some("UNAUTHORIZED"));
    assert!(started.elapsed() >= Duration::from_millis(150));

    let hint = resp.cookie("admin-session").expect("hint cleared");
    assert_eq!(hint.value(), "");
}

#[actix_web::test]
async fn test_garbage_cookie_is_unauthorized() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let req = test::TestRequest::get()
        .uri(CHECK_URI)
        .cookie(actix_web::cookie::Cookie::new("session", "not-a-jwt"))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_expired_session_is_unauthorized() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let token = env.sign(&TestClaims::session("uid-1", chrono::Duration::hours(1)).expired());
    let req = test::TestRequest::get()
        .uri(CHECK_URI)
        .cookie(actix_web::cookie::Cookie::new("session", token))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_session_signed_by_unpublished_key_is_unauthorized() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let token = env.sign_with_rogue_key(&TestClaims::session("uid-1", chrono::Duration::hours(1)));
    let req = test::TestRequest::get()
        .uri(CHECK_URI)
        .cookie(actix_web::cookie::Cookie::new("session", token))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_unknown_key_ids_refresh_jwks_once() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    for _ in 0..5 {
        let token =
            env.sign_with_rogue_key(&TestClaims::session("uid-1", chrono::Duration::hours(1)));
        let req = test::TestRequest::get()
            .uri(CHECK_URI)
            .cookie(actix_web::cookie::Cookie::new("session", token))
            .to_request();
        let resp = call(&app, req).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    }

    // Initial fetch plus a single forced refresh
    assert_eq!(env.mock.jwks_requests(), 2);
}

#[actix_web::test]
async fn test_id_token_is_not_a_session() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    let token = env.sign(&TestClaims::id_token("uid-1"));
    let req = test::TestRequest::get()
        .uri(CHECK_URI)
        .cookie(actix_web::cookie::Cookie::new("session", token))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_valid_session_without_user_record_is_not_admin() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, mock_db([Vec::<user::Model>::new()])).await;

    let req = test::TestRequest::get()
        .uri(CHECK_URI)
        .cookie(actix_web::cookie::Cookie::new("session", env.session_for("ghost")))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["isAdmin"], false);
    assert_eq!(resp.body["uid"], "ghost");
    assert_eq!(resp.cookie("admin-session").map(|c| c.value()), Some(""));
}

#[actix_web::test]
async fn test_admin_session_sets_hint_cookie() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, mock_db([vec![sample_user("admin-1", true)]])).await;

    let req = test::TestRequest::get()
        .uri(CHECK_URI)
        .cookie(actix_web::cookie::Cookie::new("session", env.session_for("admin-1")))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["isAdmin"], true);
    assert_eq!(resp.body["uid"], "admin-1");

    let hint = resp.cookie("admin-session").expect("hint set");
    assert_eq!(hint.value(), "1");
    assert_eq!(hint.http_only(), Some(false));
}

#[actix_web::test]
async fn test_regular_user_is_not_admin() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, mock_db([vec![sample_user("player-1", false)]])).await;

    let req = test::TestRequest::get()
        .uri(CHECK_URI)
        .cookie(actix_web::cookie::Cookie::new("session", env.session_for("player-1")))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["isAdmin"], false);
}

#[actix_web::test]
async fn test_successful_check_also_respects_min_latency() {
    let mut env = TestEnv::start().await;
    env.config.security.admin_check_min_latency_ms = 120;
    let app = create_test_app(&env, mock_db([vec![sample_user("admin-1", true)]])).await;

    let started = Instant::now();
    let req = test::TestRequest::get()
        .uri(CHECK_URI)
        .cookie(actix_web::cookie::Cookie::new("session", env.session_for("admin-1")))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(started.elapsed() >= Duration::from_millis(120));
}
