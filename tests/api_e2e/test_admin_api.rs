//! Admin-only routes: authorization and a few end-to-end edits.

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::test;
use fanwiki_lib::entity::{user, wiki_page};
use sea_orm::{DatabaseBackend, MockDatabase};

use super::test_helpers::*;

#[actix_web::test]
async fn test_admin_routes_require_session() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, empty_db()).await;

    for uri in ["/api/admin/wiki", "/api/admin/news", "/api/admin/users"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = call(&app, req).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[actix_web::test]
async fn test_non_admin_session_is_forbidden() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, mock_db([vec![sample_user("player-1", false)]])).await;

    let req = test::TestRequest::get()
        .uri("/api/admin/users")
        .cookie(Cookie::new("session", env.session_for("player-1")))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_code(), Some("FORBIDDEN"));
}

#[actix_web::test]
async fn test_session_without_user_record_is_forbidden() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, mock_db([Vec::<user::Model>::new()])).await;

    let req = test::TestRequest::get()
        .uri("/api/admin/wiki")
        .cookie(Cookie::new("session", env.session_for("ghost")))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_admin_cannot_revoke_own_rights() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, mock_db([vec![sample_user("admin-1", true)]])).await;

    let req = with_csrf(test::TestRequest::put().uri("/api/admin/users/admin-1/admin"))
        .cookie(Cookie::new("session", env.session_for("admin-1")))
        .set_json(serde_json::json!({ "isAdmin": false }))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_admin_key_grants_admin() {
    let env = TestEnv::start().await;
    let db = mock_db([
        vec![sample_user("player-2", false)],
        vec![sample_user("player-2", true)],
    ]);
    let app = create_test_app(&env, db).await;

    let req = test::TestRequest::put()
        .uri("/api/admin/users/player-2/admin")
        .insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
        .set_json(serde_json::json!({ "isAdmin": true }))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK, "body: {}", resp.body);
    assert_eq!(resp.body["uid"], "player-2");
    assert_eq!(resp.body["isAdmin"], true);
}

#[actix_web::test]
async fn test_granting_unknown_user_is_not_found() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, mock_db([Vec::<user::Model>::new()])).await;

    let req = test::TestRequest::put()
        .uri("/api/admin/users/nobody/admin")
        .insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
        .set_json(serde_json::json!({ "isAdmin": true }))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_admin_creates_wiki_page() {
    let env = TestEnv::start().await;
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_user("admin-1", true)]])
        .append_query_results([vec![count_row(0)]])
        .append_query_results([vec![sample_page("ember-knight", "published")]])
        .into_connection();
    let app = create_test_app(&env, db).await;

    let req = with_csrf(test::TestRequest::post().uri("/api/admin/wiki"))
        .cookie(Cookie::new("session", env.session_for("admin-1")))
        .set_json(serde_json::json!({ "title": "Ember Knight", "category": "characters" }))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::CREATED, "body: {}", resp.body);
    assert_eq!(resp.body["slug"], "ember-knight");
    assert_eq!(resp.body["revision"], 1);
}

#[actix_web::test]
async fn test_duplicate_slug_conflicts() {
    let env = TestEnv::start().await;
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![count_row(1)]])
        .into_connection();
    let app = create_test_app(&env, db).await;

    let req = test::TestRequest::post()
        .uri("/api/admin/wiki")
        .insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
        .set_json(serde_json::json!({ "title": "Ember Knight", "category": "characters" }))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_public_wiki_hides_unpublished_pages() {
    let env = TestEnv::start().await;
    let app = create_test_app(
        &env,
        mock_db([
            vec![sample_page("secret-boss", "draft")],
            vec![sample_page("ember-knight", "published")],
        ]),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/wiki/secret-boss").to_request();
    let resp = call(&app, req).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/wiki/ember-knight").to_request();
    let resp = call(&app, req).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["title"], "Ember Knight");
    assert_eq!(resp.body["tags"], serde_json::json!(["npc"]));
}

#[actix_web::test]
async fn test_revisions_of_missing_page_are_not_found() {
    let env = TestEnv::start().await;
    let app = create_test_app(&env, mock_db([Vec::<wiki_page::Model>::new()])).await;

    let req = test::TestRequest::get()
        .uri("/api/admin/wiki/00000000-0000-0000-0000-000000000007/revisions")
        .insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
        .to_request();
    let resp = call(&app, req).await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
