//! Shared test helpers for API E2E tests.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::http::header::HeaderMap;
use actix_web::{App, test, web};
use chrono::{TimeZone, Utc};
use fanwiki_lib::auth::AdminKey;
use fanwiki_lib::config::{
    Config, DatabaseSettings, Environment, IdentitySettings, SecuritySettings,
};
use fanwiki_lib::db::DbPool;
use fanwiki_lib::entity::{user, wiki_page};
use fanwiki_lib::middleware::{CsrfProtection, InMemoryRateLimitStore, RateLimiter};
use fanwiki_lib::services::IdentityProvider;
use fanwiki_lib::{api, services};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value as DbValue};
use secrecy::SecretString;
use serde_json::Value;
use uuid::Uuid;

use super::mock_identity_provider::{
    MockIdentityProvider, TEST_PROJECT_ID, TestClaims, TestKeyPair,
};

/// Admin key used in tests.
pub const TEST_ADMIN_KEY: &str = "test-admin-key-for-api-e2e";

/// CSRF token pair used by mutating requests.
pub const TEST_CSRF_TOKEN: &str = "e2e-csrf-token";

struct SharedKeys {
    signing: TestKeyPair,
    rogue: TestKeyPair,
}

static SHARED_KEYS: OnceLock<SharedKeys> = OnceLock::new();

/// RSA generation is slow; keys are shared across tests.
fn keys() -> &'static SharedKeys {
    SHARED_KEYS.get_or_init(|| SharedKeys {
        signing: TestKeyPair::generate("signing-key"),
        rogue: TestKeyPair::generate("rogue-key"),
    })
}

/// One mock provider plus the config pointing at it.
pub struct TestEnv {
    pub mock: MockIdentityProvider,
    pub config: Config,
}

impl TestEnv {
    pub async fn start() -> Self {
        let mock = MockIdentityProvider::start(keys().signing.clone()).await;
        let config = test_config(&mock);
        TestEnv { mock, config }
    }

    /// A valid session cookie for `uid`.
    pub fn session_for(&self, uid: &str) -> String {
        self.sign(&TestClaims::session(uid, chrono::Duration::hours(1)))
    }

    pub fn sign(&self, claims: &TestClaims) -> String {
        self.mock.issue_token(claims, &keys().signing)
    }

    /// Signed with a key the provider does not publish.
    pub fn sign_with_rogue_key(&self, claims: &TestClaims) -> String {
        self.mock.issue_token(claims, &keys().rogue)
    }
}

fn test_config(mock: &MockIdentityProvider) -> Config {
    Config {
        environment: Environment::Development,
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseSettings {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        static_dir: None,
        admin_key: Some(TEST_ADMIN_KEY.to_string()),
        identity: IdentitySettings {
            project_id: TEST_PROJECT_ID.to_string(),
            client_email: Some("server@fanwiki-test.iam.gserviceaccount.com".to_string()),
            private_key: Some(SecretString::from(keys().signing.pem.clone())),
            id_token_jwks_url: mock.jwks_url(),
            session_jwks_url: mock.jwks_url(),
            oauth_token_url: format!("{}/token", mock.base_url),
            identity_toolkit_url: mock.base_url.clone(),
            session_ttl_secs: 3600,
        },
        security: SecuritySettings {
            rate_limit_max_requests: 1000,
            rate_limit_window_secs: 60,
            admin_check_min_latency_ms: 50,
            allowed_origins: vec![],
            trusted_proxies: vec![],
        },
    }
}

/// Mock database answering queries in order.
pub fn mock_db<T, I>(results: I) -> DatabaseConnection
where
    T: sea_orm::IntoMockRow,
    I: IntoIterator<Item = Vec<T>>,
{
    MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(results)
        .into_connection()
}

/// Mock database that answers nothing.
pub fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

/// Row for `COUNT(*)` queries.
pub fn count_row(n: i64) -> BTreeMap<&'static str, DbValue> {
    BTreeMap::from([("num_items", DbValue::BigInt(Some(n)))])
}

pub fn sample_user(uid: &str, is_admin: bool) -> user::Model {
    let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    user::Model {
        uid: uid.to_string(),
        display_name: Some("Wanderer".to_string()),
        email: Some(format!("{}@example.com", uid)),
        photo_url: None,
        is_admin,
        last_seen_at: Some(ts),
        created_at: ts,
        updated_at: ts,
    }
}

pub fn sample_page(slug: &str, status: &str) -> wiki_page::Model {
    let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    wiki_page::Model {
        id: Uuid::from_u128(7),
        slug: slug.to_string(),
        title: "Ember Knight".to_string(),
        description: "A wandering knight".to_string(),
        content: "## Biography".to_string(),
        category: "characters".to_string(),
        subcategory: None,
        tags: serde_json::json!(["npc"]),
        image_url: None,
        status: status.to_string(),
        revision: 1,
        created_by: None,
        updated_by: None,
        created_at: ts,
        updated_at: ts,
    }
}

/// Build the app with the production middleware stack.
pub async fn create_test_app(
    env: &TestEnv,
    db: DatabaseConnection,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
{
    let config = env.config.clone();
    let identity = IdentityProvider::new(&config.identity).expect("identity provider");
    let store = Arc::new(InMemoryRateLimitStore::new(
        config.security.rate_limit_max_requests,
        config.security.rate_limit_window(),
    ));
    let admin_key = AdminKey::new(config.admin_key.clone());
    let trusted_proxies = config.security.trusted_proxies.clone();

    test::init_service(
        App::new()
            .app_data(web::Data::new(config))
            .app_data(web::Data::new(DbPool::from_connection(db)))
            .app_data(web::Data::new(identity))
            .app_data(web::Data::new(admin_key))
            .service(
                web::scope("/api")
                    .wrap(CsrfProtection)
                    .wrap(RateLimiter::new(store).trust_proxies(&trusted_proxies))
                    .configure(api::configure_health_routes)
                    .configure(services::configure_auth_routes)
                    .configure(api::configure_content_routes)
                    .configure(api::configure_admin_routes),
            ),
    )
    .await
}

/// Attach a matching CSRF header and cookie.
pub fn with_csrf(req: test::TestRequest) -> test::TestRequest {
    req.insert_header(("x-csrf-token", TEST_CSRF_TOKEN))
        .cookie(Cookie::new("csrf-token", TEST_CSRF_TOKEN))
}

/// Status, headers, cookies and JSON body of a response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub cookies: Vec<Cookie<'static>>,
    pub body: Value,
}

impl TestResponse {
    pub fn cookie(&self, name: &str) -> Option<&Cookie<'static>> {
        self.cookies.iter().find(|c| c.name() == name)
    }

    pub fn error_code(&self) -> Option<&str> {
        self.body["error"].as_str()
    }
}

pub async fn call<S, B>(app: &S, req: Request) -> TestResponse
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let headers = resp.headers().clone();
    let cookies = resp
        .response()
        .cookies()
        .map(|c| c.into_owned())
        .collect();
    let bytes = test::read_body(resp).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    TestResponse {
        status,
        headers,
        cookies,
        body,
    }
}
