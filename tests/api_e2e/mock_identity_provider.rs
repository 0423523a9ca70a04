//! Mock identity provider for E2E tests.
//!
//! Starts an in-process HTTP server serving a JWKS document, the OAuth2
//! token endpoint and `createSessionCookie`, and issues signed ID tokens
//! and session cookies.

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, get, post, web};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::RsaPrivateKey;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::LineEnding;
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

/// Project id the mock issues tokens for.
pub const TEST_PROJECT_ID: &str = "fanwiki-test";

/// Access token handed out by the mock token endpoint.
pub const MOCK_ACCESS_TOKEN: &str = "mock-access-token";

/// Test RSA key pair with its JWK representation.
#[derive(Clone)]
pub struct TestKeyPair {
    pub kid: String,
    pub pem: String,
    pub encoding_key: EncodingKey,
    pub n_b64: String,
    pub e_b64: String,
}

impl TestKeyPair {
    pub fn generate(kid: &str) -> Self {
        use rsa::rand_core::OsRng;
        let bits = 2048;
        let private_key = RsaPrivateKey::new(&mut OsRng, bits).expect("failed to generate RSA key");

        let pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("failed to encode private key")
            .to_string();
        let encoding_key =
            EncodingKey::from_rsa_pem(pem.as_bytes()).expect("failed to create encoding key");

        let public_key = private_key.to_public_key();
        let n_b64 = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
        let e_b64 = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());

        TestKeyPair {
            kid: kid.to_string(),
            pem,
            encoding_key,
            n_b64,
            e_b64,
        }
    }
}

/// Shared state for the mock provider.
pub struct MockIdentityState {
    pub keys: Vec<TestKeyPair>,
    /// Number of session cookies minted.
    pub sessions_created: usize,
    /// Number of JWKS documents served.
    pub jwks_requests: usize,
}

#[derive(Serialize)]
struct JwksResponse {
    keys: Vec<JwkKey>,
}

#[derive(Serialize)]
struct JwkKey {
    kty: String,
    n: String,
    e: String,
    kid: String,
    alg: String,
    #[serde(rename = "use")]
    use_: String,
}

type SharedState = web::Data<Arc<Mutex<MockIdentityState>>>;

#[get("/jwks")]
async fn jwks_endpoint(state: SharedState) -> HttpResponse {
    let mut state = state.lock().unwrap();
    state.jwks_requests += 1;
    let keys: Vec<JwkKey> = state
        .keys
        .iter()
        .map(|k| JwkKey {
            kty: "RSA".to_string(),
            n: k.n_b64.clone(),
            e: k.e_b64.clone(),
            kid: k.kid.clone(),
            alg: "RS256".to_string(),
            use_: "sig".to_string(),
        })
        .collect();

    HttpResponse::Ok().json(JwksResponse { keys })
}

#[post("/token")]
async fn token_endpoint(body: String) -> HttpResponse {
    if !body.contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer") {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": "unsupported_grant_type"}));
    }
    HttpResponse::Ok().json(serde_json::json!({
        "access_token": MOCK_ACCESS_TOKEN,
        "expires_in": 3600,
        "token_type": "Bearer",
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionCookieBody {
    id_token: String,
    valid_duration: String,
}

/// Unverified payload of a JWT.
fn payload_of(token: &str) -> Option<Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[post("/v1/projects/{call}")]
async fn create_session_cookie(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<CreateSessionCookieBody>,
    state: SharedState,
) -> HttpResponse {
    if path.as_str() != format!("{}:createSessionCookie", TEST_PROJECT_ID) {
        return HttpResponse::NotFound().finish();
    }
    let authorized = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", MOCK_ACCESS_TOKEN));
    if !authorized {
        return HttpResponse::Unauthorized().finish();
    }

    let Some(id_claims) = payload_of(&body.id_token) else {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": "INVALID_ID_TOKEN"}));
    };
    let ttl: i64 = body.valid_duration.parse().unwrap_or(3600);

    let mut claims = TestClaims::session(
        id_claims["sub"].as_str().unwrap_or_default(),
        Duration::seconds(ttl),
    );
    claims.auth_time = id_claims["auth_time"].as_i64();
    claims.email = id_claims["email"].as_str().map(str::to_string);
    claims.name = id_claims["name"].as_str().map(str::to_string);

    let mut state = state.lock().unwrap();
    state.sessions_created += 1;
    let key = state.keys[0].clone();
    drop(state);

    HttpResponse::Ok().json(serde_json::json!({
        "sessionCookie": sign(&claims, &key),
    }))
}

/// Claims for ID tokens and session cookies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TestClaims {
    /// Session cookie claims valid for `ttl`.
    pub fn session(uid: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: uid.to_string(),
            iss: format!("https://session.firebase.google.com/{}", TEST_PROJECT_ID),
            aud: TEST_PROJECT_ID.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            auth_time: Some(now.timestamp()),
            email: None,
            name: None,
        }
    }

    /// Freshly issued ID token claims.
    pub fn id_token(uid: &str) -> Self {
        let now = Utc::now();
        Self {
            iss: format!("https://securetoken.google.com/{}", TEST_PROJECT_ID),
            exp: (now + Duration::hours(1)).timestamp(),
            ..Self::session(uid, Duration::hours(1))
        }
    }

    pub fn expired(mut self) -> Self {
        let past = Utc::now() - Duration::hours(1);
        self.exp = past.timestamp();
        self.iat = (past - Duration::minutes(10)).timestamp();
        self.auth_time = Some(self.iat);
        self
    }

    /// Signed in long ago; the token itself is still valid.
    pub fn stale_sign_in(mut self) -> Self {
        self.auth_time = Some((Utc::now() - Duration::hours(2)).timestamp());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_issuer(mut self, iss: &str) -> Self {
        self.iss = iss.to_string();
        self
    }
}

fn sign(claims: &TestClaims, key: &TestKeyPair) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(key.kid.clone());
    jsonwebtoken::encode(&header, claims, &key.encoding_key).expect("failed to encode JWT")
}

/// Mock identity provider.
pub struct MockIdentityProvider {
    pub base_url: String,
    pub state: Arc<Mutex<MockIdentityState>>,
}

impl MockIdentityProvider {
    /// Start the mock provider on an ephemeral port.
    pub async fn start(initial_key: TestKeyPair) -> Self {
        let state = Arc::new(Mutex::new(MockIdentityState {
            keys: vec![initial_key],
            sessions_created: 0,
            jwks_requests: 0,
        }));

        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let port = listener.local_addr().unwrap().port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let state_data = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state_data.clone()))
                .service(jwks_endpoint)
                .service(token_endpoint)
                .service(create_session_cookie)
        })
        .workers(1)
        .listen(listener)
        .expect("failed to listen")
        .disable_signals()
        .run();

        // Server lives for the process lifetime
        tokio::spawn(server);

        MockIdentityProvider { base_url, state }
    }

    pub fn jwks_url(&self) -> String {
        format!("{}/jwks", self.base_url)
    }

    /// Issue a signed JWT with the given claims using the specified key.
    pub fn issue_token(&self, claims: &TestClaims, key: &TestKeyPair) -> String {
        sign(claims, key)
    }

    pub fn sessions_created(&self) -> usize {
        self.state.lock().unwrap().sessions_created
    }

    pub fn jwks_requests(&self) -> usize {
        self.state.lock().unwrap().jwks_requests
    }
}
