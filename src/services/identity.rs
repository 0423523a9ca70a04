//! Identity provider client.
//!
//! Verifies provider ID tokens and session cookies (RS256 JWTs) against the
//! provider's published JWKS, and mints session cookies through the
//! provider's REST API using a service account.
//!
//! Security features:
//! - RS256 signature verification (algorithm pinned, no fallback)
//! - JWKS cached with TTL + forced refresh on key rotation (kid miss),
//!   at most once per `MIN_FORCED_REFRESH_INTERVAL`
//! - Issuer and audience (project id) always validated
//! - HTTP timeouts on every provider call
//! - Generic error messages to clients; details logged server-side

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::IdentitySettings;
use crate::error::{AppError, AppResult};
use crate::models::IdentityClaims;

/// JWKS cache TTL (24 hours).
const JWKS_CACHE_TTL: Duration = Duration::from_secs(86400);

/// Minimum time between kid-miss refreshes of one JWKS document.
const MIN_FORCED_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// HTTP connect timeout for provider calls.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP total timeout for provider calls.
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifetime requested for service-account access tokens.
const ACCESS_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Access tokens are refreshed this long before they expire.
const ACCESS_TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// A session may only be minted from an ID token this fresh.
pub const RECENT_SIGN_IN_SECS: u64 = 300;

/// Longest accepted provider UID.
const MAX_UID_LEN: usize = 128;

const OAUTH_SCOPES: &str =
    "https://www.googleapis.com/auth/identitytoolkit https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Build an HTTP client with timeouts.
fn build_http_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// Anything that can turn a session cookie into verified claims.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify_session_cookie(&self, cookie: &str) -> AppResult<IdentityClaims>;
}

/// Cached JWKS keys.
struct CachedKeys {
    keys: Vec<(String, DecodingKey)>,
    fetched_at: Instant,
}

/// JWKS response from the provider.
#[derive(Deserialize)]
struct JwksResponse {
    keys: Vec<serde_json::Value>,
}

/// Verifies RS256 JWTs from one issuer against one JWKS document.
#[derive(Clone)]
pub struct TokenVerifier {
    label: &'static str,
    issuer: String,
    audience: String,
    jwks_url: String,
    jwks_cache: Arc<RwLock<Option<CachedKeys>>>,
    last_forced_refresh: Arc<Mutex<Option<Instant>>>,
    http_client: reqwest::Client,
}

impl TokenVerifier {
    pub fn new(
        label: &'static str,
        issuer: String,
        audience: String,
        jwks_url: String,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            label,
            issuer,
            audience,
            jwks_url,
            jwks_cache: Arc::new(RwLock::new(None)),
            last_forced_refresh: Arc::new(Mutex::new(None)),
            http_client,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Verify a token and return its claims.
    ///
    /// Every failure maps to `Unauthorized` with a generic message; the
    /// reason is logged.
    pub async fn verify(&self, token: &SecretString) -> AppResult<IdentityClaims> {
        let header = decode_header(token.expose_secret()).map_err(|e| {
            warn!("{}: invalid JWT header: {}", self.label, e);
            unauthorized()
        })?;
        if header.alg != Algorithm::RS256 {
            warn!("{}: unexpected algorithm {:?}", self.label, header.alg);
            return Err(unauthorized());
        }
        let kid = header.kid.ok_or_else(|| {
            warn!("{}: JWT missing 'kid' header", self.label);
            unauthorized()
        })?;

        let decoding_key = self.find_key_with_retry(&kid).await.map_err(|e| {
            warn!("{}: key lookup failed for kid '{}': {}", self.label, kid, e);
            unauthorized()
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let claims = decode::<IdentityClaims>(token.expose_secret(), &decoding_key, &validation)
            .map_err(|e| {
                warn!("{}: JWT verification failed: {}", self.label, e);
                unauthorized()
            })?
            .claims;

        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
            warn!("{}: JWT has an invalid 'sub' claim", self.label);
            return Err(unauthorized());
        }

        debug!("{}: token verified for uid={}", self.label, claims.sub);
        Ok(claims)
    }

    /// Find a decoding key by kid. On miss, force a JWKS refresh and retry once.
    async fn find_key_with_retry(&self, kid: &str) -> Result<DecodingKey, String> {
        let keys = self.get_or_fetch_keys(false).await?;
        if let Some((_, key)) = keys.iter().find(|(k, _)| k == kid) {
            return Ok(key.clone());
        }

        if !self.claim_forced_refresh().await {
            return Err(format!(
                "Unknown key ID '{}' (JWKS refreshed less than {}s ago)",
                kid,
                MIN_FORCED_REFRESH_INTERVAL.as_secs()
            ));
        }

        info!(
            "{}: kid '{}' not in cache, forcing JWKS refresh",
            self.label, kid
        );
        let keys = self.get_or_fetch_keys(true).await?;
        keys.iter()
            .find(|(k, _)| k == kid)
            .map(|(_, key)| key.clone())
            .ok_or_else(|| format!("Unknown key ID '{}' after JWKS refresh", kid))
    }

    /// Whether a forced refresh may run now. Records the attempt if so.
    async fn claim_forced_refresh(&self) -> bool {
        let mut last = self.last_forced_refresh.lock().await;
        match *last {
            Some(at) if at.elapsed() < MIN_FORCED_REFRESH_INTERVAL => false,
            _ => {
                *last = Some(Instant::now());
                true
            }
        }
    }

    /// Get cached JWKS keys or fetch from provider. If `force_refresh` is true, skip cache.
    async fn get_or_fetch_keys(
        &self,
        force_refresh: bool,
    ) -> Result<Vec<(String, DecodingKey)>, String> {
        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if let Some(ref cached) = *cache
                && cached.fetched_at.elapsed() < JWKS_CACHE_TTL
            {
                return Ok(cached.keys.clone());
            }
        }

        match self.fetch_jwks().await {
            Ok(keys) => {
                let mut cache = self.jwks_cache.write().await;
                *cache = Some(CachedKeys {
                    keys: keys.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(keys)
            }
            Err(e) => {
                // Fall back to stale keys when a scheduled refresh fails
                if !force_refresh {
                    let cache = self.jwks_cache.read().await;
                    if let Some(ref cached) = *cache {
                        warn!("{}: JWKS refresh failed, using stale cache: {}", self.label, e);
                        return Ok(cached.keys.clone());
                    }
                }
                Err(e)
            }
        }
    }

    async fn fetch_jwks(&self) -> Result<Vec<(String, DecodingKey)>, String> {
        info!("{}: fetching JWKS from {}", self.label, self.jwks_url);

        let response: JwksResponse = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| format!("Failed to fetch JWKS: {}", e))?
            .error_for_status()
            .map_err(|e| format!("JWKS endpoint returned an error: {}", e))?
            .json()
            .await
            .map_err(|e| format!("Failed to parse JWKS response: {}", e))?;

        let mut keys = Vec::new();
        for jwk_value in &response.keys {
            let jwk: jsonwebtoken::jwk::Jwk = match serde_json::from_value(jwk_value.clone()) {
                Ok(j) => j,
                Err(e) => {
                    warn!("Failed to parse JWK: {}", e);
                    continue;
                }
            };

            if let Some(ref kid) = jwk.common.key_id {
                match DecodingKey::from_jwk(&jwk) {
                    Ok(key) => keys.push((kid.clone(), key)),
                    Err(e) => warn!("Failed to create decoding key from JWK {}: {}", kid, e),
                }
            }
        }

        info!("{}: loaded {} JWKS keys", self.label, keys.len());
        Ok(keys)
    }
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("Invalid or expired session".to_string())
}

/// Service-account credentials used to call the provider's admin API.
#[derive(Clone)]
struct ServiceAccount {
    client_email: String,
    signing_key: EncodingKey,
}

/// Claims of the JWT-bearer assertion sent to the OAuth token endpoint.
#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedAccessToken {
    token: SecretString,
    expires_at: Instant,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionCookieRequest<'a> {
    id_token: &'a str,
    valid_duration: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionCookieResponse {
    session_cookie: String,
}

/// Client for the identity provider.
#[derive(Clone)]
pub struct IdentityProvider {
    project_id: String,
    id_tokens: TokenVerifier,
    sessions: TokenVerifier,
    service_account: Option<ServiceAccount>,
    oauth_token_url: String,
    identity_toolkit_url: String,
    access_token: Arc<RwLock<Option<CachedAccessToken>>>,
    http_client: reqwest::Client,
}

impl IdentityProvider {
    /// Create the provider client. Fails if the service-account key is not a valid RSA PEM.
    pub fn new(settings: &IdentitySettings) -> AppResult<Self> {
        let http_client = build_http_client()?;

        let service_account = match (&settings.client_email, &settings.private_key) {
            (Some(email), Some(key)) => {
                let signing_key = EncodingKey::from_rsa_pem(key.expose_secret().as_bytes())
                    .map_err(|e| {
                        AppError::Internal(format!("Invalid service account private key: {}", e))
                    })?;
                Some(ServiceAccount {
                    client_email: email.clone(),
                    signing_key,
                })
            }
            _ => {
                warn!(
                    "No service account configured: sign-in is disabled, \
                     existing session cookies are still verified"
                );
                None
            }
        };

        info!(
            "Identity provider initialized (project={}, session_jwks={}, id_token_jwks={})",
            settings.project_id, settings.session_jwks_url, settings.id_token_jwks_url
        );

        Ok(Self {
            project_id: settings.project_id.clone(),
            id_tokens: TokenVerifier::new(
                "id-token",
                settings.id_token_issuer(),
                settings.project_id.clone(),
                settings.id_token_jwks_url.clone(),
                http_client.clone(),
            ),
            sessions: TokenVerifier::new(
                "session",
                settings.session_issuer(),
                settings.project_id.clone(),
                settings.session_jwks_url.clone(),
                http_client.clone(),
            ),
            service_account,
            oauth_token_url: settings.oauth_token_url.clone(),
            identity_toolkit_url: settings.identity_toolkit_url.trim_end_matches('/').to_string(),
            access_token: Arc::new(RwLock::new(None)),
            http_client,
        })
    }

    pub fn can_create_sessions(&self) -> bool {
        self.service_account.is_some()
    }

    pub async fn verify_id_token(&self, token: &SecretString) -> AppResult<IdentityClaims> {
        self.id_tokens.verify(token).await
    }

    /// Exchange a freshly issued ID token for a session cookie valid for `ttl`.
    pub async fn create_session_cookie(
        &self,
        id_token: &SecretString,
        ttl: Duration,
    ) -> AppResult<SecretString> {
        let access_token = self.access_token().await?;

        let url = format!(
            "{}/v1/projects/{}:createSessionCookie",
            self.identity_toolkit_url, self.project_id
        );
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token.expose_secret())
            .json(&CreateSessionCookieRequest {
                id_token: id_token.expose_secret(),
                valid_duration: ttl.as_secs().to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("createSessionCookie rejected ({}): {}", status, body);
            return Err(AppError::Unauthorized(
                "Sign-in could not be completed".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(AppError::Identity(format!(
                "createSessionCookie returned {}",
                status
            )));
        }

        let body: CreateSessionCookieResponse = response.json().await?;
        Ok(SecretString::from(body.session_cookie))
    }

    /// Cached OAuth2 access token for the service account.
    async fn access_token(&self) -> AppResult<SecretString> {
        {
            let cache = self.access_token.read().await;
            if let Some(ref cached) = *cache
                && Instant::now() + ACCESS_TOKEN_REFRESH_MARGIN < cached.expires_at
            {
                return Ok(cached.token.clone());
            }
        }

        let account = self.service_account.as_ref().ok_or_else(|| {
            AppError::Identity("No service account configured for session creation".to_string())
        })?;

        let assertion = build_assertion(account, &self.oauth_token_url)?;
        let body = format!(
            "grant_type={}&assertion={}",
            urlencoding::encode(JWT_BEARER_GRANT),
            urlencoding::encode(&assertion)
        );

        let response = self
            .http_client
            .post(&self.oauth_token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            error!("Service account token exchange failed: {}", status);
            return Err(AppError::Identity(format!(
                "OAuth token endpoint returned {}",
                status
            )));
        }

        let parsed: AccessTokenResponse = response.json().await?;
        let lifetime = parsed
            .expires_in
            .unwrap_or(ACCESS_TOKEN_LIFETIME_SECS as u64);
        let token = SecretString::from(parsed.access_token);

        let mut cache = self.access_token.write().await;
        *cache = Some(CachedAccessToken {
            token: token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });
        debug!("Service account access token refreshed ({}s)", lifetime);

        Ok(token)
    }
}

#[async_trait]
impl SessionVerifier for IdentityProvider {
    async fn verify_session_cookie(&self, cookie: &str) -> AppResult<IdentityClaims> {
        self.sessions
            .verify(&SecretString::from(cookie.to_string()))
            .await
    }
}

/// Sign the JWT-bearer assertion for the OAuth token endpoint.
fn build_assertion(account: &ServiceAccount, token_url: &str) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let claims = AssertionClaims {
        iss: account.client_email.clone(),
        scope: OAUTH_SCOPES.to_string(),
        aud: token_url.to_string(),
        iat: now,
        exp: now + ACCESS_TOKEN_LIFETIME_SECS,
    };
    encode(&Header::new(Algorithm::RS256), &claims, &account.signing_key)
        .map_err(|e| AppError::Internal(format!("Failed to sign service account assertion: {}", e)))
}

/// Session cookies may only be minted right after an interactive sign-in.
pub fn is_recent_sign_in(claims: &IdentityClaims, now_secs: u64) -> bool {
    let signed_in_at = claims.auth_time.unwrap_or(claims.iat);
    now_secs.saturating_sub(signed_in_at) <= RECENT_SIGN_IN_SECS
}
