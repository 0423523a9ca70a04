//! Fan wiki server - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::http::header::{self, HeaderName};
use actix_web::{App, HttpRequest, HttpServer, Result as ActixResult, web};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use fanwiki_lib::api::{self, ApiDoc};
use fanwiki_lib::auth::AdminKey;
use fanwiki_lib::config::{ADMIN_KEY_HEADER, CSRF_HEADER, Config};
use fanwiki_lib::db::DbPool;
use fanwiki_lib::middleware::{
    CsrfProtection, InMemoryRateLimitStore, RateLimitStore, RateLimiter, RequestLogger,
};
use fanwiki_lib::services::{self, IdentityProvider};

/// SPA fallback handler - serves index.html for client-side routing.
async fn spa_fallback(req: HttpRequest) -> ActixResult<NamedFile> {
    let static_dir = req
        .app_data::<web::Data<PathBuf>>()
        .ok_or_else(|| actix_web::error::ErrorNotFound("Not found"))?;
    Ok(NamedFile::open(static_dir.join("index.html"))?)
}

/// Perform health check (for Docker healthcheck).
fn health_check() -> bool {
    Config::from_env().is_ok()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn build_cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static(CSRF_HEADER),
            HeaderName::from_static("x-admin-key"),
        ])
        .supports_credentials()
        .max_age(3600);
    for origin in allowed_origins {
        cors = cors.allowed_origin(origin);
    }
    cors
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if health_check() { 0 } else { 1 });
    }

    dotenvy::dotenv().ok();
    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL and the identity project must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Fan Wiki Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }
    fanwiki_lib::error::set_expose_detail(config.is_development());

    let pool = match DbPool::new(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };
    info!("Database connection established");

    if let Err(e) = pool.run_migrations().await {
        error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    let identity = match IdentityProvider::new(&config.identity) {
        Ok(identity) => identity,
        Err(e) => {
            error!("Failed to initialize identity provider: {}", e);
            std::process::exit(1);
        }
    };
    if !identity.can_create_sessions() {
        warn!("No service account configured; sign-in is disabled, existing sessions still verify");
    }

    let admin_key = AdminKey::new(config.admin_key.clone());
    if admin_key.is_configured() {
        info!("Bootstrap admin key enabled ({} header)", ADMIN_KEY_HEADER);
    }

    let rate_limit_store: Arc<dyn RateLimitStore> = Arc::new(InMemoryRateLimitStore::new(
        config.security.rate_limit_max_requests,
        config.security.rate_limit_window(),
    ));
    info!(
        "Rate limit: {} requests per {}s per client",
        config.security.rate_limit_max_requests, config.security.rate_limit_window_secs
    );
    let rate_limiter =
        RateLimiter::new(rate_limit_store).trust_proxies(&config.security.trusted_proxies);
    if !config.security.trusted_proxies.is_empty() {
        info!(
            "Trusting forwarded client addresses from {:?}",
            config.security.trusted_proxies
        );
    }

    let bind_address = config.bind_address();
    let static_dir = config.static_dir.clone();
    let is_development = config.is_development();
    let allowed_origins = config.security.allowed_origins.clone();

    if let Some(ref dir) = static_dir {
        info!("Static file serving enabled from {:?}", dir);
    }

    let worker_count = if is_development { 4 } else { num_cpus::get() };
    info!(
        "Starting server at http://{} ({} workers)",
        bind_address, worker_count
    );

    let config = web::Data::new(config);
    let pool = web::Data::new(pool);
    let identity = web::Data::new(identity);
    let admin_key = web::Data::new(admin_key);

    let server = HttpServer::new(move || {
        let mut app = App::new()
            .wrap(RequestLogger)
            .wrap(build_cors(&allowed_origins))
            .app_data(config.clone())
            .app_data(pool.clone())
            .app_data(identity.clone())
            .app_data(admin_key.clone());

        // Registered ahead of the /api scope so docs bypass its guards
        if is_development {
            app = app.service(
                SwaggerUi::new("/api/docs/{_:.*}").url("/api/openapi.json", ApiDoc::openapi()),
            );
        }

        app = app.service(
            web::scope("/api")
                .wrap(CsrfProtection)
                .wrap(rate_limiter.clone())
                .configure(api::configure_health_routes)
                .configure(services::configure_auth_routes)
                .configure(api::configure_content_routes)
                .configure(api::configure_admin_routes),
        );

        // Serve the built frontend when STATIC_DIR is set
        if let Some(ref dir) = static_dir {
            app = app
                .app_data(web::Data::new(dir.clone()))
                .service(Files::new("/assets", dir.join("assets")).prefer_utf8(true))
                .default_service(web::route().to(spa_fallback));
        }

        app
    });

    server.workers(worker_count).bind(&bind_address)?.run().await
}
