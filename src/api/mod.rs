//! API endpoint modules.

pub mod admin;
pub mod health;
pub mod news;
pub mod openapi;
pub mod wiki;

use actix_web::web;

pub use health::configure_health_routes;
pub use openapi::ApiDoc;

/// Public content routes.
pub fn configure_content_routes(cfg: &mut web::ServiceConfig) {
    wiki::configure_public_routes(cfg);
    news::configure_public_routes(cfg);
}

/// Admin routes, mounted under `/admin`.
pub fn configure_admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .configure(wiki::configure_admin_routes)
            .configure(news::configure_admin_routes)
            .configure(admin::configure_routes),
    );
}
