// Route exports
pub mod auth;
pub mod partners;

use actix_web::web;

pub use partners::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(partners::configure),
    );
}
