//! # Blogicum
//!
//! Server-rendered blog: posts grouped by category and location, comments,
//! profiles and a Prometheus endpoint, on actix-web and tera.

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::{NormalizePath, TrailingSlash};
use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use blogicum_core::forms::MAX_IMAGE_BYTES;
use config::AppConfig;
use state::AppState;
use telemetry::TelemetryConfig;

/// Url-encoded bodies larger than this are rejected.
const FORM_LIMIT: usize = 1024 * 1024;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!("Starting Blogicum on {}:{}", config.host, config.port);

    let state = AppState::new(&config)
        .await
        .map_err(|e| std::io::Error::other(format!("loading templates: {}", e)))?;
    let state = web::Data::new(state);

    HttpServer::new(move || build_app(state.clone()))
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
}

/// The application with every middleware, shared by the server and the tests.
pub(crate) fn build_app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap(middleware::error::error_handlers())
        .wrap(NormalizePath::new(TrailingSlash::Trim))
        .wrap(TracingLogger::default())
        .wrap_fn(|req, srv| {
            if let Some(state) = req.app_data::<web::Data<AppState>>() {
                state.metrics.record_request();
            }
            srv.call(req)
        })
        .app_data(state)
        .app_data(web::FormConfig::default().limit(FORM_LIMIT))
        .app_data(web::PayloadConfig::new(2 * MAX_IMAGE_BYTES))
        .configure(handlers::configure_routes)
}
