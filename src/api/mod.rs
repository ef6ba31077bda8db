pub mod handlers;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
    web,
};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // API routes
        .nest("/api", api_routes())

        // Add state to the router
        .with_state(app_state.clone())

        // Result pages the browser lands on after checkout
        .merge(web::create_web_routes(app_state))

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/payments", payment_routes())
}

fn payment_routes() -> Router<AppState> {
    Router::new()
        // Gateway callbacks; authenticated by signature, not session
        .route("/payhere/notify", post(handlers::payments::payhere_notify))
        .route("/payhere/return", get(handlers::payments::payhere_return))
        .route("/:order_id/status", get(handlers::payments::status))
}
