pub mod payment_pages;
pub mod templates;

use axum::{
    Router,
    routing::get,
};
use crate::api::state::AppState;

pub fn create_web_routes(state: AppState) -> Router {
    Router::new()
        .nest("/competitions/payment", payment_page_routes())
        .with_state(state)
}

fn payment_page_routes() -> Router<AppState> {
    Router::new()
        .route("/success/:order_id", get(payment_pages::success_page))
        .route("/processing/:order_id", get(payment_pages::processing_page))
        .route("/failed/:order_id", get(payment_pages::failed_page))
        .route("/error", get(payment_pages::error_page))
}
