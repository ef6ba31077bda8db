use axum::{http::StatusCode, Json, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Archalley Competitions",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Competition registration and payment service",
        "endpoints": {
            "health": "/health",
            "notify": "/api/payments/payhere/notify",
            "return": "/api/payments/payhere/return",
            "status": "/api/payments/:order_id/status"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
