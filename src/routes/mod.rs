pub mod delivery_routes;
pub mod order_routes;

use axum::{http::HeaderMap, response::Json, routing::get, Router};
use serde_json::json;
use uuid::Uuid;

use crate::middleware::cors::{cors_middleware, cors_middleware_with_origins};
use crate::state::AppState;
use crate::utils::errors::{validation_error, AppError};

/// Router completo de la aplicación
pub fn create_app(state: AppState) -> Router {
    // Fuera de desarrollo el CORS se restringe a los orígenes configurados
    let cors = if state.config.is_development() || state.config.cors_origins.is_empty() {
        cors_middleware()
    } else {
        cors_middleware_with_origins(state.config.cors_origins.clone())
    };

    Router::new()
        .route("/health", get(health))
        .nest("/orders", order_routes::create_order_router())
        .nest("/deliveries", delivery_routes::create_delivery_router())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "service": "quarry-dispatch",
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

// TODO: reemplazar por la identidad del token cuando el servicio de
// auth exponga su middleware; por ahora el gateway manda el header
/// Actor que ejecuta la operación, tomado del header X-Actor-Id.
/// Sin header se registra el actor nulo; un header malformado es 400,
/// no un UUID nulo silencioso en las columnas de auditoría.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let Some(value) = headers.get("x-actor-id") else {
        return Ok(Uuid::nil());
    };
    value
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| validation_error("X-Actor-Id", "must be a valid UUID"))
}
