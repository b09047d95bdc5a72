use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::order_controller::OrderController;
use crate::dto::delivery_dto::DeliveryResponse;
use crate::dto::order_dto::{CreateOrderRequest, OrderListResponse, OrderResponse};
use crate::dto::ApiResponse;
use crate::routes::actor_from_headers;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_order_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id", delete(cancel_order))
        .route("/:id/deliveries", get(list_order_deliveries))
}

fn controller(state: &AppState) -> OrderController {
    OrderController::new(
        state.pool.clone(),
        state.evidence.clone(),
        state.config.photo_required_at_load,
    )
}

async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let actor = actor_from_headers(&headers)?;
    let response = controller(&state).create(request, actor).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let response = controller(&state).get_by_id(id).await?;
    Ok(Json(response))
}

async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderListResponse>>, AppError> {
    let response = controller(&state).list().await?;
    Ok(Json(response))
}

async fn cancel_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let response = controller(&state).cancel(id, actor).await?;
    Ok(Json(ApiResponse::success_with_message(
        response,
        "Pedido cancelado".to_string(),
    )))
}

async fn list_order_deliveries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DeliveryResponse>>, AppError> {
    let response = controller(&state).list_deliveries(id).await?;
    Ok(Json(response))
}
