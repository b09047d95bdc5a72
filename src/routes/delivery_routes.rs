use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::delivery_controller::DeliveryController;
use crate::dto::delivery_dto::{
    AssignDeliveryRequest, DeliveryResponse, TransitionDeliveryRequest, TransitionDeliveryResponse,
};
use crate::routes::actor_from_headers;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_delivery_router() -> Router<AppState> {
    Router::new()
        .route("/", post(assign_delivery))
        .route("/:id", get(get_delivery))
        .route("/:id", patch(transition_delivery))
}

fn controller(state: &AppState) -> DeliveryController {
    DeliveryController::new(
        state.pool.clone(),
        state.evidence.clone(),
        state.config.photo_required_at_load,
    )
}

async fn assign_delivery(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AssignDeliveryRequest>,
) -> Result<(StatusCode, Json<DeliveryResponse>), AppError> {
    let actor = actor_from_headers(&headers)?;
    let response = controller(&state).assign(request, actor).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryResponse>, AppError> {
    let response = controller(&state).get_by_id(id).await?;
    Ok(Json(response))
}

async fn transition_delivery(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionDeliveryRequest>,
) -> Result<Json<TransitionDeliveryResponse>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let response = controller(&state).transition(id, request, actor).await?;
    Ok(Json(response))
}
