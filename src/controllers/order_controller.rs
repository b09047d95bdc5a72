//! Controller de pedidos

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::dto::order_dto::{CreateOrderRequest, OrderListResponse, OrderResponse};
use crate::repositories::delivery_repository::DeliveryRepository;
use crate::repositories::order_repository::OrderRepository;
use crate::services::evidence_service::EvidenceStore;
use crate::services::fulfillment_service::FulfillmentService;
use crate::utils::errors::{not_found_error, validation_error, AppError};

pub struct OrderController {
    repository: OrderRepository,
    deliveries: DeliveryRepository,
    fulfillment: FulfillmentService,
}

impl OrderController {
    pub fn new(pool: PgPool, evidence: Arc<dyn EvidenceStore>, photo_required_at_load: bool) -> Self {
        Self {
            repository: OrderRepository::new(pool.clone()),
            deliveries: DeliveryRepository::new(pool.clone()),
            fulfillment: FulfillmentService::new(pool, evidence, photo_required_at_load),
        }
    }

    pub async fn create(
        &self,
        request: CreateOrderRequest,
        actor: Uuid,
    ) -> Result<OrderResponse, AppError> {
        request
            .validate()
            .map_err(|e| validation_error("request", &e.to_string()))?;

        let (order, items, _deliveries) = self.fulfillment.create_order(request, actor).await?;
        Ok(OrderResponse::from_parts(order, items))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<OrderResponse, AppError> {
        let order = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Order", &id.to_string()))?;
        let items = self.repository.items_progress_pool(id).await?;
        Ok(OrderResponse::from_parts(order, items))
    }

    pub async fn list(&self) -> Result<Vec<OrderListResponse>, AppError> {
        let orders = self.repository.list().await?;
        Ok(orders.into_iter().map(Into::into).collect())
    }

    pub async fn cancel(&self, id: Uuid, actor: Uuid) -> Result<OrderResponse, AppError> {
        let order = self.fulfillment.cancel_order(id, actor).await?;
        let items = self.repository.items_progress_pool(order.id).await?;
        Ok(OrderResponse::from_parts(order, items))
    }

    pub async fn list_deliveries(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<crate::dto::delivery_dto::DeliveryResponse>, AppError> {
        // 404 si el pedido no existe, lista vacía si no tiene entregas
        self.repository
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| not_found_error("Order", &order_id.to_string()))?;

        let deliveries = self.deliveries.list_by_order(order_id).await?;
        let mut responses = Vec::with_capacity(deliveries.len());
        for delivery in deliveries {
            let items = self.deliveries.items_for_delivery(delivery.id).await?;
            responses.push(crate::dto::delivery_dto::DeliveryResponse::from_parts(
                delivery, items,
            ));
        }
        Ok(responses)
    }
}
