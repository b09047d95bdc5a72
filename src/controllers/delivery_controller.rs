//! Controller de entregas

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::delivery_dto::{
    AssignDeliveryRequest, DeliveryResponse, TransitionDeliveryRequest, TransitionDeliveryResponse,
};
use crate::repositories::delivery_repository::DeliveryRepository;
use crate::services::evidence_service::EvidenceStore;
use crate::services::fulfillment_service::FulfillmentService;
use crate::utils::errors::{not_found_error, AppError};

pub struct DeliveryController {
    repository: DeliveryRepository,
    fulfillment: FulfillmentService,
}

impl DeliveryController {
    pub fn new(pool: PgPool, evidence: Arc<dyn EvidenceStore>, photo_required_at_load: bool) -> Self {
        Self {
            repository: DeliveryRepository::new(pool.clone()),
            fulfillment: FulfillmentService::new(pool, evidence, photo_required_at_load),
        }
    }

    pub async fn assign(
        &self,
        request: AssignDeliveryRequest,
        actor: Uuid,
    ) -> Result<DeliveryResponse, AppError> {
        let delivery = self.fulfillment.assign_delivery(request, actor).await?;
        Ok(DeliveryResponse::from_parts(delivery, Vec::new()))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<DeliveryResponse, AppError> {
        let delivery = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Delivery", &id.to_string()))?;
        let items = self.repository.items_for_delivery(id).await?;
        Ok(DeliveryResponse::from_parts(delivery, items))
    }

    pub async fn transition(
        &self,
        id: Uuid,
        request: TransitionDeliveryRequest,
        actor: Uuid,
    ) -> Result<TransitionDeliveryResponse, AppError> {
        let outcome = self.fulfillment.transition_delivery(id, request, actor).await?;
        let items = self.repository.items_for_delivery(id).await?;
        Ok(TransitionDeliveryResponse {
            delivery: DeliveryResponse::from_parts(outcome.delivery, items),
            order_status: outcome.order_status,
        })
    }
}
