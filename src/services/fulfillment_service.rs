//! Coordinador de despacho
//!
//! Punto único de entrada para el flujo pedido → entregas:
//! crea pedidos, asigna viajes, valida cada transición de la máquina
//! de estados y vuelve a derivar el estado del pedido después de cada
//! cambio. Transición de entrega y actualización del pedido se
//! persisten en una sola transacción: o ambas quedan, o ninguna.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::dto::delivery_dto::{AssignDeliveryRequest, TransitionDeliveryRequest};
use crate::dto::order_dto::CreateOrderRequest;
use crate::models::delivery::{Delivery, EstadoEntrega};
use crate::models::order::{derive_order_status, Order, OrderItemProgress, OrderStatus};
use crate::repositories::catalog_repository::CatalogRepository;
use crate::repositories::delivery_repository::DeliveryRepository;
use crate::repositories::order_repository::{NewOrderItem, OrderRepository};
use crate::services::evidence_service::{decode_photo, EvidenceStore};
use crate::utils::errors::{not_found_error, validation_error, AppError};
use crate::utils::validation::{require_non_negative, require_positive};

/// Resultado de una transición: entrega actualizada + estado del pedido
pub struct TransitionOutcome {
    pub delivery: Delivery,
    pub order_status: OrderStatus,
}

pub struct FulfillmentService {
    pool: PgPool,
    orders: OrderRepository,
    deliveries: DeliveryRepository,
    catalog: CatalogRepository,
    evidence: Arc<dyn EvidenceStore>,
    photo_required_at_load: bool,
}

impl FulfillmentService {
    pub fn new(pool: PgPool, evidence: Arc<dyn EvidenceStore>, photo_required_at_load: bool) -> Self {
        Self {
            orders: OrderRepository::new(pool.clone()),
            deliveries: DeliveryRepository::new(pool.clone()),
            catalog: CatalogRepository::new(pool.clone()),
            pool,
            evidence,
            photo_required_at_load,
        }
    }

    /// Crear pedido + renglones (y entregas inline si vienen) en una
    /// sola transacción
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        actor: Uuid,
    ) -> Result<(Order, Vec<OrderItemProgress>, Vec<Delivery>), AppError> {
        if request.items.is_empty() {
            return Err(validation_error("items", "order must have at least one item"));
        }

        let customer = self
            .catalog
            .find_customer(request.customer_id)
            .await?
            .filter(|c| c.active)
            .ok_or_else(|| not_found_error("Customer", &request.customer_id.to_string()))?;

        if let Some(destination_id) = request.destination_id {
            self.catalog
                .find_destination(destination_id)
                .await?
                .filter(|d| d.active)
                .ok_or_else(|| not_found_error("Destination", &destination_id.to_string()))?;
        }

        let mut new_items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            require_positive("quantity", item.quantity)?;
            require_non_negative("unit_price", item.unit_price)?;

            let product = self
                .catalog
                .find_product(item.product_id)
                .await?
                .filter(|p| p.active)
                .ok_or_else(|| not_found_error("Product", &item.product_id.to_string()))?;

            new_items.push(NewOrderItem {
                product_id: product.id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                unit: item.unit.clone().unwrap_or(product.unit),
            });
        }

        for assignment in &request.deliveries {
            self.check_truck_and_driver(assignment.truck_id, assignment.driver_id)
                .await?;
        }

        let status = if request.paid {
            OrderStatus::Paid
        } else {
            OrderStatus::AwaitingPayment
        };

        let mut tx = self.pool.begin().await?;
        let order = self
            .orders
            .insert_order(&mut tx, request.customer_id, request.destination_id, status, actor)
            .await?;
        self.orders.insert_items(&mut tx, order.id, &new_items).await?;

        let mut created_deliveries = Vec::new();
        for assignment in &request.deliveries {
            let delivery = self
                .deliveries
                .insert(&mut tx, order.id, assignment.truck_id, assignment.driver_id, actor)
                .await
                .map_err(map_booking_conflict)?;
            created_deliveries.push(delivery);
        }
        tx.commit().await?;

        info!(
            "Pedido {} creado para cliente {} con {} renglones y {} entregas",
            order.order_number,
            customer.name,
            new_items.len(),
            created_deliveries.len()
        );

        let items = self.orders.items_progress_pool(order.id).await?;
        Ok((order, items, created_deliveries))
    }

    /// Asignar un viaje camión+chofer a un pedido existente
    pub async fn assign_delivery(
        &self,
        request: AssignDeliveryRequest,
        actor: Uuid,
    ) -> Result<Delivery, AppError> {
        let order = self
            .orders
            .find_by_id(request.order_id)
            .await?
            .ok_or_else(|| not_found_error("Order", &request.order_id.to_string()))?;

        match order.status {
            OrderStatus::Cancelled => {
                return Err(AppError::Conflict(format!(
                    "Order {} is cancelled",
                    order.order_number
                )))
            }
            OrderStatus::DispatchedComplete => {
                return Err(AppError::Conflict(format!(
                    "Order {} is already fully dispatched",
                    order.order_number
                )))
            }
            _ => {}
        }

        self.check_truck_and_driver(request.truck_id, request.driver_id)
            .await?;

        let mut tx = self.pool.begin().await?;
        let delivery = self
            .deliveries
            .insert(&mut tx, order.id, request.truck_id, request.driver_id, actor)
            .await
            .map_err(map_booking_conflict)?;
        tx.commit().await?;

        info!(
            "Entrega {} asignada al pedido {} (camión {}, chofer {})",
            delivery.id, order.order_number, request.truck_id, request.driver_id
        );
        Ok(delivery)
    }

    /// Aplicar una transición de la máquina de estados.
    ///
    /// La foto (si viene) se sube ANTES de abrir la transacción: si el
    /// upload falla, la transición completa falla y el estado no cambia.
    /// Dentro de la transacción se bloquean el pedido y luego la entrega
    /// con FOR UPDATE, se revalida la tabla de transiciones, se aplican
    /// los efectos y se rederiva el estado del pedido.
    pub async fn transition_delivery(
        &self,
        delivery_id: Uuid,
        request: TransitionDeliveryRequest,
        actor: Uuid,
    ) -> Result<TransitionOutcome, AppError> {
        let current = self
            .deliveries
            .find_by_id(delivery_id)
            .await?
            .ok_or_else(|| not_found_error("Delivery", &delivery_id.to_string()))?;

        let target = request.target();
        // Chequeo rápido fuera de la transacción; se repite bajo lock
        if !current.estado.can_transition_to(target) {
            return Err(AppError::InvalidStateTransition {
                from: current.estado,
                to: target,
            });
        }

        let photo_url = self.upload_photo_if_needed(&current, &request).await?;

        let mut tx = self.pool.begin().await?;

        // Orden de adquisición pedido → entrega, el mismo que usa
        // cancel_order; con un único orden no se forman ciclos de espera
        let order = self
            .orders
            .find_by_id_locked(&mut tx, current.order_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("order {} missing for delivery", current.order_id))
            })?;
        let delivery = self
            .deliveries
            .find_by_id_locked(&mut tx, delivery_id)
            .await?
            .ok_or_else(|| not_found_error("Delivery", &delivery_id.to_string()))?;

        if order.status == OrderStatus::Cancelled {
            return Err(AppError::Conflict(format!(
                "Order {} is cancelled; no further progress allowed",
                order.order_number
            )));
        }
        if !delivery.estado.can_transition_to(target) {
            return Err(AppError::InvalidStateTransition {
                from: delivery.estado,
                to: target,
            });
        }

        let updated = match &request {
            TransitionDeliveryRequest::EnCarga { notes } => {
                self.deliveries
                    .mark_en_carga(&mut tx, delivery_id, notes.as_deref())
                    .await?
            }
            TransitionDeliveryRequest::Cargada {
                loaded_quantity,
                notes,
                ..
            } => {
                require_positive("loaded_quantity", *loaded_quantity)?;
                let items = self.orders.items_progress(&mut tx, order.id).await?;
                let allocations = allocate_load(*loaded_quantity, &items)?;
                self.deliveries
                    .insert_delivery_items(&mut tx, delivery_id, &allocations)
                    .await?;
                self.deliveries
                    .mark_cargada(
                        &mut tx,
                        delivery_id,
                        *loaded_quantity,
                        photo_url.as_deref(),
                        actor,
                        notes.as_deref(),
                    )
                    .await?
            }
            TransitionDeliveryRequest::SalidaOk { notes, .. } => {
                let url = photo_url.as_deref().ok_or_else(|| {
                    validation_error("photoFile", "exit photo is required")
                })?;
                self.deliveries
                    .mark_salida_ok(&mut tx, delivery_id, url, actor, notes.as_deref())
                    .await?
            }
            TransitionDeliveryRequest::Rechazada { notes } => {
                self.deliveries
                    .mark_rechazada(&mut tx, delivery_id, notes.as_deref())
                    .await?
            }
        };

        let items = self.orders.items_progress(&mut tx, order.id).await?;
        let estados = self.orders.delivery_estados(&mut tx, order.id).await?;
        let new_status = derive_order_status(order.status, &items, &estados);
        if new_status != order.status {
            self.orders.update_status(&mut tx, order.id, new_status).await?;
        }

        tx.commit().await?;

        info!(
            "Entrega {} pasó a {}; pedido {} ahora {}",
            delivery_id,
            target.as_str(),
            order.order_number,
            new_status.as_str()
        );

        Ok(TransitionOutcome {
            delivery: updated,
            order_status: new_status,
        })
    }

    /// Cancelar un pedido. Acción compensatoria: solo procede si ningún
    /// viaje cargó o salió ya; rechaza las entregas activas restantes.
    pub async fn cancel_order(&self, order_id: Uuid, actor: Uuid) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;

        let order = self
            .orders
            .find_by_id_locked(&mut tx, order_id)
            .await?
            .ok_or_else(|| not_found_error("Order", &order_id.to_string()))?;

        if order.status == OrderStatus::Cancelled {
            tx.rollback().await?;
            return Ok(order);
        }

        let estados = self.orders.delivery_estados(&mut tx, order_id).await?;
        if cancellation_blocked(&estados) {
            return Err(AppError::Conflict(format!(
                "Order {} has deliveries already loaded or dispatched",
                order.order_number
            )));
        }

        let rejected = self
            .deliveries
            .reject_active_for_order(&mut tx, order_id, "Pedido cancelado")
            .await?;
        self.orders
            .update_status(&mut tx, order_id, OrderStatus::Cancelled)
            .await?;
        tx.commit().await?;

        info!(
            "Pedido {} cancelado por {} ({} entregas rechazadas)",
            order.order_number, actor, rejected
        );

        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::Internal("cancelled order vanished".to_string()))
    }

    async fn check_truck_and_driver(&self, truck_id: Uuid, driver_id: Uuid) -> Result<(), AppError> {
        self.catalog
            .find_truck(truck_id)
            .await?
            .filter(|t| t.active)
            .ok_or_else(|| not_found_error("Truck", &truck_id.to_string()))?;
        self.catalog
            .find_driver(driver_id)
            .await?
            .filter(|d| d.active)
            .ok_or_else(|| not_found_error("Driver", &driver_id.to_string()))?;

        if self.deliveries.truck_has_active_delivery(truck_id).await? {
            return Err(AppError::Conflict(format!(
                "Truck {} already has an active delivery",
                truck_id
            )));
        }
        if self.deliveries.driver_has_active_delivery(driver_id).await? {
            return Err(AppError::Conflict(format!(
                "Driver {} already has an active delivery",
                driver_id
            )));
        }
        Ok(())
    }

    /// Valida la política de fotos del punto de control y sube la que
    /// venga en el payload
    async fn upload_photo_if_needed(
        &self,
        delivery: &Delivery,
        request: &TransitionDeliveryRequest,
    ) -> Result<Option<String>, AppError> {
        let photo = request.photo();
        let checkpoint = photo_checkpoint(
            request.target(),
            self.photo_required_at_load,
            photo.is_some(),
        )?;

        match (checkpoint, photo) {
            (Some(checkpoint), Some(payload)) => {
                let bytes = decode_photo(&payload)?;
                let url = self
                    .evidence
                    .store_photo(delivery.id, checkpoint, &payload.content_type, bytes)
                    .await?;
                Ok(Some(url))
            }
            _ => Ok(None),
        }
    }
}

/// Política de evidencia fotográfica por punto de control: la foto de
/// salida siempre es obligatoria, la de carga según configuración.
/// Ok(Some(checkpoint)) cuando hay foto que subir, error cuando falta
/// una obligatoria.
pub fn photo_checkpoint(
    target: EstadoEntrega,
    photo_required_at_load: bool,
    has_photo: bool,
) -> Result<Option<&'static str>, AppError> {
    let (checkpoint, required) = match target {
        EstadoEntrega::Cargada => ("load", photo_required_at_load),
        EstadoEntrega::SalidaOk => ("exit", true),
        _ => return Ok(None),
    };

    match (has_photo, required) {
        (true, _) => Ok(Some(checkpoint)),
        (false, true) => Err(validation_error(
            "photoFile",
            "a photo is required at this checkpoint",
        )),
        (false, false) => Ok(None),
    }
}

/// La cancelación es compensatoria: queda bloqueada en cuanto algún
/// viaje del pedido cargó material o salió
pub fn cancellation_blocked(estados: &[EstadoEntrega]) -> bool {
    estados
        .iter()
        .any(|e| matches!(e, EstadoEntrega::Cargada | EstadoEntrega::SalidaOk))
}

/// Repartir la cantidad cargada entre los renglones pendientes del
/// pedido, llenando en orden de posición. Si la entrega alcanza para un
/// solo renglón pendiente esto degenera en asignación directa.
pub fn allocate_load(
    loaded: Decimal,
    items: &[OrderItemProgress],
) -> Result<Vec<(Uuid, Decimal)>, AppError> {
    let total_pending: Decimal = items.iter().map(|i| i.pending()).sum();
    if loaded > total_pending {
        return Err(AppError::Conflict(format!(
            "loaded quantity {} exceeds pending quantity {}",
            loaded, total_pending
        )));
    }

    let mut remaining = loaded;
    let mut allocations = Vec::new();
    for item in items {
        if remaining <= Decimal::ZERO {
            break;
        }
        let take = remaining.min(item.pending());
        if take > Decimal::ZERO {
            allocations.push((item.id, take));
            remaining -= take;
        }
    }
    Ok(allocations)
}

// El repositorio inserta contra los índices parciales únicos de
// camión/chofer activo; una violación ahí es doble asignación
fn map_booking_conflict(error: AppError) -> AppError {
    match error {
        AppError::Database(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
            AppError::Conflict("truck or driver already has an active delivery".to_string())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(requested: i64, dispatched: i64) -> OrderItemProgress {
        OrderItemProgress {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            position: 0,
            quantity: Decimal::from(requested),
            unit_price: Decimal::from(50),
            unit: "m3".to_string(),
            dispatched_quantity: Decimal::from(dispatched),
        }
    }

    #[test]
    fn test_single_item_direct_assignment() {
        let items = [item(10, 0)];
        let allocations = allocate_load(Decimal::from(10), &items).unwrap();
        assert_eq!(allocations, vec![(items[0].id, Decimal::from(10))]);
    }

    #[test]
    fn test_sequential_fill_across_items() {
        let items = [item(10, 0), item(5, 0)];
        let allocations = allocate_load(Decimal::from(12), &items).unwrap();
        assert_eq!(
            allocations,
            vec![
                (items[0].id, Decimal::from(10)),
                (items[1].id, Decimal::from(2)),
            ]
        );
    }

    #[test]
    fn test_partial_progress_respected() {
        // Escenario B: ya salieron 6 de 10, el segundo viaje trae 4
        let items = [item(10, 6)];
        let allocations = allocate_load(Decimal::from(4), &items).unwrap();
        assert_eq!(allocations, vec![(items[0].id, Decimal::from(4))]);
    }

    #[test]
    fn test_over_allocation_is_conflict() {
        // Escenario B: 6 ya despachados, cargar 6 más excedería los 10
        let items = [item(10, 6)];
        let result = allocate_load(Decimal::from(6), &items);
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_completed_items_are_skipped() {
        let items = [item(10, 10), item(5, 0)];
        let allocations = allocate_load(Decimal::from(5), &items).unwrap();
        assert_eq!(allocations, vec![(items[1].id, Decimal::from(5))]);
    }

    #[test]
    fn test_allocation_never_exceeds_requested() {
        let items = [item(10, 3), item(8, 0)];
        let allocations = allocate_load(Decimal::from(15), &items).unwrap();
        let total: Decimal = allocations.iter().map(|(_, q)| *q).sum();
        assert_eq!(total, Decimal::from(15));
        // el primer renglón solo recibe lo que le falta
        assert_eq!(allocations[0], (items[0].id, Decimal::from(7)));
        assert_eq!(allocations[1], (items[1].id, Decimal::from(8)));
    }

    #[test]
    fn test_exit_photo_always_required() {
        // Escenario D: autorizar salida sin foto es error de validación
        let result = photo_checkpoint(EstadoEntrega::SalidaOk, false, false);
        assert!(matches!(result, Err(AppError::Validation { .. })));

        let checkpoint = photo_checkpoint(EstadoEntrega::SalidaOk, false, true).unwrap();
        assert_eq!(checkpoint, Some("exit"));
    }

    #[test]
    fn test_load_photo_follows_policy() {
        // sin política la foto de carga es opcional
        assert_eq!(
            photo_checkpoint(EstadoEntrega::Cargada, false, false).unwrap(),
            None
        );
        assert_eq!(
            photo_checkpoint(EstadoEntrega::Cargada, false, true).unwrap(),
            Some("load")
        );

        // con política activa la falta de foto bloquea la transición
        let result = photo_checkpoint(EstadoEntrega::Cargada, true, false);
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_other_checkpoints_take_no_photo() {
        assert_eq!(
            photo_checkpoint(EstadoEntrega::EnCarga, true, false).unwrap(),
            None
        );
        assert_eq!(
            photo_checkpoint(EstadoEntrega::Rechazada, true, false).unwrap(),
            None
        );
    }

    #[test]
    fn test_cancellation_blocked_once_material_loaded() {
        // Escenario E: con un viaje CARGADA el pedido ya no se cancela
        assert!(cancellation_blocked(&[
            EstadoEntrega::SalidaOk,
            EstadoEntrega::Asignada,
        ]));
        assert!(cancellation_blocked(&[EstadoEntrega::Cargada]));
    }

    #[test]
    fn test_cancellation_open_before_loading() {
        assert!(!cancellation_blocked(&[]));
        assert!(!cancellation_blocked(&[
            EstadoEntrega::Asignada,
            EstadoEntrega::EnCarga,
            EstadoEntrega::Rechazada,
        ]));
    }
}
