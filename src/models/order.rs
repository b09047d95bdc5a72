//! Modelo de Order (pedido)
//!
//! Un pedido agrupa renglones de producto y se despacha mediante una o
//! más entregas. Su estado agregado se deriva siempre del avance de sus
//! entregas y renglones, nunca se incrementa a mano.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use super::delivery::EstadoEntrega;

/// Estado del pedido - mapea al ENUM order_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    AwaitingPayment,
    Paid,
    PartiallyDispatched,
    DispatchedComplete,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "AWAITING_PAYMENT",
            OrderStatus::Paid => "PAID",
            OrderStatus::PartiallyDispatched => "PARTIALLY_DISPATCHED",
            OrderStatus::DispatchedComplete => "DISPATCHED_COMPLETE",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Order principal - mapea a la tabla orders
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub destination_id: Option<Uuid>,
    pub status: OrderStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Renglón del pedido con su avance de despacho
/// (SUM sobre delivery_items)
#[derive(Debug, Clone, FromRow)]
pub struct OrderItemProgress {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub position: i32,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit: String,
    pub dispatched_quantity: Decimal,
}

impl OrderItemProgress {
    pub fn pending(&self) -> Decimal {
        self.quantity - self.dispatched_quantity
    }

    pub fn is_complete(&self) -> bool {
        self.dispatched_quantity >= self.quantity
    }
}

/// Derivar el estado del pedido a partir del avance actual.
///
/// Función pura, se invoca después de cada transición de entrega:
/// - CANCELLED es pegajoso.
/// - DISPATCHED_COMPLETE si y solo si todos los renglones están
///   completos y al menos una entrega alcanzó SALIDA_OK.
/// - PARTIALLY_DISPATCHED si algo ya se despachó.
/// - En otro caso conserva el estado de pago fijado al crear.
pub fn derive_order_status(
    current: OrderStatus,
    items: &[OrderItemProgress],
    estados: &[EstadoEntrega],
) -> OrderStatus {
    if current == OrderStatus::Cancelled {
        return OrderStatus::Cancelled;
    }

    let all_complete = !items.is_empty() && items.iter().all(|i| i.is_complete());
    let any_exited = estados.iter().any(|e| *e == EstadoEntrega::SalidaOk);

    if all_complete && any_exited {
        return OrderStatus::DispatchedComplete;
    }

    if items.iter().any(|i| i.dispatched_quantity > Decimal::ZERO) {
        return OrderStatus::PartiallyDispatched;
    }

    match current {
        OrderStatus::AwaitingPayment => OrderStatus::AwaitingPayment,
        _ => OrderStatus::Paid,
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
            unit_price: Decimal::from(100),
            unit: "m3".to_string(),
            dispatched_quantity: Decimal::from(dispatched),
        }
    }

    #[test]
    fn test_paid_order_without_dispatch_stays_paid() {
        let status = derive_order_status(OrderStatus::Paid, &[item(10, 0)], &[]);
        assert_eq!(status, OrderStatus::Paid);
    }

    #[test]
    fn test_loaded_but_not_exited_is_partial() {
        // Escenario A: carga completa pero sin salida autorizada
        let status = derive_order_status(
            OrderStatus::Paid,
            &[item(10, 10)],
            &[EstadoEntrega::Cargada],
        );
        assert_eq!(status, OrderStatus::PartiallyDispatched);
    }

    #[test]
    fn test_complete_when_all_dispatched_and_one_exit() {
        let status = derive_order_status(
            OrderStatus::PartiallyDispatched,
            &[item(10, 10)],
            &[EstadoEntrega::SalidaOk],
        );
        assert_eq!(status, OrderStatus::DispatchedComplete);
    }

    #[test]
    fn test_two_trips_partial_then_complete() {
        // Escenario B: primer viaje saca 6 de 10
        let status = derive_order_status(
            OrderStatus::Paid,
            &[item(10, 6)],
            &[EstadoEntrega::SalidaOk, EstadoEntrega::Asignada],
        );
        assert_eq!(status, OrderStatus::PartiallyDispatched);

        // segundo viaje carga los 4 restantes
        let status = derive_order_status(
            status,
            &[item(10, 10)],
            &[EstadoEntrega::SalidaOk, EstadoEntrega::Cargada],
        );
        assert_eq!(status, OrderStatus::DispatchedComplete);
    }

    #[test]
    fn test_incomplete_item_blocks_complete() {
        let status = derive_order_status(
            OrderStatus::Paid,
            &[item(10, 10), item(5, 2)],
            &[EstadoEntrega::SalidaOk],
        );
        assert_eq!(status, OrderStatus::PartiallyDispatched);
    }

    #[test]
    fn test_cancelled_is_sticky() {
        let status = derive_order_status(
            OrderStatus::Cancelled,
            &[item(10, 10)],
            &[EstadoEntrega::SalidaOk],
        );
        assert_eq!(status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let items = [item(10, 6)];
        let estados = [EstadoEntrega::SalidaOk];
        let first = derive_order_status(OrderStatus::Paid, &items, &estados);
        let second = derive_order_status(first, &items, &estados);
        assert_eq!(first, second);
    }

    #[test]
    fn test_awaiting_payment_preserved() {
        let status = derive_order_status(OrderStatus::AwaitingPayment, &[item(10, 0)], &[]);
        assert_eq!(status, OrderStatus::AwaitingPayment);
    }
}
