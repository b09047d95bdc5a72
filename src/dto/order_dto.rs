//! DTOs de pedidos

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::order::{Order, OrderItemProgress, OrderStatus};

/// Request para crear un pedido
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub destination_id: Option<Uuid>,

    #[validate(length(min = 1, message = "order must have at least one item"))]
    pub items: Vec<CreateOrderItemRequest>,

    /// Modelo de venta de contado: el pago se captura al crear.
    /// `false` deja el pedido en AWAITING_PAYMENT.
    #[serde(default = "default_paid")]
    pub paid: bool,

    /// Asignaciones de entrega creadas junto con el pedido
    #[serde(default)]
    pub deliveries: Vec<AssignDeliveryInline>,
}

fn default_paid() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateOrderItemRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignDeliveryInline {
    pub truck_id: Uuid,
    pub driver_id: Uuid,
}

/// Response de renglón con avance de despacho
#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub position: i32,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit: String,
    pub dispatched_quantity: Decimal,
    pub subtotal: Decimal,
}

impl From<OrderItemProgress> for OrderItemResponse {
    fn from(item: OrderItemProgress) -> Self {
        let subtotal = item.quantity * item.unit_price;
        Self {
            id: item.id,
            product_id: item.product_id,
            position: item.position,
            quantity: item.quantity,
            unit_price: item.unit_price,
            unit: item.unit,
            dispatched_quantity: item.dispatched_quantity,
            subtotal,
        }
    }
}

/// Response de pedido completo
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub destination_id: Option<Uuid>,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub total: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderResponse {
    pub fn from_parts(order: Order, items: Vec<OrderItemProgress>) -> Self {
        let items: Vec<OrderItemResponse> = items.into_iter().map(Into::into).collect();
        let total = items.iter().map(|i| i.subtotal).sum();
        Self {
            id: order.id,
            order_number: order.order_number,
            customer_id: order.customer_id,
            destination_id: order.destination_id,
            status: order.status,
            items,
            total,
            created_by: order.created_by,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Response resumida para listados
#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderListResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            customer_id: order.customer_id,
            status: order.status,
            created_at: order.created_at,
        }
    }
}
