//! DTOs de entregas
//!
//! El payload del PATCH es una unión discriminada por `estado`: los
//! campos requeridos difieren según el estado destino, así que cada
//! variante declara exactamente lo que acepta.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::delivery::{Delivery, DeliveryItem, EstadoEntrega};
use crate::models::order::OrderStatus;

/// Request para asignar una entrega a un pedido existente
#[derive(Debug, Deserialize)]
pub struct AssignDeliveryRequest {
    pub order_id: Uuid,
    pub truck_id: Uuid,
    pub driver_id: Uuid,
}

/// Foto capturada en el punto de control, codificada en base64
#[derive(Debug, Clone)]
pub struct PhotoPayload {
    pub photo_file: String,
    pub content_type: String,
}

/// Transición de estado solicitada, discriminada por `estado`
#[derive(Debug, Deserialize)]
#[serde(tag = "estado")]
pub enum TransitionDeliveryRequest {
    /// Patio inicia la carga
    #[serde(rename = "EN_CARGA")]
    EnCarga { notes: Option<String> },

    /// Patio termina la carga: cantidad obligatoria, foto según política
    #[serde(rename = "CARGADA")]
    Cargada {
        loaded_quantity: Decimal,
        #[serde(rename = "photoFile")]
        photo_file: Option<String>,
        content_type: Option<String>,
        notes: Option<String>,
    },

    /// Seguridad autoriza la salida: foto obligatoria
    #[serde(rename = "SALIDA_OK")]
    SalidaOk {
        #[serde(rename = "photoFile")]
        photo_file: Option<String>,
        content_type: Option<String>,
        notes: Option<String>,
    },

    /// Rechazo antes de cargar
    #[serde(rename = "RECHAZADA")]
    Rechazada { notes: Option<String> },
}

impl TransitionDeliveryRequest {
    pub fn target(&self) -> EstadoEntrega {
        match self {
            TransitionDeliveryRequest::EnCarga { .. } => EstadoEntrega::EnCarga,
            TransitionDeliveryRequest::Cargada { .. } => EstadoEntrega::Cargada,
            TransitionDeliveryRequest::SalidaOk { .. } => EstadoEntrega::SalidaOk,
            TransitionDeliveryRequest::Rechazada { .. } => EstadoEntrega::Rechazada,
        }
    }

    /// La foto del payload, si viene
    pub fn photo(&self) -> Option<PhotoPayload> {
        let (photo_file, content_type) = match self {
            TransitionDeliveryRequest::Cargada {
                photo_file,
                content_type,
                ..
            }
            | TransitionDeliveryRequest::SalidaOk {
                photo_file,
                content_type,
                ..
            } => (photo_file.as_ref()?, content_type.clone()),
            _ => return None,
        };
        Some(PhotoPayload {
            photo_file: photo_file.clone(),
            content_type: content_type.unwrap_or_else(|| "image/jpeg".to_string()),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DeliveryItemResponse {
    pub id: Uuid,
    pub order_item_id: Uuid,
    pub dispatched_quantity: Decimal,
}

impl From<DeliveryItem> for DeliveryItemResponse {
    fn from(item: DeliveryItem) -> Self {
        Self {
            id: item.id,
            order_item_id: item.order_item_id,
            dispatched_quantity: item.dispatched_quantity,
        }
    }
}

/// Response de entrega completa
#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub truck_id: Uuid,
    pub driver_id: Uuid,
    pub estado: EstadoEntrega,
    pub loaded_quantity: Option<Decimal>,
    pub load_photo_url: Option<String>,
    pub exit_photo_url: Option<String>,
    pub notes: Option<String>,
    pub loaded_by: Option<Uuid>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub exited_by: Option<Uuid>,
    pub exited_at: Option<DateTime<Utc>>,
    pub items: Vec<DeliveryItemResponse>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryResponse {
    pub fn from_parts(delivery: Delivery, items: Vec<DeliveryItem>) -> Self {
        Self {
            id: delivery.id,
            order_id: delivery.order_id,
            truck_id: delivery.truck_id,
            driver_id: delivery.driver_id,
            estado: delivery.estado,
            loaded_quantity: delivery.loaded_quantity,
            load_photo_url: delivery.load_photo_url,
            exit_photo_url: delivery.exit_photo_url,
            notes: delivery.notes,
            loaded_by: delivery.loaded_by,
            loaded_at: delivery.loaded_at,
            exited_by: delivery.exited_by,
            exited_at: delivery.exited_at,
            items: items.into_iter().map(Into::into).collect(),
            created_by: delivery.created_by,
            created_at: delivery.created_at,
            updated_at: delivery.updated_at,
        }
    }
}

/// Response de transición: entrega actualizada + estado del pedido
#[derive(Debug, Serialize)]
pub struct TransitionDeliveryResponse {
    pub delivery: DeliveryResponse,
    pub order_status: OrderStatus,
}
