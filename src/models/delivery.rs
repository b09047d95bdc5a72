//! Modelo de Delivery (viaje de camión)
//!
//! Una entrega es un viaje físico camión+chofer contra un pedido.
//! Avanza por una máquina de estados lineal con puntos de control
//! de patio (carga) y seguridad (salida).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado de la entrega - mapea al ENUM estado_entrega
///
/// Máquina lineal: ASIGNADA → EN_CARGA → CARGADA → SALIDA_OK.
/// RECHAZADA solo es alcanzable desde ASIGNADA o EN_CARGA.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "estado_entrega", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstadoEntrega {
    Asignada,
    EnCarga,
    Cargada,
    SalidaOk,
    Rechazada,
}

impl EstadoEntrega {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoEntrega::Asignada => "ASIGNADA",
            EstadoEntrega::EnCarga => "EN_CARGA",
            EstadoEntrega::Cargada => "CARGADA",
            EstadoEntrega::SalidaOk => "SALIDA_OK",
            EstadoEntrega::Rechazada => "RECHAZADA",
        }
    }

    /// SALIDA_OK y RECHAZADA son terminales: la entrega queda inmutable
    pub fn is_terminal(&self) -> bool {
        matches!(self, EstadoEntrega::SalidaOk | EstadoEntrega::Rechazada)
    }

    /// Tabla de transiciones permitidas, sin saltos
    pub fn can_transition_to(&self, target: EstadoEntrega) -> bool {
        use EstadoEntrega::*;
        matches!(
            (self, target),
            (Asignada, EnCarga)
                | (EnCarga, Cargada)
                | (Cargada, SalidaOk)
                | (Asignada, Rechazada)
                | (EnCarga, Rechazada)
        )
    }
}

/// Delivery principal - mapea a la tabla deliveries
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Delivery {
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
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DeliveryItem - cuánto de la carga de esta entrega corresponde
/// a cada renglón del pedido
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeliveryItem {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub order_item_id: Uuid,
    pub dispatched_quantity: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use EstadoEntrega::*;

    const ALL: [EstadoEntrega; 5] = [Asignada, EnCarga, Cargada, SalidaOk, Rechazada];

    #[test]
    fn test_linear_transitions_allowed() {
        assert!(Asignada.can_transition_to(EnCarga));
        assert!(EnCarga.can_transition_to(Cargada));
        assert!(Cargada.can_transition_to(SalidaOk));
    }

    #[test]
    fn test_reject_only_before_loading() {
        assert!(Asignada.can_transition_to(Rechazada));
        assert!(EnCarga.can_transition_to(Rechazada));
        assert!(!Cargada.can_transition_to(Rechazada));
        assert!(!SalidaOk.can_transition_to(Rechazada));
    }

    #[test]
    fn test_no_skipping() {
        assert!(!Asignada.can_transition_to(Cargada));
        assert!(!Asignada.can_transition_to(SalidaOk));
        assert!(!EnCarga.can_transition_to(SalidaOk));
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        for target in ALL {
            assert!(!SalidaOk.can_transition_to(target));
            assert!(!Rechazada.can_transition_to(target));
        }
        assert!(SalidaOk.is_terminal());
        assert!(Rechazada.is_terminal());
        assert!(!Cargada.is_terminal());
    }

    #[test]
    fn test_no_backwards_or_self_transitions() {
        for estado in ALL {
            assert!(!estado.can_transition_to(estado));
        }
        assert!(!EnCarga.can_transition_to(Asignada));
        assert!(!Cargada.can_transition_to(EnCarga));
    }
}
