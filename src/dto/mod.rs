//! DTOs de la API
//!
//! Schemas explícitos de request/response; ningún payload genérico
//! débilmente tipado cruza la frontera HTTP.

pub mod delivery_dto;
pub mod order_dto;

use serde::Serialize;

/// Response genérica
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
        }
    }
}
