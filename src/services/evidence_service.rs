//! Cliente del almacén de evidencias fotográficas
//!
//! Las fotos de los puntos de control viajan en el payload como base64.
//! Este módulo las sube al file store externo y devuelve la referencia
//! opaca (URL) que se guarda tal cual en la entrega. El núcleo nunca
//! interpreta el contenido de la imagen.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use crate::dto::delivery_dto::PhotoPayload;
use crate::utils::errors::{validation_error, AppError};

#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Sube la foto y devuelve la URL opaca que la identifica
    async fn store_photo(
        &self,
        delivery_id: Uuid,
        checkpoint: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError>;
}

/// Respuesta del file store
#[derive(Debug, Deserialize)]
struct StoredFileResponse {
    url: String,
}

pub struct HttpEvidenceStore {
    client: Client,
    base_url: String,
}

impl HttpEvidenceStore {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl EvidenceStore for HttpEvidenceStore {
    async fn store_photo(
        &self,
        delivery_id: Uuid,
        checkpoint: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        let url = format!(
            "{}/photos?delivery_id={}&checkpoint={}",
            self.base_url, delivery_id, checkpoint
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", content_type.to_string())
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("evidence store upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "evidence store returned {}",
                response.status()
            )));
        }

        let stored: StoredFileResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalApi(format!("invalid evidence store response: {}", e)))?;

        Ok(stored.url)
    }
}

/// Decodificar la foto base64 del payload
pub fn decode_photo(payload: &PhotoPayload) -> Result<Vec<u8>, AppError> {
    let bytes = STANDARD
        .decode(payload.photo_file.as_bytes())
        .map_err(|_| validation_error("photoFile", "must be valid base64"))?;
    if bytes.is_empty() {
        return Err(validation_error("photoFile", "photo must not be empty"));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_photo_valid_base64() {
        let payload = PhotoPayload {
            photo_file: STANDARD.encode(b"jpeg-bytes"),
            content_type: "image/jpeg".to_string(),
        };
        assert_eq!(decode_photo(&payload).unwrap(), b"jpeg-bytes");
    }

    #[test]
    fn test_decode_photo_rejects_garbage() {
        let payload = PhotoPayload {
            photo_file: "no es base64 ***".to_string(),
            content_type: "image/jpeg".to_string(),
        };
        assert!(decode_photo(&payload).is_err());
    }

    #[test]
    fn test_decode_photo_rejects_empty() {
        let payload = PhotoPayload {
            photo_file: String::new(),
            content_type: "image/jpeg".to_string(),
        };
        assert!(decode_photo(&payload).is_err());
    }
}
