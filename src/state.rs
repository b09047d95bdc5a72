//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::services::evidence_service::EvidenceStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EnvironmentConfig,
    pub evidence: Arc<dyn EvidenceStore>,
}

impl AppState {
    pub fn new(pool: PgPool, config: EnvironmentConfig, evidence: Arc<dyn EvidenceStore>) -> Self {
        Self {
            pool,
            config,
            evidence,
        }
    }
}
