use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info};

use quarry_dispatch::config::environment::EnvironmentConfig;
use quarry_dispatch::database::connection::{create_pool, run_migrations};
use quarry_dispatch::routes::create_app;
use quarry_dispatch::services::evidence_service::HttpEvidenceStore;
use quarry_dispatch::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("🏗️  Quarry Dispatch - despacho de material de cantera");
    info!("====================================================");

    let config = EnvironmentConfig::from_env();

    // Inicializar base de datos
    let pool = match create_pool(None).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };
    run_migrations(&pool).await?;

    // Cliente del almacén de evidencias
    let evidence = Arc::new(HttpEvidenceStore::new(config.evidence_store_url.clone()));

    let state = AppState::new(pool, config.clone(), evidence);
    let app = create_app(state);

    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET    /health - Health check");
    info!("📋 Pedidos:");
    info!("   POST   /orders - Crear pedido");
    info!("   GET    /orders - Listar pedidos");
    info!("   GET    /orders/:id - Obtener pedido");
    info!("   DELETE /orders/:id - Cancelar pedido");
    info!("   GET    /orders/:id/deliveries - Entregas del pedido");
    info!("🚚 Entregas:");
    info!("   POST   /deliveries - Asignar entrega");
    info!("   GET    /deliveries/:id - Obtener entrega");
    info!("   PATCH  /deliveries/:id - Transición de estado");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
