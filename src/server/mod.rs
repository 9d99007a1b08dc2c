use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    middleware,
    routing::{get, patch},
    Router,
};
use log::{error, info};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::Result;

mod error;
mod models;
mod postgres;
mod routes;
mod state;
mod store;

pub use state::AppState;

use routes::{
    count_requests, create_deployment_handler, health_handler, list_deployments_handler,
    list_metrics_handler, list_projects_handler, list_users_handler, metrics_handler,
    pipeline_status_handler, update_deployment_handler,
};

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/pipelines/status", get(pipeline_status_handler))
        .route("/api/users", get(list_users_handler))
        .route("/api/projects", get(list_projects_handler))
        .route(
            "/api/deployments",
            get(list_deployments_handler).post(create_deployment_handler),
        )
        .route("/api/deployments/:id", patch(update_deployment_handler))
        .route("/api/metrics", get(list_metrics_handler))
        .layer(middleware::from_fn_with_state(state.clone(), count_requests))
        .layer(cors)
        .with_state(state)
}

/// Serves the API until Ctrl+C or SIGTERM.
pub async fn start_server(config: &Config) -> Result<()> {
    info!("Initializing state...");
    let state = AppState::from_config(config).await?;
    let app = router(state);

    let address = format!("0.0.0.0:{}", config.server.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
