// rest_api/src/lib.rs

use std::future::Future;

use anyhow::{Context, Error as AnyhowError};
use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use medrec_lib::{RecordStore, ServerConfig};

pub mod error;
pub mod handlers;

pub use crate::error::RestApiError;
use crate::handlers::{
    add_record_handler, create_record_handler, get_patient_handler, health_check_handler,
    search_handler, update_patient_handler,
};

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
}

impl AppState {
    pub fn new(store: RecordStore) -> Self {
        AppState { store }
    }
}

/// Builds the `/api` router with CORS and request tracing applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/api/patients/:id", get(get_patient_handler).put(update_patient_handler))
        .route("/api/records", post(create_record_handler))
        .route("/api/search", get(search_handler))
        .route("/api/addRecord", post(add_record_handler))
        .route("/api/health", get(health_check_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serves the API on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, store: RecordStore, shutdown: F) -> Result<(), AnyhowError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Failed to read listener address")?;
    let app = router(AppState::new(store));
    info!("REST API server listening on http://{}/api", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .context("REST API server failed to start or run")?;

    info!("REST API server stopped.");
    Ok(())
}

/// Binds `config.host:config.port` and serves until a value (or a drop) arrives on `shutdown_rx`.
pub async fn start_server(
    config: &ServerConfig,
    store: RecordStore,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<(), AnyhowError> {
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to address: {}", addr))?;

    let shutdown_signal = async {
        let _ = shutdown_rx.await;
        info!("Received shutdown signal.");
    };
    serve(listener, store, shutdown_signal).await
}
