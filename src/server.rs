use crate::app::ingest_use_case::IngestUseCase;
use crate::app::ports::ReadingsQueryPort;
use crate::error::IngestError;
use axum::{
    body::Bytes,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared handles for the HTTP surface
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestUseCase>,
    /// Only the SQLite analytics backend can answer reads
    pub readings: Option<Arc<dyn ReadingsQueryPort>>,
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "sensor-ingest",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Push delivery endpoint. 2xx acknowledges the envelope, anything else
/// asks the platform to redeliver it.
async fn push(Extension(ingest): Extension<Arc<IngestUseCase>>, body: Bytes) -> Response {
    match ingest.handle_push(&body).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(status_for(&e), &e),
    }
}

async fn latest_sensors(Extension(readings): Extension<Arc<dyn ReadingsQueryPort>>) -> Response {
    match readings.latest_per_sensor().await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to query latest readings");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub fn status_for(error: &IngestError) -> StatusCode {
    match error {
        IngestError::Decode(_) => StatusCode::BAD_REQUEST,
        IngestError::AnalyticsTransport(_) | IngestError::Archive { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(status: StatusCode, error: &IngestError) -> Response {
    (status, Json(serde_json::json!({ "error": error.to_string() }))).into_response()
}

/// Create the router with all routes
pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/pubsub/push", post(push))
        .layer(Extension(state.ingest));

    if let Some(readings) = state.readings {
        router = router
            .route("/latest-sensors", get(latest_sensors))
            .layer(Extension(readings));
    }

    router.layer(ServiceBuilder::new().layer(cors))
}

/// Serve `app` on `addr` until `shutdown` resolves, draining in-flight requests.
pub async fn start_server<F>(app: Router, addr: SocketAddr, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("HTTP server running on http://{}", addr);
    info!("Push endpoint: http://{}/pubsub/push", addr);

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
