//! HTTP surface: routes, error mapping, CORS, tracing and panic recovery.

use crate::extract::ProxyRequest;
use crate::service::ProxyService;
use crate::types::ProviderKind;
use crate::{Error, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const PROXY_PATH: &str = "/api/ai-proxy";

/// Client-facing failure. Only request-shape problems surface as errors.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthReport {
    status: &'static str,
    version: &'static str,
    language: String,
    default_provider: ProviderKind,
    primary_configured: bool,
    secondary_configured: bool,
}

pub fn router(service: Arc<ProxyService>) -> Router {
    let generic = service.prompts().generic();
    let recover = CatchPanicLayer::custom(move |_panic: Box<dyn std::any::Any + Send + 'static>| {
        error!("handler panicked, answering with generic reply");
        Json(serde_json::json!({
            "response": generic.clone(),
            "provider": "local",
            "usedFallback": true,
        }))
        .into_response()
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route(PROXY_PATH, post(proxy_handler).options(preflight_handler))
        .route("/", post(proxy_handler).options(preflight_handler))
        .route("/health", get(health_handler))
        .with_state(service)
        .layer(recover)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn proxy_handler(State(service): State<Arc<ProxyService>>, body: Bytes) -> Response {
    let request = match ProxyRequest::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "rejected proxy request");
            return ApiError::from(err).into_response();
        }
    };
    Json(service.handle(request).await).into_response()
}

async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

async fn health_handler(State(service): State<Arc<ProxyService>>) -> Json<HealthReport> {
    let (primary_configured, secondary_configured) = service.providers_configured();
    Json(HealthReport {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        language: service.prompts().language().to_string(),
        default_provider: service.settings().default_provider,
        primary_configured,
        secondary_configured,
    })
}

/// Bind and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, service: Arc<ProxyService>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "proxy listening");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
