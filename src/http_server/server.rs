//! # HTTP Server
//!
//! Main HTTP server combining all endpoint routers.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::observability::{log_event_with_fields, Event};

use super::audit_routes::audit_routes;
use super::decision_routes::decision_routes;
use super::observability_routes::{health_routes, observability_routes};
use super::receipt_routes::{consent_routes, receipt_routes};
use super::state::AppState;
use super::whatif_routes::whatif_routes;

/// Build the combined router with all endpoints
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = cors_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(health_routes())
        .nest("/decisions", decision_routes(state.clone()))
        .nest("/receipts", receipt_routes(state.clone()))
        .nest("/consent", consent_routes(state.clone()))
        .nest("/audit", audit_routes(state.clone()))
        .nest("/what-if", whatif_routes(state.clone()))
        .nest("/observability", observability_routes(state))
        .layer(cors)
}

/// HTTP server for the decision audit API
pub struct HttpServer {
    addr: String,
    router: Router,
}

impl HttpServer {
    pub fn new(addr: impl Into<String>, state: AppState, cors_origins: &[String]) -> Self {
        Self {
            addr: addr.into(),
            router: build_router(state, cors_origins),
        }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> &str {
        &self.addr
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serves until `shutdown` resolves.
    pub async fn start(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.addr.parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid socket address '{}': {}", self.addr, e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        log_event_with_fields(Event::Serving, &[("addr", &addr.to_string())]);
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
