use crate::hub::BroadcastHub;
use crate::{handlers, websocket};
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct HubServer {
    hub: Arc<BroadcastHub>,
}

impl HubServer {
    #[must_use]
    pub const fn new(hub: Arc<BroadcastHub>) -> Self {
        Self { hub }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/", get(websocket::websocket_handler))
            .route("/delta", get(websocket::websocket_handler))
            .route("/api/snapshot", get(handlers::get_snapshot))
            .route("/api/health", get(handlers::health))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.hub.clone())
    }

    /// Binds `addr` and serves subscribers until the server fails.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Publish channel listening on {}", addr);
        self.serve_on(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// # Errors
    /// Returns an error if serving fails.
    pub async fn serve_on(self, listener: TcpListener) -> anyhow::Result<()> {
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}
