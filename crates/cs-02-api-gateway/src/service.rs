//! API Gateway service: router assembly and server lifecycle.

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::middleware::create_cors_layer;
use crate::ports::outbound::MetricsRenderer;
use crate::rest::{routes, AppState};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use cs_01_composition_engine::CompositionApi;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the HTTP router with the full middleware stack
pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.timeouts.request))
        .layer(create_cors_layer(&config.cors));

    routes()
        .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
        .layer(middleware)
        .with_state(state)
}

/// HTTP front end for a [`CompositionApi`]
pub struct ApiGatewayService {
    config: GatewayConfig,
    state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<std::io::Result<()>>>,
    local_addr: Option<SocketAddr>,
}

impl ApiGatewayService {
    /// Create a gateway. Fails if the configuration does not validate.
    pub fn new(config: GatewayConfig, api: Arc<dyn CompositionApi>) -> Result<Self, GatewayError> {
        config.validate()?;
        Ok(Self {
            config,
            state: AppState::new(api),
            shutdown_tx: None,
            server: None,
            local_addr: None,
        })
    }

    /// Serve `renderer` output on `/metrics`
    pub fn with_metrics(mut self, renderer: Arc<dyn MetricsRenderer>) -> Self {
        self.state = self.state.with_metrics(renderer);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Router with middleware and state, for serving or in-process requests
    pub fn router(&self) -> Router {
        build_router(&self.config, self.state.clone())
    }

    /// Address actually bound, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.server.is_some()
    }

    /// Bind the HTTP listener and serve in a background task.
    ///
    /// Returns the bound address; port 0 in the config picks a free port.
    pub async fn start(&mut self) -> Result<SocketAddr, GatewayError> {
        if self.server.is_some() {
            return Err(GatewayError::AlreadyRunning);
        }

        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let router = self.router();
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(addr = %local_addr, "[cs-02] HTTP server listening");
        self.shutdown_tx = Some(shutdown_tx);
        self.server = Some(server);
        self.local_addr = Some(local_addr);
        Ok(local_addr)
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(&mut self) -> Result<(), GatewayError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        let Some(server) = self.server.take() else {
            return Ok(());
        };
        self.local_addr = None;

        match server.await {
            Ok(Ok(())) => {
                info!("[cs-02] HTTP server stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = %e, "[cs-02] HTTP server error");
                Err(GatewayError::Internal(e.to_string()))
            }
            Err(e) => Err(GatewayError::Internal(format!("server task failed: {e}"))),
        }
    }
}
