//! # Composition Node Runtime
//!
//! Owns the engine, the event channel, the HTTP gateway and background tasks.

use crate::adapters::{spawn_event_logger, PrometheusMetricsSink, PrometheusRenderer};
use crate::config::{ServiceConfig, StorageBackend};
use anyhow::{Context, Result};
use cs_01_composition_engine::adapters::{
    BroadcastEventPublisher, InMemoryRepository, JsonFileRepository, SystemClock,
};
use cs_01_composition_engine::{CompositionEvent, CompositionRepository, CompositionService};
use cs_02_api_gateway::ApiGatewayService;
use cs_telemetry::log_event;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A running (or ready to run) Composition service
pub struct CompositionNode {
    config: ServiceConfig,
    service: Arc<CompositionService>,
    publisher: Arc<BroadcastEventPublisher>,
    gateway: ApiGatewayService,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl CompositionNode {
    /// Wire every component from `config`.
    ///
    /// Opens the repository and restores the graph; nothing listens yet.
    pub fn build(config: ServiceConfig) -> Result<Self> {
        info!(backend = ?config.storage.backend, "Creating composition node");

        let repository: Arc<dyn CompositionRepository> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(InMemoryRepository::new()),
            StorageBackend::File => Arc::new(
                JsonFileRepository::open(&config.storage.data_dir).with_context(|| {
                    format!(
                        "Failed to open data directory {}",
                        config.storage.data_dir.display()
                    )
                })?,
            ),
        };

        let publisher = Arc::new(BroadcastEventPublisher::with_capacity(
            config.engine.event_channel_capacity,
        ));

        let service = CompositionService::restore(
            config.engine.clone(),
            repository,
            publisher.clone(),
            Arc::new(SystemClock),
        )
        .context("Failed to restore composition graph")?
        .with_metrics(Arc::new(PrometheusMetricsSink));
        let service = Arc::new(service);

        let gateway = ApiGatewayService::new(config.gateway.clone(), service.clone())
            .context("Failed to create API gateway")?
            .with_metrics(Arc::new(PrometheusRenderer));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            service,
            publisher,
            gateway,
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<CompositionService> {
        &self.service
    }

    /// Receive every event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<CompositionEvent> {
        self.publisher.subscribe()
    }

    /// Start background tasks and the HTTP server. Returns the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        self.tasks.push(spawn_event_logger(
            self.publisher.subscribe(),
            self.shutdown_rx.clone(),
        ));

        let addr = self
            .gateway
            .start()
            .await
            .context("Failed to start API gateway")?;

        log_event!(
            info,
            "runtime",
            "Composition node started",
            addr = %addr,
            compositions = self.service.len()
        );
        Ok(addr)
    }

    /// Stop the gateway, then every background task.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        self.gateway
            .shutdown()
            .await
            .context("API gateway did not stop cleanly")?;

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!("Background task failed: {}", e);
            }
        }

        info!("Composition node stopped");
        Ok(())
    }
}
