//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the matchmaking
//! engine to the WebSocket gateway, the health server and the background
//! maintenance tasks.

use crate::config::AppConfig;
use crate::gateway::GatewayServer;
use crate::matchmaking::{MatchmakingEngine, NotifyingSessionOwner};
use crate::metrics::{HealthServer, HealthServerConfig, MetricsCollector, MetricsService};
use crate::service::health::{HealthCheck, ServiceProbe};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,

    /// Core matchmaking engine
    engine: MatchmakingEngine,

    /// Participant-facing WebSocket server
    gateway: Arc<GatewayServer>,

    /// Metrics service for monitoring and health checks
    metrics_service: Arc<MetricsService>,

    /// Shared view used by health checks and the sweep task
    probe: ServiceProbe,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing pawn-parlor matchmaking service");
        info!(
            "Configuration: service={}, gateway={}:{}, health_port={}, max_pawn_type={}",
            config.service.name,
            config.gateway.host,
            config.gateway.port,
            config.service.health_port,
            config.matchmaking.max_pawn_type
        );

        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let engine = MatchmakingEngine::with_metrics(
            config.matchmaking.max_pawn_type,
            Arc::new(NotifyingSessionOwner::new()),
            metrics_collector.clone(),
        )
        .map_err(|e| ServiceError::Initialization {
            message: format!("Failed to create matchmaking engine: {}", e),
        })?;

        let sweep_interval = config
            .matchmaking
            .enable_sweep
            .then(|| config.sweep_interval());
        let probe = ServiceProbe::new(config.service.name.clone(), engine.clone(), sweep_interval);

        let metrics_service = Self::initialize_metrics(&config, metrics_collector, probe.clone());
        let gateway = Arc::new(GatewayServer::new(config.gateway.clone(), engine.clone()));

        Ok(Self {
            config,
            engine,
            gateway,
            metrics_service,
            probe,
            background_tasks: Vec::new(),
        })
    }

    /// Start servers and background tasks
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting pawn-parlor matchmaking service");

        *self.probe.is_running.write().await = true;

        self.start_metrics_service().await;
        self.start_gateway().await;
        self.start_background_tasks();

        info!("✅ Pawn-parlor matchmaking service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of pawn-parlor service");

        *self.probe.is_running.write().await = false;

        if let Err(e) = self.gateway.stop().await {
            warn!("Failed to stop gateway: {}", e);
        } else {
            info!("✅ Gateway stopped");
        }

        info!("Stopping metrics service...");
        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop metrics service: {}", e);
        } else {
            info!("✅ Metrics service stopped");
        }

        self.stop_background_tasks().await;

        let final_stats =
            self.engine
                .diagnostics()
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("Failed to get final stats: {}", e),
                })?;

        info!("Final service statistics: {:?}", final_stats);
        info!("✅ Pawn-parlor service shutdown completed");

        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn is_running(&self) -> bool {
        self.probe.is_running().await
    }

    pub fn engine(&self) -> MatchmakingEngine {
        self.engine.clone()
    }

    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    pub fn probe(&self) -> ServiceProbe {
        self.probe.clone()
    }

    fn initialize_metrics(
        config: &AppConfig,
        metrics_collector: Arc<MetricsCollector>,
        probe: ServiceProbe,
    ) -> Arc<MetricsService> {
        info!(
            "Initializing metrics service on port {}",
            config.service.health_port
        );

        let health_config = HealthServerConfig {
            port: config.service.health_port,
            host: "0.0.0.0".to_string(),
        };

        let health_server =
            Arc::new(HealthServer::new(health_config, metrics_collector.clone()).with_probe(probe));
        Arc::new(MetricsService::new(metrics_collector, health_server))
    }

    async fn start_metrics_service(&mut self) {
        info!("Starting metrics and health endpoints");

        let metrics_service = self.metrics_service.clone();
        let port = self.config.service.health_port;

        let metrics_handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {}", e);
            } else {
                info!("Metrics service task completed");
            }
        });
        self.background_tasks.push(metrics_handle);

        // Give the server a moment to start up
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        info!("✅ Metrics service started on port {}", port);
    }

    async fn start_gateway(&mut self) {
        info!("Starting participant gateway");

        let gateway = self.gateway.clone();
        let port = self.config.gateway.port;

        let gateway_handle = tokio::spawn(async move {
            if let Err(e) = gateway.start().await {
                error!("Gateway failed: {}", e);
            } else {
                info!("Gateway task completed");
            }
        });
        self.background_tasks.push(gateway_handle);

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        info!("✅ Gateway started on port {}", port);
    }

    /// Start background maintenance tasks
    fn start_background_tasks(&mut self) {
        info!("Starting background maintenance tasks...");

        let sweep_task = if self.config.matchmaking.enable_sweep {
            let sweep_interval = self.config.sweep_interval();
            info!(
                "Starting disconnected session sweep ({}s interval)...",
                sweep_interval.as_secs()
            );
            let engine = self.engine.clone();
            let probe = self.probe.clone();

            Some(tokio::spawn(async move {
                let mut interval = tokio::time::interval(sweep_interval);
                info!("Session sweep task started");

                while probe.is_running().await {
                    interval.tick().await;

                    match engine.sweep_disconnected() {
                        Ok(swept) => {
                            if swept > 0 {
                                info!("Swept {} closed sessions from queues", swept);
                            } else {
                                debug!("Sweep completed - no closed sessions queued");
                            }
                            probe.record_sweep().await;
                        }
                        Err(e) => {
                            warn!("Session sweep failed: {}", e);
                        }
                    }
                }

                info!("Session sweep task stopped");
            }))
        } else {
            info!("Session sweep disabled - skipping sweep task");
            None
        };

        info!("Starting health metrics task (60s interval)...");
        let health_metrics_task = {
            let metrics_collector = self.metrics_service.collector();
            let probe = self.probe.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(60));
                info!("Health metrics task started");

                while probe.is_running().await {
                    interval.tick().await;

                    let uptime_seconds = probe.started_at.elapsed().as_secs() as i64;
                    metrics_collector
                        .service()
                        .uptime_seconds
                        .set(uptime_seconds);

                    match HealthCheck::check(&probe).await {
                        Ok(health) => {
                            metrics_collector.update_health_status(health.status.gauge_value());
                            debug!(
                                "Updated service health metrics - status: {}, uptime: {}s, waiting: {}",
                                health.status, uptime_seconds, health.stats.players_waiting
                            );
                        }
                        Err(e) => {
                            warn!("Health check failed: {}", e);
                            metrics_collector.update_health_status(0);
                        }
                    }
                }

                info!("Health metrics task stopped");
            })
        };

        let mut task_count = 1;
        self.background_tasks.push(health_metrics_task);
        if let Some(task) = sweep_task {
            self.background_tasks.push(task);
            task_count += 1;
        }

        info!(
            "{} background maintenance tasks started successfully",
            task_count
        );
    }

    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        for (i, task) in self.background_tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        info!("✅ All {} background tasks stopped", task_count);
    }
}
