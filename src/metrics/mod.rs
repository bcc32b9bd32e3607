//! Metrics and monitoring for the pawn-parlor matchmaking service
//!
//! This module provides Prometheus metrics collection and the HTTP health
//! server exposing them.

pub mod collector;
pub mod health;

pub use collector::{MatchmakingMetrics, MetricsCollector, ServiceMetrics, SessionMetrics};
pub use health::{HealthServer, HealthServerConfig};

use std::sync::Arc;

/// Metrics collector paired with the server exposing it
#[derive(Clone)]
pub struct MetricsService {
    collector: Arc<MetricsCollector>,
    health_server: Arc<HealthServer>,
}

impl MetricsService {
    pub fn new(collector: Arc<MetricsCollector>, health_server: Arc<HealthServer>) -> Self {
        Self {
            collector,
            health_server,
        }
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    /// Start the metrics service (health endpoints)
    pub async fn start(&self) -> anyhow::Result<()> {
        self.health_server.start().await
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.health_server.stop().await
    }
}
