//! Health checks
//!
//! Readiness and liveness probes for the pawn-parlor service, computed from
//! a [`ServiceProbe`] the application state hands to the health server.

use crate::matchmaking::MatchmakingEngine;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Value exported through the health status gauge
    pub fn gauge_value(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Everything a health check needs to look at
#[derive(Clone)]
pub struct ServiceProbe {
    pub service_name: String,
    pub engine: MatchmakingEngine,
    pub is_running: Arc<RwLock<bool>>,
    pub started_at: Instant,
    /// Sweep cadence, `None` when the sweep is disabled
    pub sweep_interval: Option<Duration>,
    pub last_sweep: Arc<RwLock<Option<Instant>>>,
}

impl ServiceProbe {
    pub fn new(
        service_name: impl Into<String>,
        engine: MatchmakingEngine,
        sweep_interval: Option<Duration>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            engine,
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
            sweep_interval,
            last_sweep: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub async fn record_sweep(&self) {
        *self.last_sweep.write().await = Some(Instant::now());
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Optional explanation when not healthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Pending entries keyed by room size
    pub queue_lengths: BTreeMap<u8, usize>,
    pub players_waiting: usize,
    pub registered_sessions: usize,
    pub sessions_in_rooms: usize,
    pub rooms_assembled: u64,
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(probe: &ServiceProbe) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        let service_check = Self::check_service_running(probe).await;
        if service_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(service_check);

        for check in [Self::check_engine(probe), Self::check_sweeper(probe).await] {
            if check.status == HealthStatus::Unhealthy {
                overall_status = HealthStatus::Unhealthy;
            } else if check.status == HealthStatus::Degraded
                && overall_status == HealthStatus::Healthy
            {
                overall_status = HealthStatus::Degraded;
            }
            checks.push(check);
        }

        let stats = Self::gather_service_stats(probe);

        Ok(HealthCheck {
            status: overall_status,
            service: probe.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(probe: &ServiceProbe) -> Result<HealthStatus> {
        if probe.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - verify the engine can take requests
    pub async fn readiness_check(probe: &ServiceProbe) -> Result<HealthStatus> {
        if !probe.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }
        Ok(Self::check_engine(probe).status)
    }

    async fn check_service_running(probe: &ServiceProbe) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = if probe.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn check_engine(probe: &ServiceProbe) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = match probe.engine.diagnostics() {
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("Engine diagnostics failed: {}", e);
                (HealthStatus::Unhealthy, Some(e.to_string()))
            }
        };

        ComponentCheck {
            name: "matchmaking_engine".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// The sweep is degraded once it has missed two consecutive runs
    async fn check_sweeper(probe: &ServiceProbe) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = match probe.sweep_interval {
            None => (HealthStatus::Healthy, Some("Sweep disabled".to_string())),
            Some(interval) => {
                let last_activity = probe.last_sweep.read().await.unwrap_or(probe.started_at);
                if last_activity.elapsed() > interval * 2 {
                    (
                        HealthStatus::Degraded,
                        Some(format!(
                            "No sweep for {}s",
                            last_activity.elapsed().as_secs()
                        )),
                    )
                } else {
                    (HealthStatus::Healthy, None)
                }
            }
        };

        ComponentCheck {
            name: "session_sweeper".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn gather_service_stats(probe: &ServiceProbe) -> ServiceStats {
        let uptime_seconds = probe.started_at.elapsed().as_secs();

        match probe.engine.diagnostics() {
            Ok(diagnostics) => ServiceStats {
                players_waiting: diagnostics.total_waiting(),
                queue_lengths: diagnostics.queue_lengths,
                registered_sessions: diagnostics.registered_sessions,
                sessions_in_rooms: diagnostics.sessions_in_rooms,
                rooms_assembled: diagnostics.rooms_assembled,
                uptime_seconds,
            },
            Err(e) => {
                debug!("Failed to get diagnostics for health check: {}", e);
                ServiceStats {
                    uptime_seconds,
                    ..ServiceStats::default()
                }
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchmaking::NotifyingSessionOwner;
    use crate::types::DEFAULT_MAX_PAWN_TYPE;

    fn probe(sweep_interval: Option<Duration>) -> ServiceProbe {
        let engine =
            MatchmakingEngine::new(DEFAULT_MAX_PAWN_TYPE, Arc::new(NotifyingSessionOwner::new()))
                .unwrap();
        ServiceProbe::new("pawn-parlor", engine, sweep_interval)
    }

    #[tokio::test]
    async fn test_stopped_service_is_unhealthy() {
        let probe = probe(None);

        let health = HealthCheck::check(&probe).await.unwrap();
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(
            HealthCheck::liveness_check(&probe).await.unwrap(),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_running_service_is_healthy() {
        let probe = probe(Some(Duration::from_secs(60)));
        *probe.is_running.write().await = true;

        let health = HealthCheck::check(&probe).await.unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.checks.len(), 3);
        assert_eq!(health.stats.queue_lengths.len(), 3);
        assert_eq!(
            HealthCheck::readiness_check(&probe).await.unwrap(),
            HealthStatus::Healthy
        );
        assert!(health.to_json().unwrap().contains("matchmaking_engine"));
    }

    #[tokio::test]
    async fn test_missed_sweeps_degrade_health() {
        let mut probe = probe(Some(Duration::from_millis(1)));
        probe.started_at = Instant::now() - Duration::from_secs(1);
        *probe.is_running.write().await = true;

        let health = HealthCheck::check(&probe).await.unwrap();
        assert_eq!(health.status, HealthStatus::Degraded);

        probe.sweep_interval = Some(Duration::from_secs(60));
        probe.record_sweep().await;
        let health = HealthCheck::check(&probe).await.unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_gauge_values() {
        assert_eq!(HealthStatus::Healthy.gauge_value(), 2);
        assert_eq!(HealthStatus::Degraded.gauge_value(), 1);
        assert_eq!(HealthStatus::Unhealthy.gauge_value(), 0);
    }
}
