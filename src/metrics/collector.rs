//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the pawn-parlor matchmaking
//! service using Prometheus metrics.

use crate::types::{LeaveReason, RoomSize};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Queue and room metrics
    matchmaking_metrics: MatchmakingMetrics,

    /// Session metrics
    session_metrics: SessionMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Gateway messages processed by type
    pub gateway_messages_total: IntCounterVec,
}

/// Queue and room metrics
#[derive(Clone)]
pub struct MatchmakingMetrics {
    /// Join requests received by room size
    pub arrivals_total: IntCounterVec,

    /// Join requests rejected by reason
    pub rejections_total: IntCounterVec,

    /// Rooms assembled by room size
    pub rooms_assembled_total: IntCounterVec,

    /// Queue departures by room size and reason
    pub queue_departures_total: IntCounterVec,

    /// Pending entries per waiting queue
    pub queue_length: IntGaugeVec,

    /// Time spent waiting before being seated
    pub queue_wait_seconds: HistogramVec,

    /// Arrival processing time
    pub arrival_duration: Histogram,
}

/// Session metrics
#[derive(Clone)]
pub struct SessionMetrics {
    /// Currently connected sessions
    pub connected_sessions: IntGauge,

    /// Disconnects by what the session was doing
    pub disconnects_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let matchmaking_metrics = MatchmakingMetrics::new(&registry)?;
        let session_metrics = SessionMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            matchmaking_metrics,
            session_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn matchmaking(&self) -> &MatchmakingMetrics {
        &self.matchmaking_metrics
    }

    pub fn sessions(&self) -> &SessionMetrics {
        &self.session_metrics
    }

    /// Record a processed join request
    pub fn record_arrival(&self, room_size: Option<RoomSize>, duration: Duration) {
        let label = room_size.map(RoomSize::label).unwrap_or("invalid");
        self.matchmaking_metrics
            .arrivals_total
            .with_label_values(&[label])
            .inc();
        self.matchmaking_metrics
            .arrival_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a rejected join request
    pub fn record_rejection(&self, reason: &str) {
        self.matchmaking_metrics
            .rejections_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record an assembled room and how long its members waited
    pub fn record_room_assembled(&self, room_size: RoomSize, waits: &[Duration]) {
        self.matchmaking_metrics
            .rooms_assembled_total
            .with_label_values(&[room_size.label()])
            .inc();

        let histogram = self
            .matchmaking_metrics
            .queue_wait_seconds
            .with_label_values(&[room_size.label()]);
        for wait in waits {
            histogram.observe(wait.as_secs_f64());
        }
    }

    /// Record a session leaving a queue without being matched
    pub fn record_queue_departure(&self, room_size: RoomSize, reason: LeaveReason) {
        self.matchmaking_metrics
            .queue_departures_total
            .with_label_values(&[room_size.label(), reason.label()])
            .inc();
    }

    pub fn set_queue_length(&self, room_size: RoomSize, length: usize) {
        self.matchmaking_metrics
            .queue_length
            .with_label_values(&[room_size.label()])
            .set(length as i64);
    }

    pub fn set_connected_sessions(&self, count: usize) {
        self.session_metrics.connected_sessions.set(count as i64);
    }

    /// Record a disconnect, labelled by the state the session was in
    pub fn record_disconnect(&self, state: &str) {
        self.session_metrics
            .disconnects_total
            .with_label_values(&[state])
            .inc();
    }

    pub fn record_gateway_message(&self, message_type: &str) {
        self.service_metrics
            .gateway_messages_total
            .with_label_values(&[message_type])
            .inc();
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("pawn_parlor_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "pawn_parlor_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let gateway_messages_total = IntCounterVec::new(
            Opts::new(
                "pawn_parlor_gateway_messages_total",
                "Gateway messages processed",
            ),
            &["type"],
        )?;
        registry.register(Box::new(gateway_messages_total.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            gateway_messages_total,
        })
    }
}

impl MatchmakingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let arrivals_total = IntCounterVec::new(
            Opts::new("pawn_parlor_arrivals_total", "Join requests received"),
            &["room_size"],
        )?;
        registry.register(Box::new(arrivals_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("pawn_parlor_rejections_total", "Join requests rejected"),
            &["reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let rooms_assembled_total = IntCounterVec::new(
            Opts::new("pawn_parlor_rooms_assembled_total", "Rooms assembled"),
            &["room_size"],
        )?;
        registry.register(Box::new(rooms_assembled_total.clone()))?;

        let queue_departures_total = IntCounterVec::new(
            Opts::new(
                "pawn_parlor_queue_departures_total",
                "Sessions that left a queue unmatched",
            ),
            &["room_size", "reason"],
        )?;
        registry.register(Box::new(queue_departures_total.clone()))?;

        let queue_length = IntGaugeVec::new(
            Opts::new("pawn_parlor_queue_length", "Pending entries per queue"),
            &["room_size"],
        )?;
        registry.register(Box::new(queue_length.clone()))?;

        let queue_wait_seconds = HistogramVec::new(
            HistogramOpts::new(
                "pawn_parlor_queue_wait_seconds",
                "Time spent queued before being seated",
            )
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 900.0]),
            &["room_size"],
        )?;
        registry.register(Box::new(queue_wait_seconds.clone()))?;

        let arrival_duration = Histogram::with_opts(
            HistogramOpts::new(
                "pawn_parlor_arrival_duration_seconds",
                "Join request processing time",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(arrival_duration.clone()))?;

        Ok(Self {
            arrivals_total,
            rejections_total,
            rooms_assembled_total,
            queue_departures_total,
            queue_length,
            queue_wait_seconds,
            arrival_duration,
        })
    }
}

impl SessionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let connected_sessions = IntGauge::new(
            "pawn_parlor_connected_sessions",
            "Currently connected sessions",
        )?;
        registry.register(Box::new(connected_sessions.clone()))?;

        let disconnects_total = IntCounterVec::new(
            Opts::new("pawn_parlor_disconnects_total", "Session disconnects"),
            &["state"],
        )?;
        registry.register(Box::new(disconnects_total.clone()))?;

        Ok(Self {
            connected_sessions,
            disconnects_total,
        })
    }
}
