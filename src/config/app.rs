//! Main application configuration
//!
//! This module defines the primary configuration structures for the pawn-parlor
//! matchmaking service, including environment variable and TOML file loading
//! and validation.

use crate::types::{DEFAULT_MAX_PAWN_TYPE, PAWN_TYPE_CEILING};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub gateway: GatewaySettings,
    pub matchmaking: MatchmakingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check and metrics endpoints
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// WebSocket gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Host to bind the gateway to
    pub host: String,
    /// Port participants connect to
    pub port: u16,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// Highest pawn type participants may declare
    pub max_pawn_type: u8,
    /// Interval between sweeps for closed connections in seconds
    pub sweep_interval_seconds: u64,
    /// Enable the periodic sweep
    pub enable_sweep: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "pawn-parlor".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            shutdown_timeout_seconds: 10,
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            max_pawn_type: DEFAULT_MAX_PAWN_TYPE,
            sweep_interval_seconds: 60,
            enable_sweep: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(port) = env::var("HEALTH_PORT") {
            self.service.health_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HEALTH_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Gateway settings
        if let Ok(host) = env::var("GATEWAY_HOST") {
            self.gateway.host = host;
        }
        if let Ok(port) = env::var("GATEWAY_PORT") {
            self.gateway.port = port
                .parse()
                .map_err(|_| anyhow!("Invalid GATEWAY_PORT value: {}", port))?;
        }

        // Matchmaking settings
        if let Ok(max_pawn) = env::var("MAX_PAWN_TYPE") {
            self.matchmaking.max_pawn_type = max_pawn
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_PAWN_TYPE value: {}", max_pawn))?;
        }
        if let Ok(interval) = env::var("SWEEP_INTERVAL_SECONDS") {
            self.matchmaking.sweep_interval_seconds = interval
                .parse()
                .map_err(|_| anyhow!("Invalid SWEEP_INTERVAL_SECONDS value: {}", interval))?;
        }
        if let Ok(enable) = env::var("ENABLE_SWEEP") {
            self.matchmaking.enable_sweep = enable
                .parse()
                .map_err(|_| anyhow!("Invalid ENABLE_SWEEP value: {}", enable))?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.matchmaking.sweep_interval_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }
    if config.gateway.port == 0 {
        return Err(anyhow!("Gateway port cannot be 0"));
    }
    if config.gateway.port == config.service.health_port {
        return Err(anyhow!(
            "Gateway and health server cannot share port {}",
            config.gateway.port
        ));
    }
    if config.gateway.host.is_empty() {
        return Err(anyhow!("Gateway host cannot be empty"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate matchmaking settings
    if config.matchmaking.max_pawn_type < DEFAULT_MAX_PAWN_TYPE
        || config.matchmaking.max_pawn_type > PAWN_TYPE_CEILING
    {
        return Err(anyhow!(
            "Max pawn type must be between {} and {}",
            DEFAULT_MAX_PAWN_TYPE,
            PAWN_TYPE_CEILING
        ));
    }
    if config.matchmaking.sweep_interval_seconds == 0 {
        return Err(anyhow!("Sweep interval must be greater than 0"));
    }

    Ok(())
}
