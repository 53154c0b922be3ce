//! Store health checks

use crate::model::Timestamp;
use crate::store::SqlExecutor;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// A probe slower than this marks the store degraded
pub const SLOW_PROBE: Duration = Duration::from_secs(1);

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> u16 {
        match self {
            HealthStatus::Healthy | HealthStatus::Degraded => 200,
            HealthStatus::Unhealthy => 503,
        }
    }
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    /// Epoch millis
    pub timestamp: i64,
    pub components: Vec<ComponentHealth>,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

impl ComponentHealth {
    fn new(name: &str, status: HealthStatus, message: Option<String>, latency: Duration) -> Self {
        Self {
            name: name.to_string(),
            status,
            message,
            latency_ms: latency.as_millis() as u64,
        }
    }
}

/// Probes every store with `SELECT 1`
#[derive(Debug, Clone)]
pub struct HealthChecker {
    started: Instant,
    version: String,
    stores: Vec<SqlExecutor>,
}

impl HealthChecker {
    pub fn new(version: impl Into<String>, stores: Vec<SqlExecutor>) -> Self {
        Self {
            started: Instant::now(),
            version: version.into(),
            stores,
        }
    }

    pub async fn check(&self) -> HealthReport {
        let mut components = Vec::with_capacity(self.stores.len());
        for store in &self.stores {
            components.push(probe(store).await);
        }

        let status = if components.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if components.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthReport {
            status,
            timestamp: Timestamp::now().as_millis(),
            components,
            version: self.version.clone(),
            uptime_seconds: self.started.elapsed().as_secs(),
        }
    }
}

async fn probe(store: &SqlExecutor) -> ComponentHealth {
    let start = Instant::now();
    let result = store.ping().await;
    let latency = start.elapsed();

    match result {
        Ok(()) if latency > SLOW_PROBE => ComponentHealth::new(
            store.name(),
            HealthStatus::Degraded,
            Some(format!("Probe took {}ms", latency.as_millis())),
            latency,
        ),
        Ok(()) => ComponentHealth::new(store.name(), HealthStatus::Healthy, None, latency),
        Err(e) => {
            tracing::warn!(store = store.name(), error = %e, "Store health probe failed");
            ComponentHealth::new(store.name(), HealthStatus::Unhealthy, Some(e.to_string()), latency)
        }
    }
}
