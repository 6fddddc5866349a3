//! Configuration model for topology realization.
//!
//! [`ServiceContract`] is the single source of truth for values that more
//! than one unit must agree on (ports, health-check path, DNS TTL, names).
//! Every unit declaration reads it by reference instead of repeating literals.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TierstackError};
use crate::types::{Cidr, Region};

/// Container health-check timing policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckTimings {
    /// Seconds between probes.
    pub interval_secs: u32,
    /// Seconds before a probe counts as failed.
    pub timeout_secs: u32,
    /// Grace period after start before failures count.
    pub start_period_secs: u32,
    /// Consecutive failures before the container is unhealthy.
    pub retries: u32,
}

impl Default for HealthCheckTimings {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            timeout_secs: 5,
            start_period_secs: 10,
            retries: 2,
        }
    }
}

/// Values shared between the network, backend, and frontend units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceContract {
    /// HTTP path probed by container and load-balancer health checks.
    pub health_check_path: String,
    /// Status codes the load balancer accepts as healthy.
    pub healthy_http_codes: Vec<u16>,
    /// Container port of the backend service.
    pub backend_port: u16,
    /// Container port of the frontend service.
    pub frontend_port: u16,
    /// Public listener port of the load balancer.
    pub listener_port: u16,
    /// TTL of service-discovery records.
    pub dns_ttl_secs: u32,
    /// Discoverable name the backend registers under.
    pub backend_service_name: String,
    /// Fully-qualified name of the private discovery namespace.
    pub namespace_name: String,
    /// Address range of the network boundary.
    pub network_cidr: Cidr,
    /// `Name` tag applied to the network boundary.
    pub network_tag_name: String,
    /// Name of the keyed data store.
    pub table_name: String,
    /// Numeric partition key of the data store.
    pub table_partition_key: String,
    /// Log sink receiving backend container logs.
    pub backend_log_sink: String,
    /// Log sink receiving frontend container logs.
    pub frontend_log_sink: String,
    /// Log stream prefix used by both containers.
    pub log_stream_prefix: String,
    /// Backend container health-check policy.
    pub health_check: HealthCheckTimings,
    /// CPU units reserved per task.
    pub task_cpu: u32,
    /// Memory reserved per task, in MiB.
    pub task_memory_mib: u32,
    /// Desired instance count of each service.
    pub desired_count: u32,
    /// Build context of the backend image.
    pub backend_image: String,
    /// Build context of the frontend image.
    pub frontend_image: String,
}

impl Default for ServiceContract {
    fn default() -> Self {
        Self {
            health_check_path: "/ishealthy".into(),
            healthy_http_codes: vec![200, 301],
            backend_port: 10000,
            frontend_port: 80,
            listener_port: 80,
            dns_ttl_secs: 10,
            backend_service_name: "backend".into(),
            namespace_name: "cdk.ecs.local".into(),
            network_cidr: Cidr::from_raw(Ipv4Addr::new(10, 0, 0, 0), 16),
            network_tag_name: "CDKECSVPC".into(),
            table_name: "my-dynamodb".into(),
            table_partition_key: "TodoId".into(),
            backend_log_sink: "myapp-backend".into(),
            frontend_log_sink: "myapp-frontend".into(),
            log_stream_prefix: "my-stream".into(),
            health_check: HealthCheckTimings::default(),
            task_cpu: 256,
            task_memory_mib: 512,
            desired_count: 1,
            backend_image: "backend".into(),
            frontend_image: "frontend".into(),
        }
    }
}

impl ServiceContract {
    /// Checks that the contract values are usable by every unit.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.health_check_path.starts_with('/') {
            return Err(config_err(format!(
                "health_check_path must start with '/': {}",
                self.health_check_path
            )));
        }
        if self.healthy_http_codes.is_empty() {
            return Err(config_err("healthy_http_codes must not be empty"));
        }
        if let Some(code) = self
            .healthy_http_codes
            .iter()
            .find(|c| !(100..=599).contains(*c))
        {
            return Err(config_err(format!("invalid HTTP status code: {code}")));
        }
        for (field, port) in [
            ("backend_port", self.backend_port),
            ("frontend_port", self.frontend_port),
            ("listener_port", self.listener_port),
        ] {
            if port == 0 {
                return Err(config_err(format!("{field} must be non-zero")));
            }
        }
        if self.dns_ttl_secs == 0 {
            return Err(config_err("dns_ttl_secs must be non-zero"));
        }
        if self.health_check.timeout_secs >= self.health_check.interval_secs {
            return Err(config_err(
                "health_check.timeout_secs must be shorter than interval_secs",
            ));
        }
        if self.desired_count == 0 {
            return Err(config_err("desired_count must be at least 1"));
        }
        if self.backend_service_name.is_empty() || self.namespace_name.is_empty() {
            return Err(config_err(
                "backend_service_name and namespace_name must not be empty",
            ));
        }
        Ok(())
    }

    /// Healthy status codes in the comma-separated form load balancers expect.
    #[must_use]
    pub fn healthy_codes_matcher(&self) -> String {
        self.healthy_http_codes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Root configuration for realizing a topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Target deployment region.
    pub region: Region,
    /// Path to the realized-outputs state file.
    pub state_file: PathBuf,
    /// Cross-unit contract values.
    pub contract: ServiceContract,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            region: Region::default(),
            state_file: crate::constants::default_state_file(),
            contract: ServiceContract::default(),
        }
    }
}

impl TopologyConfig {
    /// Loads a YAML configuration file; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML,
    /// or holds an invalid contract.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading topology configuration");
        let content = std::fs::read_to_string(path).map_err(|e| TierstackError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.contract.validate()?;
        Ok(config)
    }
}

fn config_err(message: impl Into<String>) -> TierstackError {
    TierstackError::Config {
        message: message.into(),
    }
}
