//! Deployable services and their single container definition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tierstack_common::config::HealthCheckTimings;

use crate::reference::Value;

/// Where a container image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRef {
    /// A local build context resolved by the image supplier.
    Asset(String),
    /// A prebuilt image URI.
    Registry(String),
}

/// Transport protocol of a port mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportProtocol {
    /// TCP.
    Tcp,
    /// UDP.
    Udp,
}

/// A container port exposed on the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Port inside the container.
    pub container_port: u16,
    /// Port on the task's network interface.
    pub host_port: u16,
    /// Transport protocol.
    pub protocol: TransportProtocol,
}

impl PortMapping {
    /// A TCP mapping with identical container and host ports.
    #[must_use]
    pub const fn tcp(port: u16) -> Self {
        Self {
            container_port: port,
            host_port: port,
            protocol: TransportProtocol::Tcp,
        }
    }
}

/// Container health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Probe command, e.g. `["CMD-SHELL", "curl -f ..."]`.
    pub command: Vec<String>,
    /// Seconds between probes.
    pub interval_secs: u32,
    /// Seconds before a probe counts as failed.
    pub timeout_secs: u32,
    /// Grace period after start.
    pub start_period_secs: u32,
    /// Failures before the container is unhealthy.
    pub retries: u32,
}

impl HealthCheck {
    /// An HTTP probe against `localhost:<port><path>`.
    #[must_use]
    pub fn http_probe(port: u16, path: &str, timings: &HealthCheckTimings) -> Self {
        Self {
            command: vec![
                "CMD-SHELL".into(),
                format!("curl -f http://localhost:{port}{path} || exit 1"),
            ],
            interval_secs: timings.interval_secs,
            timeout_secs: timings.timeout_secs,
            start_period_secs: timings.start_period_secs,
            retries: timings.retries,
        }
    }
}

/// Log shipping configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Destination log sink.
    pub log_sink: Value,
    /// Stream name prefix.
    pub stream_prefix: String,
}

/// The single container of a service's task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    /// Container name.
    pub name: String,
    /// Image to run.
    pub image: ImageRef,
    /// Environment passed to the process.
    pub environment: BTreeMap<String, Value>,
    /// Optional health check.
    pub health_check: Option<HealthCheck>,
    /// Exposed ports; at least one.
    pub port_mappings: Vec<PortMapping>,
    /// Optional log shipping.
    pub logging: Option<LogConfig>,
}

/// Task sizing, roles, and the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// CPU units.
    pub cpu: u32,
    /// Memory in MiB.
    pub memory_mib: u32,
    /// Role used by the orchestrator to pull images and ship logs.
    pub execution_role: Value,
    /// Role assumed by the application.
    pub task_role: Value,
    /// The container.
    pub container: ContainerDefinition,
}

/// DNS record type of a discovery registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DnsRecordType {
    /// IPv4 address record.
    A,
    /// Service record.
    Srv,
}

/// Registration of a service in a discovery namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRegistration {
    /// Target namespace.
    pub namespace: Value,
    /// Discoverable name; the service's logical name when absent.
    pub name: Option<String>,
    /// Record type.
    pub record_type: DnsRecordType,
    /// Record TTL in seconds.
    pub ttl_secs: u32,
    /// Container port the records point at.
    pub container_port: u16,
}

/// Attachment of a service to a load-balancer target group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroupAttachment {
    /// Target group to register with.
    pub target_group: Value,
    /// Container port receiving traffic.
    pub container_port: u16,
}

/// A running set of identical tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployableService {
    /// Compute cluster the service runs in.
    pub cluster: Value,
    /// Number of tasks to keep running.
    pub desired_count: u32,
    /// Whether tasks get a public address.
    pub assign_public_ip: bool,
    /// Whether interactive execution into tasks is enabled.
    pub enable_execute_command: bool,
    /// Security boundaries applied to the tasks.
    pub security_boundaries: Vec<Value>,
    /// Task definition.
    pub task: TaskDefinition,
    /// Optional discovery registration.
    pub discovery: Option<DiscoveryRegistration>,
    /// Optional target-group attachment.
    pub load_balancer: Option<TargetGroupAttachment>,
}

impl DeployableService {
    /// Returns whether the container exposes `port`.
    #[must_use]
    pub fn exposes(&self, port: u16) -> bool {
        self.task
            .container
            .port_mappings
            .iter()
            .any(|m| m.container_port == port)
    }

    /// Name the service is discoverable under, if registered.
    #[must_use]
    pub fn discoverable_name<'a>(&'a self, logical_name: &'a str) -> Option<&'a str> {
        self.discovery
            .as_ref()
            .map(|d| d.name.as_deref().unwrap_or(logical_name))
    }

    /// Checks the service's own invariants.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    pub fn check(&self) -> Result<(), String> {
        let container = &self.task.container;
        if container.port_mappings.is_empty() {
            return Err(format!("container {} exposes no ports", container.name));
        }
        if self.desired_count == 0 {
            return Err("desired count must be at least 1".into());
        }
        if let Some(discovery) = &self.discovery {
            if !self.exposes(discovery.container_port) {
                return Err(format!(
                    "discovery registration targets unexposed port {}",
                    discovery.container_port
                ));
            }
            if discovery.ttl_secs == 0 {
                return Err("discovery TTL must be non-zero".into());
            }
        }
        if let Some(attachment) = &self.load_balancer {
            if !self.exposes(attachment.container_port) {
                return Err(format!(
                    "target-group attachment targets unexposed port {}",
                    attachment.container_port
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn values(&self) -> Vec<&Value> {
        let mut values = vec![
            &self.cluster,
            &self.task.execution_role,
            &self.task.task_role,
        ];
        values.extend(&self.security_boundaries);
        values.extend(self.task.container.environment.values());
        if let Some(logging) = &self.task.container.logging {
            values.push(&logging.log_sink);
        }
        if let Some(discovery) = &self.discovery {
            values.push(&discovery.namespace);
        }
        if let Some(attachment) = &self.load_balancer {
            values.push(&attachment.target_group);
        }
        values
    }

    pub(crate) fn values_mut(&mut self) -> Vec<&mut Value> {
        let Self {
            cluster,
            security_boundaries,
            task,
            discovery,
            load_balancer,
            ..
        } = self;
        let mut values = vec![cluster, &mut task.execution_role, &mut task.task_role];
        values.extend(security_boundaries.iter_mut());
        values.extend(task.container.environment.values_mut());
        if let Some(logging) = &mut task.container.logging {
            values.push(&mut logging.log_sink);
        }
        if let Some(discovery) = discovery {
            values.push(&mut discovery.namespace);
        }
        if let Some(attachment) = load_balancer {
            values.push(&mut attachment.target_group);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Attribute;

    fn service() -> DeployableService {
        DeployableService {
            cluster: Value::input("cluster"),
            desired_count: 1,
            assign_public_ip: false,
            enable_execute_command: true,
            security_boundaries: vec![Value::input("sg")],
            task: TaskDefinition {
                cpu: 256,
                memory_mib: 512,
                execution_role: Value::input("execution-role"),
                task_role: Value::input("task-role"),
                container: ContainerDefinition {
                    name: "app".into(),
                    image: ImageRef::Asset("app".into()),
                    environment: BTreeMap::from([("A".to_string(), Value::literal("1"))]),
                    health_check: None,
                    port_mappings: vec![PortMapping::tcp(8080)],
                    logging: None,
                },
            },
            discovery: Some(DiscoveryRegistration {
                namespace: Value::input("namespace"),
                name: None,
                record_type: DnsRecordType::A,
                ttl_secs: 10,
                container_port: 8080,
            }),
            load_balancer: None,
        }
    }

    #[test]
    fn http_probe_builds_curl_command() {
        let check = HealthCheck::http_probe(10000, "/ishealthy", &HealthCheckTimings::default());
        assert_eq!(
            check.command,
            vec!["CMD-SHELL", "curl -f http://localhost:10000/ishealthy || exit 1"]
        );
        assert_eq!(check.interval_secs, 10);
        assert_eq!(check.timeout_secs, 5);
        assert_eq!(check.start_period_secs, 10);
        assert_eq!(check.retries, 2);
    }

    #[test]
    fn discoverable_name_defaults_to_logical_name() {
        let svc = service();
        assert_eq!(svc.discoverable_name("service"), Some("service"));

        let mut named = service();
        if let Some(d) = named.discovery.as_mut() {
            d.name = Some("backend".into());
        }
        assert_eq!(named.discoverable_name("service"), Some("backend"));

        let mut hidden = service();
        hidden.discovery = None;
        assert_eq!(hidden.discoverable_name("service"), None);
    }

    #[test]
    fn check_rejects_discovery_on_unexposed_port() {
        let mut svc = service();
        if let Some(d) = svc.discovery.as_mut() {
            d.container_port = 9999;
        }
        let msg = svc.check().unwrap_err();
        assert!(msg.contains("9999"), "got: {msg}");
    }

    #[test]
    fn check_rejects_attachment_on_unexposed_port() {
        let mut svc = service();
        svc.load_balancer = Some(TargetGroupAttachment {
            target_group: Value::attr("tg", Attribute::Arn),
            container_port: 80,
        });
        assert!(svc.check().is_err());
    }

    #[test]
    fn check_rejects_portless_container() {
        let mut svc = service();
        svc.task.container.port_mappings.clear();
        svc.discovery = None;
        assert!(svc.check().is_err());
    }

    #[test]
    fn values_cover_every_reference_site() {
        let mut svc = service();
        assert_eq!(svc.values().len(), 6);
        assert_eq!(svc.values_mut().len(), 6);
    }
}
