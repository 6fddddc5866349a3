//! Typed resource declarations.
//!
//! Every resource spec carries a logical name unique within its unit and a
//! typed body. Properties that can point elsewhere are [`Value`]s, so the
//! references of a spec can be enumerated (for validation and graph
//! building) and rewritten (when inputs are resolved) without knowing the
//! body's shape.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tierstack_common::types::{Cidr, LogicalName};

use crate::iam::Role;
use crate::reference::{Attribute, Reference, Value};
use crate::security::SecurityBoundary;
use crate::service::DeployableService;

/// Kind of a declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Network boundary (VPC).
    Network,
    /// Security boundary (security group).
    SecurityBoundary,
    /// Compute cluster.
    Cluster,
    /// Keyed data store.
    DataStore,
    /// Private service-discovery namespace.
    DiscoveryNamespace,
    /// IAM role.
    Role,
    /// Log sink.
    LogSink,
    /// Load balancer.
    LoadBalancer,
    /// Load-balancer listener.
    Listener,
    /// Load-balancer target group.
    TargetGroup,
    /// Deployable service.
    Service,
}

impl ResourceKind {
    /// Attributes a realized resource of this kind exposes.
    #[must_use]
    pub const fn attributes(self) -> &'static [Attribute] {
        match self {
            Self::Network => &[Attribute::Id, Attribute::CidrBlock],
            Self::SecurityBoundary => &[Attribute::Id, Attribute::Name],
            Self::Cluster | Self::DiscoveryNamespace => {
                &[Attribute::Id, Attribute::Arn, Attribute::Name]
            }
            Self::DataStore | Self::Role | Self::LogSink | Self::TargetGroup => {
                &[Attribute::Arn, Attribute::Name]
            }
            Self::LoadBalancer => &[Attribute::Arn, Attribute::DnsName],
            Self::Listener => &[Attribute::Arn],
            Self::Service => &[Attribute::Arn, Attribute::Name, Attribute::DiscoveryName],
        }
    }

    /// Returns whether resources of this kind expose `attribute`.
    #[must_use]
    pub fn exposes(self, attribute: Attribute) -> bool {
        self.attributes().contains(&attribute)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::SecurityBoundary => "security-boundary",
            Self::Cluster => "cluster",
            Self::DataStore => "data-store",
            Self::DiscoveryNamespace => "discovery-namespace",
            Self::Role => "role",
            Self::LogSink => "log-sink",
            Self::LoadBalancer => "load-balancer",
            Self::Listener => "listener",
            Self::TargetGroup => "target-group",
            Self::Service => "service",
        };
        f.write_str(s)
    }
}

/// What happens to a resource's data when it is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Data is deleted with the resource.
    Destroy,
    /// Resource is orphaned and kept.
    Retain,
}

/// Network boundary with DNS settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkBoundary {
    /// Address range.
    pub cidr: Cidr,
    /// Whether instances get DNS hostnames.
    pub enable_dns_hostnames: bool,
    /// Whether DNS resolution is enabled.
    pub enable_dns_support: bool,
    /// Resource tags.
    pub tags: BTreeMap<String, String>,
}

/// Compute cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Network the cluster runs in.
    pub network: Value,
}

/// Partition key type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    /// Numeric key.
    Number,
    /// String key.
    String,
}

/// Keyed data store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStore {
    /// Table name.
    pub table_name: String,
    /// Partition key attribute name.
    pub partition_key: String,
    /// Partition key type.
    pub key_type: KeyType,
    /// Removal policy.
    pub removal: RemovalPolicy,
}

/// Private DNS namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryNamespace {
    /// Fully-qualified namespace name.
    pub namespace_name: String,
    /// Network the namespace resolves in.
    pub network: Value,
}

/// Log sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSink {
    /// Log group name.
    pub group_name: String,
    /// Removal policy.
    pub removal: RemovalPolicy,
}

/// Subnet placement of a load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetPlacement {
    /// Publicly routable subnets.
    Public,
    /// Private subnets.
    Private,
}

/// Application load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    /// Network the balancer lives in.
    pub network: Value,
    /// Whether the balancer has a public address.
    pub internet_facing: bool,
    /// Security boundary of the balancer.
    pub security_boundary: Value,
    /// Subnet placement.
    pub subnets: SubnetPlacement,
}

/// Application protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppProtocol {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

/// Listener on a load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    /// Owning load balancer.
    pub load_balancer: Value,
    /// Listening port.
    pub port: u16,
    /// Protocol.
    pub protocol: AppProtocol,
}

/// Health check of a target group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetHealthCheck {
    /// Whether health checking is enabled.
    pub enabled: bool,
    /// HTTP path probed with `GET`.
    pub path: String,
    /// Accepted status codes, comma separated.
    pub healthy_http_codes: String,
}

/// Target group behind a listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    /// Listener forwarding to this group.
    pub listener: Value,
    /// Target port.
    pub port: u16,
    /// Target protocol.
    pub protocol: AppProtocol,
    /// Health check.
    pub health_check: TargetHealthCheck,
}

/// Typed body of a resource spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceBody {
    /// Network boundary.
    Network(NetworkBoundary),
    /// Security boundary.
    SecurityBoundary(SecurityBoundary),
    /// Compute cluster.
    Cluster(Cluster),
    /// Data store.
    DataStore(DataStore),
    /// Discovery namespace.
    DiscoveryNamespace(DiscoveryNamespace),
    /// IAM role.
    Role(Role),
    /// Log sink.
    LogSink(LogSink),
    /// Load balancer.
    LoadBalancer(LoadBalancer),
    /// Listener.
    Listener(Listener),
    /// Target group.
    TargetGroup(TargetGroup),
    /// Deployable service.
    Service(Box<DeployableService>),
}

impl ResourceBody {
    /// Kind of this body.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Network(_) => ResourceKind::Network,
            Self::SecurityBoundary(_) => ResourceKind::SecurityBoundary,
            Self::Cluster(_) => ResourceKind::Cluster,
            Self::DataStore(_) => ResourceKind::DataStore,
            Self::DiscoveryNamespace(_) => ResourceKind::DiscoveryNamespace,
            Self::Role(_) => ResourceKind::Role,
            Self::LogSink(_) => ResourceKind::LogSink,
            Self::LoadBalancer(_) => ResourceKind::LoadBalancer,
            Self::Listener(_) => ResourceKind::Listener,
            Self::TargetGroup(_) => ResourceKind::TargetGroup,
            Self::Service(_) => ResourceKind::Service,
        }
    }

    /// Every property value of the body, literal or not.
    #[must_use]
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Self::Network(_) | Self::DataStore(_) | Self::LogSink(_) => Vec::new(),
            Self::SecurityBoundary(sg) => sg.values(),
            Self::Cluster(c) => vec![&c.network],
            Self::DiscoveryNamespace(ns) => vec![&ns.network],
            Self::Role(role) => role.values(),
            Self::LoadBalancer(lb) => vec![&lb.network, &lb.security_boundary],
            Self::Listener(l) => vec![&l.load_balancer],
            Self::TargetGroup(tg) => vec![&tg.listener],
            Self::Service(svc) => svc.values(),
        }
    }

    /// Mutable access to every property value of the body.
    pub fn values_mut(&mut self) -> Vec<&mut Value> {
        match self {
            Self::Network(_) | Self::DataStore(_) | Self::LogSink(_) => Vec::new(),
            Self::SecurityBoundary(sg) => sg.values_mut(),
            Self::Cluster(c) => vec![&mut c.network],
            Self::DiscoveryNamespace(ns) => vec![&mut ns.network],
            Self::Role(role) => role.values_mut(),
            Self::LoadBalancer(lb) => vec![&mut lb.network, &mut lb.security_boundary],
            Self::Listener(l) => vec![&mut l.load_balancer],
            Self::TargetGroup(tg) => vec![&mut tg.listener],
            Self::Service(svc) => svc.values_mut(),
        }
    }
}

/// A declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Logical name, unique within the unit.
    pub name: LogicalName,
    /// Typed body.
    #[serde(flatten)]
    pub body: ResourceBody,
}

impl ResourceSpec {
    /// Creates a resource spec.
    #[must_use]
    pub fn new(name: &str, body: ResourceBody) -> Self {
        Self {
            name: LogicalName::new(name),
            body,
        }
    }

    /// Kind of the resource.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.body.kind()
    }

    /// References held by the resource's properties.
    #[must_use]
    pub fn references(&self) -> Vec<&Reference> {
        self.body
            .values()
            .into_iter()
            .filter_map(Value::reference)
            .collect()
    }

    /// Logical names of same-unit resources this resource depends on.
    #[must_use]
    pub fn local_dependencies(&self) -> Vec<&LogicalName> {
        let mut deps: Vec<&LogicalName> = self
            .references()
            .into_iter()
            .filter_map(|r| match r {
                Reference::Resource { name, .. } => Some(name),
                Reference::Input { .. } => None,
            })
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }

    /// Names of unit inputs this resource reads.
    #[must_use]
    pub fn input_dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = self
            .references()
            .into_iter()
            .filter_map(|r| match r {
                Reference::Input { name } => Some(name.as_str()),
                Reference::Resource { .. } => None,
            })
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }

    /// Returns the service body, if this is a deployable service.
    #[must_use]
    pub fn as_service(&self) -> Option<&DeployableService> {
        match &self.body {
            ResourceBody::Service(svc) => Some(svc.as_ref()),
            _ => None,
        }
    }

    /// Returns the security boundary body, if this is one.
    #[must_use]
    pub const fn as_security_boundary(&self) -> Option<&SecurityBoundary> {
        match &self.body {
            ResourceBody::SecurityBoundary(sg) => Some(sg),
            _ => None,
        }
    }

    /// Returns the role body, if this is one.
    #[must_use]
    pub const fn as_role(&self) -> Option<&Role> {
        match &self.body {
            ResourceBody::Role(role) => Some(role),
            _ => None,
        }
    }
}
