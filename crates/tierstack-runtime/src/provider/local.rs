//! In-process resource provider.
//!
//! Realizes resources without talking to any cloud: physical identities,
//! ARNs and DNS names are derived deterministically from the region, unit
//! and logical name, so realizing the same unit twice yields the same
//! outputs. Realized resources are kept for inspection.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tierstack_common::error::{Result, TierstackError};
use tierstack_common::types::{LogicalName, Region, UnitId};
use tierstack_compose::reference::{Attribute, Reference, Value};
use tierstack_compose::resolver::ResolvedUnit;
use tierstack_compose::resource::{ResourceBody, ResourceKind, ResourceSpec};

use super::ResourceProvider;
use crate::store::OutputValue;

/// Account identifier used in generated ARNs.
pub const LOCAL_ACCOUNT_ID: &str = "000000000000";

/// A resource realized by [`LocalProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealizedResource {
    /// Logical name.
    pub name: LogicalName,
    /// Body with every reference replaced by its value.
    pub body: ResourceBody,
    /// Attributes produced by realization.
    pub attributes: BTreeMap<Attribute, String>,
}

impl RealizedResource {
    /// Kind of the resource.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.body.kind()
    }

    /// One produced attribute.
    #[must_use]
    pub fn attribute(&self, attribute: Attribute) -> Option<&str> {
        self.attributes.get(&attribute).map(String::as_str)
    }
}

/// Provider that realizes units in memory.
#[derive(Debug, Default)]
pub struct LocalProvider {
    units: BTreeMap<UnitId, Vec<RealizedResource>>,
    failures: BTreeMap<UnitId, String>,
}

impl LocalProvider {
    /// Creates a provider with nothing realized.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every realization of `unit` fail with `message`.
    #[must_use]
    pub fn failing_on(mut self, unit: &str, message: &str) -> Self {
        let _ = self.failures.insert(UnitId::new(unit), message.to_string());
        self
    }

    /// Removes an injected failure.
    pub fn clear_failure(&mut self, unit: &UnitId) {
        let _ = self.failures.remove(unit);
    }

    /// Resources realized for `unit`, in realization order.
    #[must_use]
    pub fn resources(&self, unit: &UnitId) -> Option<&[RealizedResource]> {
        self.units.get(unit).map(Vec::as_slice)
    }

    /// One realized resource.
    #[must_use]
    pub fn resource(&self, unit: &UnitId, name: &str) -> Option<&RealizedResource> {
        self.resources(unit)?
            .iter()
            .find(|r| r.name.as_str() == name)
    }

    /// Returns whether `unit` is currently realized.
    #[must_use]
    pub fn is_realized(&self, unit: &UnitId) -> bool {
        self.units.contains_key(unit)
    }
}

impl ResourceProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn realize(
        &mut self,
        region: &Region,
        unit: &ResolvedUnit,
    ) -> Result<BTreeMap<String, OutputValue>> {
        if let Some(message) = self.failures.get(&unit.id) {
            let resource = unit
                .resources
                .first()
                .map_or_else(|| unit.id.to_string(), |r| r.name.to_string());
            return Err(TierstackError::Provider {
                resource,
                message: message.clone(),
            });
        }
        if let Some(input) = unit.pending_inputs().first() {
            return Err(TierstackError::Provider {
                resource: unit.id.to_string(),
                message: format!("input \"{input}\" was not resolved"),
            });
        }

        let mut realized: Vec<RealizedResource> = Vec::with_capacity(unit.resources.len());
        for name in unit.resource_order()? {
            let Some(spec) = unit.resource(name.as_str()) else {
                continue;
            };
            let resource = realize_resource(region, &unit.id, spec, &realized)?;
            tracing::debug!(
                unit = %unit.id,
                resource = %resource.name,
                kind = %resource.kind(),
                "resource realized"
            );
            realized.push(resource);
        }

        let mut outputs = BTreeMap::new();
        for (name, value) in &unit.outputs {
            let output = evaluate(value, &realized).map_err(|message| TierstackError::Provider {
                resource: format!("output {name}"),
                message,
            })?;
            let _ = outputs.insert(name.clone(), output);
        }

        let _ = self.units.insert(unit.id.clone(), realized);
        Ok(outputs)
    }

    fn destroy(&mut self, region: &Region, unit: &UnitId) -> Result<()> {
        if let Some(resources) = self.units.remove(unit) {
            tracing::debug!(%region, %unit, resources = resources.len(), "unit destroyed");
        }
        Ok(())
    }
}

fn lookup<'a>(
    realized: &'a [RealizedResource],
    name: &LogicalName,
    attribute: Attribute,
) -> std::result::Result<&'a str, String> {
    let target = realized
        .iter()
        .find(|r| &r.name == name)
        .ok_or_else(|| format!("{name} has not been realized"))?;
    target
        .attribute(attribute)
        .ok_or_else(|| format!("{} {name} produces no {attribute}", target.kind()))
}

fn evaluate(value: &Value, realized: &[RealizedResource]) -> std::result::Result<OutputValue, String> {
    match value {
        Value::Literal(s) => Ok(OutputValue::literal(s.clone())),
        Value::Ref(Reference::Resource { name, attribute }) => {
            lookup(realized, name, *attribute).map(|v| OutputValue::from_attribute(v, *attribute))
        }
        Value::Ref(Reference::Input { name }) => Err(format!("input \"{name}\" was not resolved")),
    }
}

fn realize_resource(
    region: &Region,
    unit: &UnitId,
    spec: &ResourceSpec,
    realized: &[RealizedResource],
) -> Result<RealizedResource> {
    let mut body = spec.body.clone();
    for value in body.values_mut() {
        let resolved = evaluate(value, realized).map_err(|message| TierstackError::Provider {
            resource: spec.name.to_string(),
            message,
        })?;
        *value = Value::literal(resolved.value());
    }
    let attributes = attributes(region, unit, &spec.name, &body);
    Ok(RealizedResource {
        name: spec.name.clone(),
        body,
        attributes,
    })
}

/// Deterministic short identity of a resource.
fn physical_id(region: &Region, unit: &UnitId, name: &LogicalName) -> String {
    let mut hasher = Sha256::new();
    hasher.update(region.as_str().as_bytes());
    hasher.update(b"/");
    hasher.update(unit.as_str().as_bytes());
    hasher.update(b"/");
    hasher.update(name.as_str().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..17].to_string()
}

fn arn(service: &str, region: &Region, resource: &str) -> String {
    format!("arn:aws:{service}:{region}:{LOCAL_ACCOUNT_ID}:{resource}")
}

fn attributes(
    region: &Region,
    unit: &UnitId,
    name: &LogicalName,
    body: &ResourceBody,
) -> BTreeMap<Attribute, String> {
    let id = physical_id(region, unit, name);
    let short = &id[..8];
    let qualified = format!("{unit}-{name}-{short}");
    let mut attrs = BTreeMap::new();
    let mut set = |attribute: Attribute, value: String| {
        let _ = attrs.insert(attribute, value);
    };
    match body {
        ResourceBody::Network(vpc) => {
            set(Attribute::Id, format!("vpc-{id}"));
            set(Attribute::CidrBlock, vpc.cidr.to_string());
        }
        ResourceBody::SecurityBoundary(sg) => {
            set(Attribute::Id, format!("sg-{id}"));
            set(Attribute::Name, sg.group_name.clone());
        }
        ResourceBody::Cluster(_) => {
            set(Attribute::Arn, arn("ecs", region, &format!("cluster/{qualified}")));
            set(Attribute::Id, qualified.clone());
            set(Attribute::Name, qualified);
        }
        ResourceBody::DiscoveryNamespace(ns) => {
            let ns_id = format!("ns-{id}");
            set(
                Attribute::Arn,
                arn("servicediscovery", region, &format!("namespace/{ns_id}")),
            );
            set(Attribute::Id, ns_id);
            set(Attribute::Name, ns.namespace_name.clone());
        }
        ResourceBody::DataStore(table) => {
            set(Attribute::Name, table.table_name.clone());
            set(
                Attribute::Arn,
                arn("dynamodb", region, &format!("table/{}", table.table_name)),
            );
        }
        ResourceBody::Role(_) => {
            set(
                Attribute::Arn,
                format!("arn:aws:iam::{LOCAL_ACCOUNT_ID}:role/{qualified}"),
            );
            set(Attribute::Name, qualified);
        }
        ResourceBody::LogSink(sink) => {
            set(Attribute::Name, sink.group_name.clone());
            set(
                Attribute::Arn,
                arn("logs", region, &format!("log-group:{}", sink.group_name)),
            );
        }
        ResourceBody::LoadBalancer(_) => {
            set(
                Attribute::Arn,
                arn(
                    "elasticloadbalancing",
                    region,
                    &format!("loadbalancer/app/{qualified}/{id}"),
                ),
            );
            set(
                Attribute::DnsName,
                format!("{qualified}.{region}.elb.amazonaws.com"),
            );
        }
        ResourceBody::Listener(_) => {
            set(
                Attribute::Arn,
                arn(
                    "elasticloadbalancing",
                    region,
                    &format!("listener/app/{qualified}/{id}"),
                ),
            );
        }
        ResourceBody::TargetGroup(_) => {
            set(
                Attribute::Arn,
                arn(
                    "elasticloadbalancing",
                    region,
                    &format!("targetgroup/{qualified}/{id}"),
                ),
            );
            set(Attribute::Name, qualified);
        }
        ResourceBody::Service(svc) => {
            set(
                Attribute::Arn,
                arn("ecs", region, &format!("service/{qualified}")),
            );
            set(Attribute::Name, qualified);
            if let Some(discovery) = svc.discoverable_name(name.as_str()) {
                set(Attribute::DiscoveryName, discovery.to_string());
            }
        }
    }
    attrs
}
