//! Input resolution.
//!
//! Replaces every input reference of a unit with the concrete output value
//! it is bound to. Same-unit references are left untouched; only the
//! resource provider can resolve them.

use std::collections::BTreeMap;

use serde::Serialize;
use tierstack_common::error::{Result, TierstackError};
use tierstack_common::types::{LogicalName, UnitId};

use crate::graph::resource_order;
use crate::reference::{Reference, Value};
use crate::resource::ResourceSpec;
use crate::unit::UnitDecl;

/// A unit whose inputs have been substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedUnit {
    /// Unit identifier.
    pub id: UnitId,
    /// Input values that were substituted.
    pub inputs: BTreeMap<String, String>,
    /// Resources with input references replaced by literals.
    pub resources: Vec<ResourceSpec>,
    /// Outputs with input references replaced by literals.
    pub outputs: Vec<(String, Value)>,
}

impl ResolvedUnit {
    /// Looks up a resource by logical name.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&ResourceSpec> {
        self.resources.iter().find(|r| r.name.as_str() == name)
    }

    /// Input names still referenced after resolution.
    #[must_use]
    pub fn pending_inputs(&self) -> Vec<&str> {
        let mut pending: Vec<&str> = self
            .resources
            .iter()
            .flat_map(|r| r.body.values())
            .chain(self.outputs.iter().map(|(_, v)| v))
            .filter_map(|v| match v.reference() {
                Some(Reference::Input { name }) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        pending.sort_unstable();
        pending.dedup();
        pending
    }

    /// Resources in realization order.
    ///
    /// # Errors
    ///
    /// Returns [`TierstackError::CyclicDependency`] if same-unit references
    /// form a cycle.
    pub fn resource_order(&self) -> Result<Vec<LogicalName>> {
        resource_order(&self.id, &self.resources)
    }
}

/// Substitutes every declared input of `unit` with its value.
///
/// # Errors
///
/// Returns [`TierstackError::UnboundInput`] if a declared input has no
/// value.
pub fn resolve_inputs(unit: &UnitDecl, values: &BTreeMap<String, String>) -> Result<ResolvedUnit> {
    if let Some(missing) = unit.inputs().iter().find(|i| !values.contains_key(*i)) {
        return Err(TierstackError::UnboundInput {
            unit: unit.id().clone(),
            input: missing.clone(),
        });
    }
    Ok(substitute(unit, values))
}

/// Substitutes the inputs that have values and leaves the rest as
/// references. Used to show a unit before its dependencies are realized.
#[must_use]
pub fn resolve_available(unit: &UnitDecl, values: &BTreeMap<String, String>) -> ResolvedUnit {
    substitute(unit, values)
}

fn substitute(unit: &UnitDecl, values: &BTreeMap<String, String>) -> ResolvedUnit {
    let inputs: BTreeMap<String, String> = unit
        .inputs()
        .iter()
        .filter_map(|i| values.get(i).map(|v| (i.clone(), v.clone())))
        .collect();

    let mut resources = unit.resources().to_vec();
    for spec in &mut resources {
        for value in spec.body.values_mut() {
            inject(value, &inputs);
        }
    }
    let mut outputs = unit.outputs().to_vec();
    for (_, value) in &mut outputs {
        inject(value, &inputs);
    }

    tracing::debug!(unit = %unit.id(), inputs = inputs.len(), "resolved unit inputs");
    ResolvedUnit {
        id: unit.id().clone(),
        inputs,
        resources,
        outputs,
    }
}

fn inject(value: &mut Value, inputs: &BTreeMap<String, String>) {
    if let Value::Ref(Reference::Input { name }) = value {
        if let Some(resolved) = inputs.get(name.as_str()) {
            *value = Value::literal(resolved.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Attribute;
    use crate::resource::{Cluster, ResourceBody};

    fn unit() -> UnitDecl {
        UnitDecl::new("app")
            .input("vpc")
            .input("region-name")
            .resource(
                "cluster",
                ResourceBody::Cluster(Cluster {
                    network: Value::input("vpc"),
                }),
            )
            .output("cluster", Value::attr("cluster", Attribute::Arn))
            .output("region", Value::input("region-name"))
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn resolve_replaces_inputs_with_literals() {
        let resolved = resolve_inputs(
            &unit(),
            &values(&[("vpc", "vpc-1"), ("region-name", "ap-northeast-1")]),
        )
        .expect("should resolve");

        let cluster = resolved.resource("cluster").expect("cluster");
        assert_eq!(cluster.body.values(), vec![&Value::literal("vpc-1")]);
        assert_eq!(resolved.outputs[1].1, Value::literal("ap-northeast-1"));
        assert!(resolved.pending_inputs().is_empty());
    }

    #[test]
    fn resolve_keeps_same_unit_references() {
        let resolved = resolve_inputs(
            &unit(),
            &values(&[("vpc", "vpc-1"), ("region-name", "r")]),
        )
        .expect("should resolve");
        assert_eq!(resolved.outputs[0].1, Value::attr("cluster", Attribute::Arn));
    }

    #[test]
    fn resolve_missing_input_fails() {
        let err = resolve_inputs(&unit(), &values(&[("vpc", "vpc-1")])).unwrap_err();
        assert!(matches!(
            err,
            TierstackError::UnboundInput { ref input, .. } if input == "region-name"
        ));
    }

    #[test]
    fn resolve_available_leaves_pending_inputs() {
        let resolved = resolve_available(&unit(), &values(&[("vpc", "vpc-1")]));
        assert_eq!(resolved.pending_inputs(), vec!["region-name"]);
        assert_eq!(resolved.inputs.len(), 1);
    }

    #[test]
    fn undeclared_values_are_ignored() {
        let resolved = resolve_available(&unit(), &values(&[("unrelated", "x")]));
        assert!(resolved.inputs.is_empty());
        assert_eq!(resolved.pending_inputs(), vec!["region-name", "vpc"]);
    }
}
