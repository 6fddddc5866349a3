//! Static validation of a topology.
//!
//! Every declaration error is reported here, before the resource provider
//! is ever called: duplicate names, dangling references, attributes a
//! resource kind never produces, unbound inputs, and cycles within or
//! across units.

use std::collections::HashSet;

use tierstack_common::error::{Result, TierstackError};
use tierstack_common::types::UnitId;

use crate::graph::resource_order;
use crate::reference::{Attribute, Reference};
use crate::topology::Topology;
use crate::unit::UnitDecl;

/// Validates a topology.
///
/// # Checks performed
///
/// 1. Unit identifiers are unique, and so are input, resource and output
///    names within each unit.
/// 2. Every reference targets a declared resource or input of its own
///    unit, and asks for an attribute that resource produces.
/// 3. Services satisfy their own invariants (ports, TTL, attachments).
/// 4. Same-unit references form a DAG.
/// 5. Bindings connect declared inputs to declared outputs of units
///    declared earlier, and every input is bound exactly once.
/// 6. Bindings and explicit edges form a DAG over units.
///
/// # Errors
///
/// Returns the first declaration error found.
pub fn validate(topology: &Topology) -> Result<()> {
    tracing::info!(units = topology.units().len(), "validating topology");
    check_duplicate_units(topology)?;
    for unit in topology.units() {
        validate_unit(unit)?;
    }
    check_bindings(topology)?;
    check_edges(topology)?;
    check_inputs_bound(topology)?;
    let order = topology.realization_order()?;
    check_declaration_order(topology)?;
    tracing::debug!(?order, "topology is valid");
    Ok(())
}

/// Validates one unit in isolation.
///
/// # Errors
///
/// Returns the first declaration error found within the unit.
pub fn validate_unit(unit: &UnitDecl) -> Result<()> {
    let scope = format!("unit {}", unit.id());
    check_unique("input", &scope, unit.inputs().iter().map(String::as_str))?;
    check_unique(
        "resource",
        &scope,
        unit.resources().iter().map(|r| r.name.as_str()),
    )?;
    check_unique("output", &scope, unit.outputs().iter().map(|(n, _)| n.as_str()))?;

    for spec in unit.resources() {
        for reference in spec.references() {
            check_reference(unit, spec.name.as_str(), reference)?;
        }
        if let Some(service) = spec.as_service() {
            service
                .check()
                .map_err(|message| TierstackError::InvalidResource {
                    unit: unit.id().clone(),
                    resource: spec.name.to_string(),
                    message,
                })?;
        }
    }
    for (name, value) in unit.outputs() {
        if let Some(reference) = value.reference() {
            check_reference(unit, &format!("output {name}"), reference)?;
        }
    }

    let _ = resource_order(unit.id(), unit.resources())?;
    Ok(())
}

fn check_unique<'a>(
    kind: &'static str,
    scope: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(TierstackError::DuplicateName {
                kind,
                name: name.to_string(),
                scope: scope.to_string(),
            });
        }
    }
    Ok(())
}

fn check_duplicate_units(topology: &Topology) -> Result<()> {
    check_unique(
        "unit",
        "composition",
        topology.units().iter().map(|u| u.id().as_str()),
    )
}

fn check_reference(unit: &UnitDecl, resource: &str, reference: &Reference) -> Result<()> {
    match reference {
        Reference::Input { name } => {
            if unit.declares_input(name) {
                Ok(())
            } else {
                Err(TierstackError::UnknownReference {
                    unit: unit.id().clone(),
                    resource: resource.to_string(),
                    target: format!("input \"{name}\""),
                })
            }
        }
        Reference::Resource { name, attribute } => {
            let target = unit.resource_named(name.as_str()).ok_or_else(|| {
                TierstackError::UnknownReference {
                    unit: unit.id().clone(),
                    resource: resource.to_string(),
                    target: format!("resource \"{name}\""),
                }
            })?;
            let kind = target.kind();
            let produced = kind.exposes(*attribute)
                && (*attribute != Attribute::DiscoveryName
                    || target
                        .as_service()
                        .is_some_and(|svc| svc.discovery.is_some()));
            if produced {
                Ok(())
            } else {
                Err(TierstackError::InvalidAttribute {
                    unit: unit.id().clone(),
                    resource: resource.to_string(),
                    target: format!("{kind} \"{name}\""),
                    attribute: attribute.to_string(),
                })
            }
        }
    }
}

fn require_unit<'a>(topology: &'a Topology, id: &UnitId) -> Result<&'a UnitDecl> {
    topology
        .unit(id.as_str())
        .ok_or_else(|| TierstackError::UnknownUnit { id: id.to_string() })
}

fn check_bindings(topology: &Topology) -> Result<()> {
    let mut bound = HashSet::new();
    for binding in topology.bindings() {
        let consumer = require_unit(topology, &binding.consumer)?;
        let producer = require_unit(topology, &binding.producer)?;
        if !consumer.declares_input(&binding.input) {
            return Err(TierstackError::UnknownReference {
                unit: binding.consumer.clone(),
                resource: format!("binding from {}.{}", binding.producer, binding.output),
                target: format!("input \"{}\"", binding.input),
            });
        }
        if !producer.declares_output(&binding.output) {
            return Err(TierstackError::UnknownOutput {
                unit: binding.producer.clone(),
                output: binding.output.clone(),
            });
        }
        if !bound.insert((&binding.consumer, binding.input.as_str())) {
            return Err(TierstackError::DuplicateName {
                kind: "binding",
                name: binding.input.clone(),
                scope: format!("unit {}", binding.consumer),
            });
        }
    }
    Ok(())
}

fn check_edges(topology: &Topology) -> Result<()> {
    for edge in topology.edges() {
        let _ = require_unit(topology, &edge.dependent)?;
        let _ = require_unit(topology, &edge.dependency)?;
    }
    Ok(())
}

fn check_inputs_bound(topology: &Topology) -> Result<()> {
    for unit in topology.units() {
        for input in unit.inputs() {
            let bound = topology
                .bindings_for(unit.id())
                .any(|b| &b.input == input);
            if !bound {
                return Err(TierstackError::UnboundInput {
                    unit: unit.id().clone(),
                    input: input.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Runs after cycle detection, so only acyclic but misordered
/// compositions reach it.
fn check_declaration_order(topology: &Topology) -> Result<()> {
    let pairs = topology
        .bindings()
        .iter()
        .map(|b| (&b.consumer, &b.producer))
        .chain(topology.edges().iter().map(|e| (&e.dependent, &e.dependency)));
    for (from, to) in pairs {
        if topology.position(to) >= topology.position(from) {
            return Err(TierstackError::ForwardReference {
                from: from.clone(),
                to: to.clone(),
            });
        }
    }
    Ok(())
}
