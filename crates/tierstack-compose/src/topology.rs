//! Topologies: units, the bindings between them, and explicit ordering edges.

use serde::{Deserialize, Serialize};
use tierstack_common::error::Result;
use tierstack_common::types::UnitId;

use crate::graph::DependencyGraph;
use crate::unit::UnitDecl;

/// Wires a consumer unit's input to a producer unit's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Unit reading the value.
    pub consumer: UnitId,
    /// Input of the consumer.
    pub input: String,
    /// Unit exposing the value.
    pub producer: UnitId,
    /// Output of the producer.
    pub output: String,
}

/// An explicit "realize after" edge that exists independently of bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingEdge {
    /// Unit that must wait.
    pub dependent: UnitId,
    /// Unit that must be fully realized first.
    pub dependency: UnitId,
}

/// A composition of units.
///
/// Units are kept in declaration order; a unit may only read units declared
/// before it. The realization order is derived from bindings and explicit
/// edges, never from declaration order alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    units: Vec<UnitDecl>,
    bindings: Vec<Binding>,
    edges: Vec<OrderingEdge>,
}

impl Topology {
    /// Creates an empty topology.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit.
    #[must_use]
    pub fn with_unit(mut self, unit: UnitDecl) -> Self {
        self.units.push(unit);
        self
    }

    /// Binds `consumer.input` to `producer.output`.
    #[must_use]
    pub fn bind(mut self, consumer: &str, input: &str, producer: &str, output: &str) -> Self {
        self.bindings.push(Binding {
            consumer: UnitId::new(consumer),
            input: input.to_string(),
            producer: UnitId::new(producer),
            output: output.to_string(),
        });
        self
    }

    /// Requires `dependency` to be fully realized before `dependent` starts.
    #[must_use]
    pub fn after(mut self, dependent: &str, dependency: &str) -> Self {
        self.edges.push(OrderingEdge {
            dependent: UnitId::new(dependent),
            dependency: UnitId::new(dependency),
        });
        self
    }

    /// Units in declaration order.
    #[must_use]
    pub fn units(&self) -> &[UnitDecl] {
        &self.units
    }

    /// All bindings.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// All explicit ordering edges.
    #[must_use]
    pub fn edges(&self) -> &[OrderingEdge] {
        &self.edges
    }

    /// Looks up a unit by identifier.
    #[must_use]
    pub fn unit(&self, id: &str) -> Option<&UnitDecl> {
        self.units.iter().find(|u| u.id().as_str() == id)
    }

    /// Position of a unit in declaration order.
    #[must_use]
    pub fn position(&self, id: &UnitId) -> Option<usize> {
        self.units.iter().position(|u| u.id() == id)
    }

    /// Bindings feeding `consumer`'s inputs.
    pub fn bindings_for<'a>(&'a self, consumer: &'a UnitId) -> impl Iterator<Item = &'a Binding> {
        self.bindings.iter().filter(move |b| &b.consumer == consumer)
    }

    /// Units `unit` depends on, through bindings or explicit edges.
    #[must_use]
    pub fn dependencies_of(&self, unit: &UnitId) -> Vec<UnitId> {
        let mut deps: Vec<UnitId> = self
            .bindings_for(unit)
            .map(|b| b.producer.clone())
            .chain(
                self.edges
                    .iter()
                    .filter(|e| &e.dependent == unit)
                    .map(|e| e.dependency.clone()),
            )
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }

    /// Units depending on `unit`, through bindings or explicit edges.
    #[must_use]
    pub fn dependents_of(&self, unit: &UnitId) -> Vec<UnitId> {
        let mut deps: Vec<UnitId> = self
            .bindings
            .iter()
            .filter(|b| &b.producer == unit)
            .map(|b| b.consumer.clone())
            .chain(
                self.edges
                    .iter()
                    .filter(|e| &e.dependency == unit)
                    .map(|e| e.dependent.clone()),
            )
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }

    /// Builds the unit-level dependency graph.
    #[must_use]
    pub fn unit_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new("composition");
        for unit in &self.units {
            let _ = graph.add_node(unit.id().as_str());
        }
        for b in &self.bindings {
            graph.add_dependency(b.consumer.as_str(), b.producer.as_str());
        }
        for e in &self.edges {
            graph.add_dependency(e.dependent.as_str(), e.dependency.as_str());
        }
        graph
    }

    /// Realization order, dependencies first.
    ///
    /// # Errors
    ///
    /// Returns [`CyclicDependency`](tierstack_common::error::TierstackError::CyclicDependency)
    /// when bindings and edges form a cycle.
    pub fn realization_order(&self) -> Result<Vec<UnitId>> {
        Ok(self
            .unit_graph()
            .resolve_order()?
            .into_iter()
            .map(UnitId::new)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Topology {
        Topology::new()
            .with_unit(UnitDecl::new("a").output("x", crate::reference::Value::literal("1")))
            .with_unit(UnitDecl::new("b").input("x"))
            .with_unit(UnitDecl::new("c"))
            .bind("b", "x", "a", "x")
            .after("c", "b")
    }

    #[test]
    fn order_follows_bindings_and_edges() {
        let order = chain().realization_order().expect("should order");
        let ids: Vec<&str> = order.iter().map(UnitId::as_str).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn dependency_queries() {
        let topo = chain();
        assert_eq!(topo.dependencies_of(&UnitId::new("b")), vec![UnitId::new("a")]);
        assert_eq!(topo.dependencies_of(&UnitId::new("c")), vec![UnitId::new("b")]);
        assert!(topo.dependencies_of(&UnitId::new("a")).is_empty());
        assert_eq!(topo.dependents_of(&UnitId::new("a")), vec![UnitId::new("b")]);
        assert!(topo.dependents_of(&UnitId::new("c")).is_empty());
    }

    #[test]
    fn bound_and_explicit_edges_to_same_unit_collapse() {
        let topo = chain().after("b", "a");
        assert_eq!(topo.dependencies_of(&UnitId::new("b")), vec![UnitId::new("a")]);
    }

    #[test]
    fn cross_unit_cycle_is_rejected() {
        let topo = chain().after("a", "c");
        let err = topo.realization_order().unwrap_err();
        assert!(err.to_string().contains("composition"), "got: {err}");
    }

    #[test]
    fn unit_lookup_and_position() {
        let topo = chain();
        assert!(topo.unit("b").is_some());
        assert!(topo.unit("z").is_none());
        assert_eq!(topo.position(&UnitId::new("c")), Some(2));
    }
}
