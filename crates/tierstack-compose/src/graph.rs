//! Dependency graph management using `petgraph`.
//!
//! The same graph type orders units within a composition and resources
//! within a unit. Nodes are addressed by name; edges point from a
//! dependency to its dependent so that a topological sort yields
//! dependencies first.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use tierstack_common::error::{Result, TierstackError};
use tierstack_common::types::{LogicalName, UnitId};

use crate::resource::ResourceSpec;

/// A named dependency graph.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Label used in cycle errors (`"composition"`, `"unit network"`).
    scope: String,
    /// Internal petgraph representation.
    graph: petgraph::Graph<String, ()>,
    /// Name to node lookup.
    nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            graph: petgraph::Graph::new(),
            nodes: HashMap::new(),
        }
    }

    /// Adds a node, returning the existing index if the name is known.
    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        let _ = self.nodes.insert(name.to_string(), idx);
        idx
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// Missing nodes are created. Repeated edges are stored once.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) {
        let dependent = self.add_node(dependent);
        let dependency = self.add_node(dependency);
        let _ = self.graph.update_edge(dependency, dependent, ());
    }

    /// Number of nodes in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns a topological ordering, dependencies first.
    ///
    /// # Errors
    ///
    /// Returns [`TierstackError::CyclicDependency`] naming every node that
    /// sits on a cycle.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(_cycle) => Err(TierstackError::CyclicDependency {
                scope: self.scope.clone(),
                members: self.cycle_members(),
            }),
        }
    }

    fn cycle_members(&self) -> Vec<String> {
        let mut members: Vec<String> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0])
            })
            .flatten()
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect();
        members.sort();
        members
    }
}

/// Orders the resources of one unit by their same-unit references.
///
/// References to undeclared resources are ignored here; the validator
/// reports them.
///
/// # Errors
///
/// Returns [`TierstackError::CyclicDependency`] scoped to the unit when
/// the references form a cycle.
pub fn resource_order(unit: &UnitId, resources: &[ResourceSpec]) -> Result<Vec<LogicalName>> {
    let mut graph = DependencyGraph::new(format!("unit {unit}"));
    for spec in resources {
        let _ = graph.add_node(spec.name.as_str());
    }
    for spec in resources {
        for dep in spec.local_dependencies() {
            if resources.iter().any(|r| &r.name == dep) {
                graph.add_dependency(spec.name.as_str(), dep.as_str());
            }
        }
    }
    Ok(graph
        .resolve_order()?
        .into_iter()
        .map(LogicalName::new)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph_resolves_to_empty() {
        let graph = DependencyGraph::new("test");
        let order = graph.resolve_order().expect("should resolve");
        assert!(order.is_empty());
        assert!(graph.is_empty());
    }

    #[test]
    fn add_node_is_idempotent() {
        let mut graph = DependencyGraph::new("test");
        let a = graph.add_node("network");
        let b = graph.add_node("network");
        assert_eq!(a, b);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn linear_dependency_chain() {
        let mut graph = DependencyGraph::new("composition");
        graph.add_dependency("frontend", "backend");
        graph.add_dependency("backend", "network");

        let order = graph.resolve_order().expect("should resolve");
        assert_eq!(order, vec!["network", "backend", "frontend"]);
    }

    #[test]
    fn repeated_edges_are_collapsed() {
        let mut graph = DependencyGraph::new("composition");
        graph.add_dependency("frontend", "network");
        graph.add_dependency("frontend", "network");
        assert_eq!(graph.graph.edge_count(), 1);
    }

    #[test]
    fn diamond_dependency() {
        let mut graph = DependencyGraph::new("unit network");
        graph.add_dependency("listener", "alb");
        graph.add_dependency("alb", "alb-sg");
        graph.add_dependency("alb", "vpc");
        graph.add_dependency("alb-sg", "vpc");

        let order = graph.resolve_order().expect("should resolve");
        let pos = |name: &str| order.iter().position(|n| n == name).expect(name);
        assert!(pos("vpc") < pos("alb-sg"));
        assert!(pos("alb-sg") < pos("alb"));
        assert!(pos("alb") < pos("listener"));
    }

    #[test]
    fn cycle_detection_names_members_and_scope() {
        let mut graph = DependencyGraph::new("unit network");
        graph.add_dependency("a", "b");
        graph.add_dependency("b", "a");
        graph.add_dependency("c", "a");

        let err = graph.resolve_order().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("cyclic"), "got: {msg}");
        assert!(msg.contains("unit network"), "got: {msg}");
        match err {
            TierstackError::CyclicDependency { members, .. } => assert_eq!(members, vec!["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut graph = DependencyGraph::new("unit backend");
        graph.add_dependency("service", "service");
        let err = graph.resolve_order().unwrap_err();
        assert!(matches!(
            err,
            TierstackError::CyclicDependency { ref members, .. } if members == &["service"]
        ));
    }

    #[test]
    fn resources_are_ordered_by_references() {
        use crate::reference::{Attribute, Value};
        use crate::resource::{Cluster, NetworkBoundary, ResourceBody};

        let resources = vec![
            ResourceSpec::new(
                "cluster",
                ResourceBody::Cluster(Cluster {
                    network: Value::attr("vpc", Attribute::Id),
                }),
            ),
            ResourceSpec::new(
                "vpc",
                ResourceBody::Network(NetworkBoundary {
                    cidr: tierstack_common::types::Cidr::parse("10.0.0.0/16").expect("cidr"),
                    enable_dns_hostnames: true,
                    enable_dns_support: true,
                    tags: std::collections::BTreeMap::new(),
                }),
            ),
        ];
        let order = resource_order(&UnitId::new("network"), &resources).expect("should order");
        let names: Vec<&str> = order.iter().map(LogicalName::as_str).collect();
        assert_eq!(names, vec!["vpc", "cluster"]);
    }
}
