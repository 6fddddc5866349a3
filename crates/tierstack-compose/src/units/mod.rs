//! The three unit declarations and the composition root that wires them.

pub mod backend;
pub mod frontend;
pub mod network;

use tierstack_common::config::ServiceContract;

use crate::topology::Topology;

/// Identifier of the network and shared-resource unit.
pub const NETWORK: &str = "network";
/// Identifier of the backend service unit.
pub const BACKEND: &str = "backend";
/// Identifier of the frontend service unit.
pub const FRONTEND: &str = "frontend";

/// Builds the two-tier topology.
///
/// Every unit input is bound to the output that produces it. On top of the
/// bindings, explicit edges require the network unit to complete before
/// the backend starts, and the backend to complete before the frontend
/// starts.
#[must_use]
pub fn two_tier(contract: &ServiceContract) -> Topology {
    use backend::inputs as be;
    use frontend::inputs as fe;
    use network::outputs as net;

    Topology::new()
        .with_unit(network::declare(contract))
        .with_unit(backend::declare(contract))
        .with_unit(frontend::declare(contract))
        .bind(BACKEND, be::CLUSTER, NETWORK, net::CLUSTER)
        .bind(BACKEND, be::BACKEND_SG, NETWORK, net::BACKEND_SG)
        .bind(BACKEND, be::TASK_ROLE, NETWORK, net::BACKEND_TASK_ROLE)
        .bind(BACKEND, be::EXECUTION_ROLE, NETWORK, net::TASK_EXECUTION_ROLE)
        .bind(BACKEND, be::LOG_SINK, NETWORK, net::BACKEND_LOGS)
        .bind(BACKEND, be::TABLE_NAME, NETWORK, net::TABLE_NAME)
        .bind(BACKEND, be::NAMESPACE, NETWORK, net::NAMESPACE)
        .bind(FRONTEND, fe::CLUSTER, NETWORK, net::CLUSTER)
        .bind(FRONTEND, fe::VPC, NETWORK, net::VPC)
        .bind(FRONTEND, fe::TARGET_GROUP, NETWORK, net::TARGET_GROUP)
        .bind(FRONTEND, fe::FRONTEND_SG, NETWORK, net::FRONTEND_SG)
        .bind(FRONTEND, fe::TASK_ROLE, NETWORK, net::FRONTEND_TASK_ROLE)
        .bind(FRONTEND, fe::EXECUTION_ROLE, NETWORK, net::TASK_EXECUTION_ROLE)
        .bind(FRONTEND, fe::LOG_SINK, NETWORK, net::FRONTEND_LOGS)
        .bind(FRONTEND, fe::NAMESPACE, NETWORK, net::NAMESPACE)
        .bind(FRONTEND, fe::NAMESPACE_NAME, NETWORK, net::NAMESPACE_NAME)
        .bind(
            FRONTEND,
            fe::BACKEND_SERVICE_NAME,
            BACKEND,
            backend::SERVICE_NAME_OUTPUT,
        )
        .after(BACKEND, NETWORK)
        .after(FRONTEND, BACKEND)
}

#[cfg(test)]
mod tests {
    use tierstack_common::types::UnitId;

    use super::*;
    use crate::validator::validate;

    #[test]
    fn two_tier_topology_validates() {
        validate(&two_tier(&ServiceContract::default())).expect("topology should validate");
    }

    #[test]
    fn realization_order_is_network_backend_frontend() {
        let order = two_tier(&ServiceContract::default())
            .realization_order()
            .expect("should order");
        let ids: Vec<&str> = order.iter().map(UnitId::as_str).collect();
        assert_eq!(ids, vec![NETWORK, BACKEND, FRONTEND]);
    }

    #[test]
    fn frontend_waits_for_backend_even_without_bindings() {
        let topo = two_tier(&ServiceContract::default());
        let deps = topo.dependencies_of(&UnitId::new(FRONTEND));
        assert_eq!(deps, vec![UnitId::new(BACKEND), UnitId::new(NETWORK)]);
        let explicit: Vec<(&str, &str)> = topo
            .edges()
            .iter()
            .map(|e| (e.dependent.as_str(), e.dependency.as_str()))
            .collect();
        assert_eq!(explicit, vec![(BACKEND, NETWORK), (FRONTEND, BACKEND)]);
    }

    #[test]
    fn backend_reads_network_outputs_only() {
        let topo = two_tier(&ServiceContract::default());
        let backend = UnitId::new(BACKEND);
        assert!(topo.bindings_for(&backend).all(|b| b.producer.as_str() == NETWORK));
        assert_eq!(topo.bindings_for(&backend).count(), 7);
    }

    #[test]
    fn frontend_reads_exactly_one_backend_output() {
        let topo = two_tier(&ServiceContract::default());
        let frontend = UnitId::new(FRONTEND);
        let from_backend: Vec<&str> = topo
            .bindings_for(&frontend)
            .filter(|b| b.producer.as_str() == BACKEND)
            .map(|b| b.output.as_str())
            .collect();
        assert_eq!(from_backend, vec![backend::SERVICE_NAME_OUTPUT]);
    }
}
