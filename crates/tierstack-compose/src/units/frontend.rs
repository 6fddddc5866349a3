//! Frontend service unit.

use std::collections::BTreeMap;

use tierstack_common::config::ServiceContract;
use tierstack_common::constants::{ENV_BACKEND_SERVICE_NAME, ENV_SERVICE_DISCOVERY_ENDPOINT};

use crate::reference::Value;
use crate::resource::ResourceBody;
use crate::service::{
    ContainerDefinition, DeployableService, DiscoveryRegistration, DnsRecordType, ImageRef,
    LogConfig, PortMapping, TargetGroupAttachment, TaskDefinition,
};
use crate::unit::UnitDecl;

/// Input names of the frontend unit.
pub mod inputs {
    /// Compute cluster.
    pub const CLUSTER: &str = "cluster";
    /// Network boundary; part of the shared context, unused by resources.
    pub const VPC: &str = "vpc";
    /// Load-balancer target group.
    pub const TARGET_GROUP: &str = "target-group";
    /// Frontend tier security boundary.
    pub const FRONTEND_SG: &str = "frontend-sg";
    /// Frontend task role.
    pub const TASK_ROLE: &str = "task-role";
    /// Shared task-execution role.
    pub const EXECUTION_ROLE: &str = "execution-role";
    /// Frontend log sink.
    pub const LOG_SINK: &str = "log-sink";
    /// Discovery namespace.
    pub const NAMESPACE: &str = "namespace";
    /// Fully-qualified discovery namespace name.
    pub const NAMESPACE_NAME: &str = "namespace-name";
    /// Backend discoverable name.
    pub const BACKEND_SERVICE_NAME: &str = "backend-service-name";
}

/// Declares the frontend unit.
#[must_use]
pub fn declare(contract: &ServiceContract) -> UnitDecl {
    let container = ContainerDefinition {
        name: "frontendContainer".into(),
        image: ImageRef::Asset(contract.frontend_image.clone()),
        environment: BTreeMap::from([
            (
                ENV_BACKEND_SERVICE_NAME.to_string(),
                Value::input(inputs::BACKEND_SERVICE_NAME),
            ),
            (
                ENV_SERVICE_DISCOVERY_ENDPOINT.to_string(),
                Value::input(inputs::NAMESPACE_NAME),
            ),
        ]),
        health_check: None,
        port_mappings: vec![PortMapping::tcp(contract.frontend_port)],
        logging: Some(LogConfig {
            log_sink: Value::input(inputs::LOG_SINK),
            stream_prefix: contract.log_stream_prefix.clone(),
        }),
    };

    let service = DeployableService {
        cluster: Value::input(inputs::CLUSTER),
        desired_count: contract.desired_count,
        assign_public_ip: false,
        enable_execute_command: true,
        security_boundaries: vec![Value::input(inputs::FRONTEND_SG)],
        task: TaskDefinition {
            cpu: contract.task_cpu,
            memory_mib: contract.task_memory_mib,
            execution_role: Value::input(inputs::EXECUTION_ROLE),
            task_role: Value::input(inputs::TASK_ROLE),
            container,
        },
        discovery: Some(DiscoveryRegistration {
            namespace: Value::input(inputs::NAMESPACE),
            name: None,
            record_type: DnsRecordType::A,
            ttl_secs: contract.dns_ttl_secs,
            container_port: contract.frontend_port,
        }),
        load_balancer: Some(TargetGroupAttachment {
            target_group: Value::input(inputs::TARGET_GROUP),
            container_port: contract.frontend_port,
        }),
    };

    UnitDecl::new(super::FRONTEND)
        .input(inputs::CLUSTER)
        .input(inputs::VPC)
        .input(inputs::TARGET_GROUP)
        .input(inputs::FRONTEND_SG)
        .input(inputs::TASK_ROLE)
        .input(inputs::EXECUTION_ROLE)
        .input(inputs::LOG_SINK)
        .input(inputs::NAMESPACE)
        .input(inputs::NAMESPACE_NAME)
        .input(inputs::BACKEND_SERVICE_NAME)
        .resource("service", ResourceBody::Service(Box::new(service)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate_unit;

    fn service() -> DeployableService {
        declare(&ServiceContract::default())
            .resource_named("service")
            .and_then(|r| r.as_service())
            .cloned()
            .expect("service")
    }

    #[test]
    fn declaration_is_valid_and_has_no_outputs() {
        let unit = declare(&ServiceContract::default());
        validate_unit(&unit).expect("frontend unit should validate");
        assert!(unit.outputs().is_empty());
    }

    #[test]
    fn environment_carries_discovery_coordinates() {
        let svc = service();
        let env = &svc.task.container.environment;
        assert_eq!(env.len(), 2);
        assert!(env[ENV_BACKEND_SERVICE_NAME].is_input(inputs::BACKEND_SERVICE_NAME));
        assert!(env[ENV_SERVICE_DISCOVERY_ENDPOINT].is_input(inputs::NAMESPACE_NAME));
    }

    #[test]
    fn attaches_to_target_group_on_container_port() {
        let svc = service();
        let attachment = svc.load_balancer.as_ref().expect("attachment");
        assert!(attachment.target_group.is_input(inputs::TARGET_GROUP));
        assert_eq!(attachment.container_port, 80);
        assert!(svc.exposes(80));
        assert!(svc.task.container.health_check.is_none());
    }

    #[test]
    fn registers_under_default_name() {
        let svc = service();
        let discovery = svc.discovery.as_ref().expect("discovery");
        assert_eq!(discovery.name, None);
        assert_eq!(discovery.record_type, DnsRecordType::A);
        assert_eq!(discovery.ttl_secs, 10);
        assert_eq!(svc.discoverable_name("service"), Some("service"));
    }

    #[test]
    fn vpc_input_is_declared_but_unread() {
        let unit = declare(&ServiceContract::default());
        assert!(unit.declares_input(inputs::VPC));
        let reads_vpc = unit
            .resources()
            .iter()
            .any(|r| r.input_dependencies().contains(&inputs::VPC));
        assert!(!reads_vpc);
    }
}
