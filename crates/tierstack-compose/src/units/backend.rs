//! Backend service unit.

use std::collections::BTreeMap;

use tierstack_common::config::ServiceContract;
use tierstack_common::constants::ENV_TABLE_NAME;

use crate::reference::{Attribute, Value};
use crate::resource::ResourceBody;
use crate::service::{
    ContainerDefinition, DeployableService, DiscoveryRegistration, DnsRecordType, HealthCheck,
    ImageRef, LogConfig, PortMapping, TaskDefinition,
};
use crate::unit::UnitDecl;

/// Input names of the backend unit.
pub mod inputs {
    /// Compute cluster.
    pub const CLUSTER: &str = "cluster";
    /// Backend tier security boundary.
    pub const BACKEND_SG: &str = "backend-sg";
    /// Backend task role.
    pub const TASK_ROLE: &str = "task-role";
    /// Shared task-execution role.
    pub const EXECUTION_ROLE: &str = "execution-role";
    /// Backend log sink.
    pub const LOG_SINK: &str = "log-sink";
    /// Data store table name.
    pub const TABLE_NAME: &str = "table-name";
    /// Discovery namespace.
    pub const NAMESPACE: &str = "namespace";
}

/// The backend's single output: the name it is discoverable under.
pub const SERVICE_NAME_OUTPUT: &str = "service-name";

/// Declares the backend unit.
#[must_use]
pub fn declare(contract: &ServiceContract) -> UnitDecl {
    let container = ContainerDefinition {
        name: "backendContainer".into(),
        image: ImageRef::Asset(contract.backend_image.clone()),
        environment: BTreeMap::from([(
            ENV_TABLE_NAME.to_string(),
            Value::input(inputs::TABLE_NAME),
        )]),
        health_check: Some(HealthCheck::http_probe(
            contract.backend_port,
            &contract.health_check_path,
            &contract.health_check,
        )),
        port_mappings: vec![PortMapping::tcp(contract.backend_port)],
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
        security_boundaries: vec![Value::input(inputs::BACKEND_SG)],
        task: TaskDefinition {
            cpu: contract.task_cpu,
            memory_mib: contract.task_memory_mib,
            execution_role: Value::input(inputs::EXECUTION_ROLE),
            task_role: Value::input(inputs::TASK_ROLE),
            container,
        },
        discovery: Some(DiscoveryRegistration {
            namespace: Value::input(inputs::NAMESPACE),
            name: Some(contract.backend_service_name.clone()),
            record_type: DnsRecordType::A,
            ttl_secs: contract.dns_ttl_secs,
            container_port: contract.backend_port,
        }),
        load_balancer: None,
    };

    UnitDecl::new(super::BACKEND)
        .input(inputs::CLUSTER)
        .input(inputs::BACKEND_SG)
        .input(inputs::TASK_ROLE)
        .input(inputs::EXECUTION_ROLE)
        .input(inputs::LOG_SINK)
        .input(inputs::TABLE_NAME)
        .input(inputs::NAMESPACE)
        .resource("service", ResourceBody::Service(Box::new(service)))
        .output(
            SERVICE_NAME_OUTPUT,
            Value::attr("service", Attribute::DiscoveryName),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate_unit;

    fn service(unit: &UnitDecl) -> DeployableService {
        unit.resource_named("service")
            .and_then(|r| r.as_service())
            .cloned()
            .expect("service")
    }

    #[test]
    fn declaration_is_valid() {
        validate_unit(&declare(&ServiceContract::default())).expect("backend unit should validate");
    }

    #[test]
    fn exposes_exactly_the_discoverable_name() {
        let unit = declare(&ServiceContract::default());
        assert_eq!(unit.outputs().len(), 1);
        assert_eq!(
            unit.outputs()[0],
            (
                SERVICE_NAME_OUTPUT.to_string(),
                Value::attr("service", Attribute::DiscoveryName)
            )
        );
    }

    #[test]
    fn registers_a_record_with_short_ttl() {
        let svc = service(&declare(&ServiceContract::default()));
        let discovery = svc.discovery.as_ref().expect("discovery");
        assert_eq!(discovery.record_type, DnsRecordType::A);
        assert_eq!(discovery.ttl_secs, 10);
        assert_eq!(discovery.container_port, 10000);
        assert_eq!(svc.discoverable_name("service"), Some("backend"));
        assert!(svc.load_balancer.is_none());
    }

    #[test]
    fn container_reads_table_name_and_probes_health() {
        let svc = service(&declare(&ServiceContract::default()));
        let container = &svc.task.container;
        assert_eq!(
            container.environment.get(ENV_TABLE_NAME),
            Some(&Value::input(inputs::TABLE_NAME))
        );
        assert_eq!(container.port_mappings, vec![PortMapping::tcp(10000)]);
        let check = container.health_check.as_ref().expect("health check");
        assert!(check.command[1].contains("localhost:10000/ishealthy"));
        assert!(!svc.assign_public_ip);
        assert!(svc.enable_execute_command);
        assert_eq!(svc.desired_count, 1);
    }

    #[test]
    fn contract_changes_flow_into_the_declaration() {
        let contract = ServiceContract {
            backend_port: 8080,
            backend_service_name: "api".into(),
            ..ServiceContract::default()
        };
        let svc = service(&declare(&contract));
        assert!(svc.exposes(8080));
        assert_eq!(svc.discoverable_name("service"), Some("api"));
        let check = svc.task.container.health_check.as_ref().expect("health check");
        assert!(check.command[1].contains("localhost:8080/ishealthy"));
    }
}
