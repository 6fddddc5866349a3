//! Network and shared-resource unit.
//!
//! Everything that must exist exactly once lives here: the network
//! boundary, the three security boundaries, the cluster, the discovery
//! namespace, the data store, roles, log sinks and the public load
//! balancer. Other units only ever see this unit's outputs.

use std::collections::BTreeMap;

use tierstack_common::config::ServiceContract;
use tierstack_common::constants::{TASK_EXECUTION_MANAGED_POLICY, TASK_SERVICE_PRINCIPAL};

use crate::iam::{PolicyStatement, Role};
use crate::reference::{Attribute, Value};
use crate::resource::{
    AppProtocol, Cluster, DataStore, DiscoveryNamespace, KeyType, Listener, LoadBalancer,
    LogSink, NetworkBoundary, RemovalPolicy, ResourceBody, SubnetPlacement, TargetGroup,
    TargetHealthCheck,
};
use crate::security::{Peer, PortRange, SecurityBoundary};
use crate::unit::UnitDecl;

/// Output names of the network unit.
pub mod outputs {
    /// Network boundary identity.
    pub const VPC: &str = "vpc";
    /// Compute cluster ARN.
    pub const CLUSTER: &str = "cluster";
    /// Backend tier security boundary identity.
    pub const BACKEND_SG: &str = "backend-sg";
    /// Frontend tier security boundary identity.
    pub const FRONTEND_SG: &str = "frontend-sg";
    /// Discovery namespace identity.
    pub const NAMESPACE: &str = "namespace";
    /// Fully-qualified discovery namespace name.
    pub const NAMESPACE_NAME: &str = "namespace-name";
    /// Data store table name.
    pub const TABLE_NAME: &str = "table-name";
    /// Backend task role ARN.
    pub const BACKEND_TASK_ROLE: &str = "backend-task-role";
    /// Frontend task role ARN.
    pub const FRONTEND_TASK_ROLE: &str = "frontend-task-role";
    /// Shared task-execution role ARN.
    pub const TASK_EXECUTION_ROLE: &str = "task-execution-role";
    /// Backend log sink name.
    pub const BACKEND_LOGS: &str = "backend-logs";
    /// Frontend log sink name.
    pub const FRONTEND_LOGS: &str = "frontend-logs";
    /// Target group ARN.
    pub const TARGET_GROUP: &str = "target-group";
}

/// Actions of the statement shared by both task roles.
const EXEC_ACTIONS: &[&str] = &[
    "ssmmessages:CreateControlChannel",
    "ssmmessages:CreateDataChannel",
    "ssmmessages:OpenControlChannel",
    "ssmmessages:OpenDataChannel",
    "logs:CreateLogStream",
    "logs:DescribeLogGroups",
    "logs:DescribeLogStreams",
    "logs:PutLogEvents",
];

fn exec_statement() -> PolicyStatement {
    PolicyStatement::allow(EXEC_ACTIONS, vec![Value::literal("*")]).with_sid("allowECSExec")
}

fn log_sink(group_name: &str) -> ResourceBody {
    ResourceBody::LogSink(LogSink {
        group_name: group_name.to_string(),
        removal: RemovalPolicy::Destroy,
    })
}

/// Declares the network unit.
#[must_use]
pub fn declare(contract: &ServiceContract) -> UnitDecl {
    let vpc_id = Value::attr("vpc", Attribute::Id);

    let alb_sg = SecurityBoundary::new("ALBSG", vpc_id.clone())
        .allow(Peer::AnyIpv4, PortRange::Tcp(contract.listener_port));
    let backend_sg = SecurityBoundary::new("backendServiceSecurityGroup", vpc_id.clone()).allow(
        Peer::Cidr(Value::attr("vpc", Attribute::CidrBlock)),
        PortRange::AllTcp,
    );
    let frontend_sg = SecurityBoundary::new("frontendServiceSecurityGroup", vpc_id.clone())
        .allow(
            Peer::Boundary(Value::attr("alb-sg", Attribute::Id)),
            PortRange::AllTcp,
        );

    let backend_role = Role::assumed_by(TASK_SERVICE_PRINCIPAL)
        .with_statement(PolicyStatement::allow(
            &["dynamodb:*"],
            vec![Value::attr("table", Attribute::Arn)],
        ))
        .with_statement(exec_statement());
    let frontend_role = Role::assumed_by(TASK_SERVICE_PRINCIPAL).with_statement(exec_statement());
    let execution_role =
        Role::assumed_by(TASK_SERVICE_PRINCIPAL).with_managed_policy(TASK_EXECUTION_MANAGED_POLICY);

    UnitDecl::new(super::NETWORK)
        .resource(
            "vpc",
            ResourceBody::Network(NetworkBoundary {
                cidr: contract.network_cidr,
                enable_dns_hostnames: true,
                enable_dns_support: true,
                tags: BTreeMap::from([("Name".to_string(), contract.network_tag_name.clone())]),
            }),
        )
        .resource(
            "cluster",
            ResourceBody::Cluster(Cluster {
                network: vpc_id.clone(),
            }),
        )
        .resource("alb-sg", ResourceBody::SecurityBoundary(alb_sg))
        .resource("backend-sg", ResourceBody::SecurityBoundary(backend_sg))
        .resource("frontend-sg", ResourceBody::SecurityBoundary(frontend_sg))
        .resource(
            "namespace",
            ResourceBody::DiscoveryNamespace(DiscoveryNamespace {
                namespace_name: contract.namespace_name.clone(),
                network: vpc_id.clone(),
            }),
        )
        .resource(
            "table",
            ResourceBody::DataStore(DataStore {
                table_name: contract.table_name.clone(),
                partition_key: contract.table_partition_key.clone(),
                key_type: KeyType::Number,
                removal: RemovalPolicy::Destroy,
            }),
        )
        .resource("backend-task-role", ResourceBody::Role(backend_role))
        .resource("frontend-task-role", ResourceBody::Role(frontend_role))
        .resource("task-execution-role", ResourceBody::Role(execution_role))
        .resource("backend-logs", log_sink(&contract.backend_log_sink))
        .resource("frontend-logs", log_sink(&contract.frontend_log_sink))
        .resource(
            "alb",
            ResourceBody::LoadBalancer(LoadBalancer {
                network: vpc_id,
                internet_facing: true,
                security_boundary: Value::attr("alb-sg", Attribute::Id),
                subnets: SubnetPlacement::Public,
            }),
        )
        .resource(
            "listener",
            ResourceBody::Listener(Listener {
                load_balancer: Value::attr("alb", Attribute::Arn),
                port: contract.listener_port,
                protocol: AppProtocol::Http,
            }),
        )
        .resource(
            "target-group",
            ResourceBody::TargetGroup(TargetGroup {
                listener: Value::attr("listener", Attribute::Arn),
                port: contract.frontend_port,
                protocol: AppProtocol::Http,
                health_check: TargetHealthCheck {
                    enabled: true,
                    path: contract.health_check_path.clone(),
                    healthy_http_codes: contract.healthy_codes_matcher(),
                },
            }),
        )
        .output(outputs::VPC, Value::attr("vpc", Attribute::Id))
        .output(outputs::CLUSTER, Value::attr("cluster", Attribute::Arn))
        .output(outputs::BACKEND_SG, Value::attr("backend-sg", Attribute::Id))
        .output(outputs::FRONTEND_SG, Value::attr("frontend-sg", Attribute::Id))
        .output(outputs::NAMESPACE, Value::attr("namespace", Attribute::Id))
        .output(outputs::NAMESPACE_NAME, Value::attr("namespace", Attribute::Name))
        .output(outputs::TABLE_NAME, Value::attr("table", Attribute::Name))
        .output(
            outputs::BACKEND_TASK_ROLE,
            Value::attr("backend-task-role", Attribute::Arn),
        )
        .output(
            outputs::FRONTEND_TASK_ROLE,
            Value::attr("frontend-task-role", Attribute::Arn),
        )
        .output(
            outputs::TASK_EXECUTION_ROLE,
            Value::attr("task-execution-role", Attribute::Arn),
        )
        .output(outputs::BACKEND_LOGS, Value::attr("backend-logs", Attribute::Name))
        .output(outputs::FRONTEND_LOGS, Value::attr("frontend-logs", Attribute::Name))
        .output(outputs::TARGET_GROUP, Value::attr("target-group", Attribute::Arn))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tierstack_common::constants::DATA_STORE_ACTION_PREFIX;

    use super::*;
    use crate::resource::ResourceKind;
    use crate::validator::validate_unit;

    fn unit() -> UnitDecl {
        declare(&ServiceContract::default())
    }

    fn role(unit: &UnitDecl, name: &str) -> Role {
        unit.resource_named(name)
            .and_then(|r| r.as_role())
            .cloned()
            .expect("role")
    }

    #[test]
    fn declaration_is_valid() {
        validate_unit(&unit()).expect("network unit should validate");
    }

    #[test]
    fn exactly_one_of_each_shared_resource_type() {
        let unit = unit();
        let mut counts: HashMap<ResourceKind, usize> = HashMap::new();
        for spec in unit.resources() {
            *counts.entry(spec.kind()).or_default() += 1;
        }
        for kind in [
            ResourceKind::Network,
            ResourceKind::Cluster,
            ResourceKind::DataStore,
            ResourceKind::DiscoveryNamespace,
            ResourceKind::LoadBalancer,
            ResourceKind::Listener,
            ResourceKind::TargetGroup,
        ] {
            assert_eq!(counts.get(&kind), Some(&1), "{kind}");
        }
        assert_eq!(counts.get(&ResourceKind::SecurityBoundary), Some(&3));
        assert_eq!(counts.get(&ResourceKind::Role), Some(&3));
        assert_eq!(counts.get(&ResourceKind::LogSink), Some(&2));
        assert_eq!(counts.get(&ResourceKind::Service), None);
    }

    #[test]
    fn frontend_boundary_admits_only_the_load_balancer_boundary() {
        let unit = unit();
        let sg = unit
            .resource_named("frontend-sg")
            .and_then(|r| r.as_security_boundary())
            .expect("frontend-sg");
        assert!(sg.admits_only_boundary(&Value::attr("alb-sg", Attribute::Id)));
        assert!(!sg.admits_internet());
    }

    #[test]
    fn load_balancer_boundary_admits_http_from_anywhere() {
        let unit = unit();
        let sg = unit
            .resource_named("alb-sg")
            .and_then(|r| r.as_security_boundary())
            .expect("alb-sg");
        assert!(sg.admits_internet());
        assert!(sg.ingress.iter().all(|r| r.ports == PortRange::Tcp(80)));
    }

    #[test]
    fn backend_boundary_admits_the_network_range() {
        let unit = unit();
        let sg = unit
            .resource_named("backend-sg")
            .and_then(|r| r.as_security_boundary())
            .expect("backend-sg");
        assert_eq!(sg.ingress.len(), 1);
        assert_eq!(
            sg.ingress[0].peer,
            Peer::Cidr(Value::attr("vpc", Attribute::CidrBlock))
        );
        assert_eq!(sg.ingress[0].ports, PortRange::AllTcp);
    }

    #[test]
    fn only_the_backend_role_reaches_the_data_store() {
        let unit = unit();
        assert!(role(&unit, "backend-task-role").allows_namespace(DATA_STORE_ACTION_PREFIX));
        assert!(!role(&unit, "frontend-task-role").allows_namespace(DATA_STORE_ACTION_PREFIX));
        assert!(!role(&unit, "task-execution-role").allows_namespace(DATA_STORE_ACTION_PREFIX));
    }

    #[test]
    fn task_roles_share_the_exec_statement() {
        let unit = unit();
        for name in ["backend-task-role", "frontend-task-role"] {
            let role = role(&unit, name);
            assert_eq!(role.assumed_by, TASK_SERVICE_PRINCIPAL);
            assert!(role.statements.contains(&exec_statement()), "{name}");
        }
        let execution = role(&unit, "task-execution-role");
        assert_eq!(execution.managed_policies, vec![TASK_EXECUTION_MANAGED_POLICY]);
        assert!(execution.statements.is_empty());
    }

    #[test]
    fn target_group_health_check_is_enabled() {
        let unit = unit();
        let Some(ResourceBody::TargetGroup(tg)) =
            unit.resource_named("target-group").map(|r| &r.body)
        else {
            panic!("target-group missing");
        };
        assert!(tg.health_check.enabled);
        assert_eq!(tg.health_check.path, "/ishealthy");
        assert_eq!(tg.health_check.healthy_http_codes, "200,301");
    }

    #[test]
    fn exposes_every_shared_output() {
        let unit = unit();
        for name in [
            outputs::VPC,
            outputs::CLUSTER,
            outputs::BACKEND_SG,
            outputs::FRONTEND_SG,
            outputs::NAMESPACE,
            outputs::NAMESPACE_NAME,
            outputs::TABLE_NAME,
            outputs::BACKEND_TASK_ROLE,
            outputs::FRONTEND_TASK_ROLE,
            outputs::TASK_EXECUTION_ROLE,
            outputs::BACKEND_LOGS,
            outputs::FRONTEND_LOGS,
            outputs::TARGET_GROUP,
        ] {
            assert!(unit.declares_output(name), "{name}");
        }
        assert!(unit.inputs().is_empty());
    }
}
