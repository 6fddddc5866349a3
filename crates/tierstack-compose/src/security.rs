//! Security boundaries: named, referenceable sets of ingress rules.

use serde::{Deserialize, Serialize};

use crate::reference::Value;

/// Source of inbound traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Peer {
    /// Any IPv4 address.
    AnyIpv4,
    /// An address range, usually a network boundary's `cidr_block`.
    Cidr(Value),
    /// Members of another security boundary, by identity.
    Boundary(Value),
}

/// Port predicate of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortRange {
    /// A single TCP port.
    Tcp(u16),
    /// Every TCP port.
    AllTcp,
}

impl PortRange {
    /// Returns whether `port` is admitted.
    #[must_use]
    pub const fn admits(&self, port: u16) -> bool {
        match self {
            Self::Tcp(p) => *p == port,
            Self::AllTcp => true,
        }
    }
}

/// One ingress rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    /// Traffic source.
    pub peer: Peer,
    /// Admitted ports.
    pub ports: PortRange,
}

/// A security boundary declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityBoundary {
    /// Provider-visible group name.
    pub group_name: String,
    /// Owning network boundary.
    pub network: Value,
    /// Whether all outbound traffic is allowed.
    pub allow_all_outbound: bool,
    /// Inbound rules.
    pub ingress: Vec<IngressRule>,
}

impl SecurityBoundary {
    /// Creates a boundary with no ingress rules and open egress.
    #[must_use]
    pub fn new(group_name: impl Into<String>, network: Value) -> Self {
        Self {
            group_name: group_name.into(),
            network,
            allow_all_outbound: true,
            ingress: Vec::new(),
        }
    }

    /// Adds an ingress rule.
    #[must_use]
    pub fn allow(mut self, peer: Peer, ports: PortRange) -> Self {
        self.ingress.push(IngressRule { peer, ports });
        self
    }

    /// Returns whether any rule admits traffic from the whole internet.
    #[must_use]
    pub fn admits_internet(&self) -> bool {
        self.ingress.iter().any(|r| r.peer == Peer::AnyIpv4)
    }

    /// Returns whether every rule admits traffic only from `boundary`.
    #[must_use]
    pub fn admits_only_boundary(&self, boundary: &Value) -> bool {
        !self.ingress.is_empty()
            && self
                .ingress
                .iter()
                .all(|r| matches!(&r.peer, Peer::Boundary(b) if b == boundary))
    }

    pub(crate) fn values(&self) -> Vec<&Value> {
        let mut values = vec![&self.network];
        for rule in &self.ingress {
            match &rule.peer {
                Peer::Cidr(v) | Peer::Boundary(v) => values.push(v),
                Peer::AnyIpv4 => {}
            }
        }
        values
    }

    pub(crate) fn values_mut(&mut self) -> Vec<&mut Value> {
        let mut values = vec![&mut self.network];
        for rule in &mut self.ingress {
            match &mut rule.peer {
                Peer::Cidr(v) | Peer::Boundary(v) => values.push(v),
                Peer::AnyIpv4 => {}
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Attribute;

    #[test]
    fn port_range_admission() {
        assert!(PortRange::Tcp(80).admits(80));
        assert!(!PortRange::Tcp(80).admits(443));
        assert!(PortRange::AllTcp.admits(10000));
    }

    #[test]
    fn boundary_only_rule_detection() {
        let alb = Value::attr("alb-sg", Attribute::Id);
        let sg = SecurityBoundary::new("frontend", Value::attr("vpc", Attribute::Id))
            .allow(Peer::Boundary(alb.clone()), PortRange::AllTcp);
        assert!(sg.admits_only_boundary(&alb));
        assert!(!sg.admits_internet());

        let leaky = sg.allow(Peer::AnyIpv4, PortRange::Tcp(80));
        assert!(!leaky.admits_only_boundary(&alb));
        assert!(leaky.admits_internet());
    }

    #[test]
    fn empty_boundary_admits_nothing() {
        let sg = SecurityBoundary::new("closed", Value::attr("vpc", Attribute::Id));
        assert!(!sg.admits_only_boundary(&Value::literal("sg-1")));
    }

    #[test]
    fn values_include_rule_peers() {
        let sg = SecurityBoundary::new("backend", Value::attr("vpc", Attribute::Id))
            .allow(Peer::Cidr(Value::attr("vpc", Attribute::CidrBlock)), PortRange::AllTcp)
            .allow(Peer::AnyIpv4, PortRange::Tcp(80));
        assert_eq!(sg.values().len(), 2);
    }
}
