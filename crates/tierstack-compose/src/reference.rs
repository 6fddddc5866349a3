//! References and property values.
//!
//! A property that may point at another resource is a [`Value`]: either a
//! literal or a [`Reference`]. References never carry the target's value;
//! they are resolved by the composition root (inputs) or by the resource
//! provider (same-unit attributes).

use std::fmt;

use serde::{Deserialize, Serialize};
use tierstack_common::types::LogicalName;

/// Runtime-produced attribute of a realized resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Provider-assigned identity.
    Id,
    /// Fully-qualified resource name (ARN).
    Arn,
    /// Resource name (declared or generated).
    Name,
    /// Address range of a network boundary.
    CidrBlock,
    /// Public DNS name of a load balancer.
    DnsName,
    /// Name a service is discoverable under in its namespace.
    DiscoveryName,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Id => "id",
            Self::Arn => "arn",
            Self::Name => "name",
            Self::CidrBlock => "cidr_block",
            Self::DnsName => "dns_name",
            Self::DiscoveryName => "discovery_name",
        };
        f.write_str(s)
    }
}

/// Typed pointer from a property to another declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "ref", rename_all = "snake_case")]
pub enum Reference {
    /// An attribute of a resource in the same unit.
    Resource {
        /// Logical name of the target resource.
        name: LogicalName,
        /// Attribute read from the target.
        attribute: Attribute,
    },
    /// A declared input of the unit, bound by the composition root to an
    /// output of an earlier unit.
    Input {
        /// Input name.
        name: String,
    },
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource { name, attribute } => write!(f, "{name}.{attribute}"),
            Self::Input { name } => write!(f, "input:{name}"),
        }
    }
}

/// A property value: literal or reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A concrete value.
    Literal(String),
    /// A value known only after the target is realized.
    Ref(Reference),
}

impl Value {
    /// Creates a literal value.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// References `attribute` of resource `name` in the same unit.
    #[must_use]
    pub fn attr(name: &str, attribute: Attribute) -> Self {
        Self::Ref(Reference::Resource {
            name: LogicalName::new(name),
            attribute,
        })
    }

    /// References a declared unit input.
    #[must_use]
    pub fn input(name: &str) -> Self {
        Self::Ref(Reference::Input {
            name: name.to_string(),
        })
    }

    /// Returns the literal, if this value is resolved.
    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(s) => Some(s),
            Self::Ref(_) => None,
        }
    }

    /// Returns the reference, if this value is unresolved.
    #[must_use]
    pub const fn reference(&self) -> Option<&Reference> {
        match self {
            Self::Literal(_) => None,
            Self::Ref(r) => Some(r),
        }
    }

    /// Returns whether this value reads the named unit input.
    #[must_use]
    pub fn is_input(&self, input: &str) -> bool {
        matches!(self, Self::Ref(Reference::Input { name }) if name == input)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{s}"),
            Self::Ref(r) => write!(f, "${{{r}}}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_display_marks_references() {
        assert_eq!(Value::literal("x").to_string(), "x");
        assert_eq!(
            Value::attr("vpc", Attribute::CidrBlock).to_string(),
            "${vpc.cidr_block}"
        );
        assert_eq!(Value::input("cluster").to_string(), "${input:cluster}");
    }

    #[test]
    fn value_json_shape_distinguishes_literals_and_refs() {
        let json = serde_json::to_value(Value::attr("alb-sg", Attribute::Id)).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"ref": "resource", "name": "alb-sg", "attribute": "id"})
        );
        let json = serde_json::to_value(Value::literal("80")).expect("serialize");
        assert_eq!(json, serde_json::json!("80"));
    }

    #[test]
    fn is_input_matches_only_named_input() {
        let v = Value::input("namespace");
        assert!(v.is_input("namespace"));
        assert!(!v.is_input("cluster"));
        assert!(!Value::literal("namespace").is_input("namespace"));
    }
}
