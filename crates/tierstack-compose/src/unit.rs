//! Unit declarations.
//!
//! A unit is an independently realized group of resource specs with named
//! inputs (filled by the composition root from earlier units' outputs) and
//! named outputs (exposed to later units once the unit is realized).

use serde::{Deserialize, Serialize};
use tierstack_common::types::UnitId;

use crate::reference::Value;
use crate::resource::{ResourceBody, ResourceSpec};

/// Declaration of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDecl {
    id: UnitId,
    inputs: Vec<String>,
    resources: Vec<ResourceSpec>,
    outputs: Vec<(String, Value)>,
}

impl UnitDecl {
    /// Starts an empty unit declaration.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: UnitId::new(id),
            inputs: Vec::new(),
            resources: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Declares an input.
    #[must_use]
    pub fn input(mut self, name: &str) -> Self {
        self.inputs.push(name.to_string());
        self
    }

    /// Declares a resource.
    #[must_use]
    pub fn resource(mut self, name: &str, body: ResourceBody) -> Self {
        self.resources.push(ResourceSpec::new(name, body));
        self
    }

    /// Declares an output.
    #[must_use]
    pub fn output(mut self, name: &str, value: Value) -> Self {
        self.outputs.push((name.to_string(), value));
        self
    }

    /// Unit identifier.
    #[must_use]
    pub const fn id(&self) -> &UnitId {
        &self.id
    }

    /// Declared input names, in declaration order.
    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Declared resources, in declaration order.
    #[must_use]
    pub fn resources(&self) -> &[ResourceSpec] {
        &self.resources
    }

    /// Declared outputs, in declaration order.
    #[must_use]
    pub fn outputs(&self) -> &[(String, Value)] {
        &self.outputs
    }

    /// Looks up a resource by logical name.
    #[must_use]
    pub fn resource_named(&self, name: &str) -> Option<&ResourceSpec> {
        self.resources.iter().find(|r| r.name.as_str() == name)
    }

    /// Returns whether the unit declares `input`.
    #[must_use]
    pub fn declares_input(&self, input: &str) -> bool {
        self.inputs.iter().any(|i| i == input)
    }

    /// Returns whether the unit declares output `name`.
    #[must_use]
    pub fn declares_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|(n, _)| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Attribute;
    use crate::resource::{LogSink, RemovalPolicy};

    #[test]
    fn builder_keeps_declaration_order() {
        let unit = UnitDecl::new("logs")
            .input("prefix")
            .resource(
                "a",
                ResourceBody::LogSink(LogSink {
                    group_name: "a".into(),
                    removal: RemovalPolicy::Destroy,
                }),
            )
            .resource(
                "b",
                ResourceBody::LogSink(LogSink {
                    group_name: "b".into(),
                    removal: RemovalPolicy::Retain,
                }),
            )
            .output("a-arn", Value::attr("a", Attribute::Arn));

        assert_eq!(unit.id().as_str(), "logs");
        let names: Vec<&str> = unit.resources().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(unit.declares_input("prefix"));
        assert!(unit.declares_output("a-arn"));
        assert!(!unit.declares_output("b-arn"));
        assert!(unit.resource_named("b").is_some());
        assert!(unit.resource_named("c").is_none());
    }
}
