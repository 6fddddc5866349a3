//! IAM roles and policy statements.

use serde::{Deserialize, Serialize};

use crate::reference::Value;

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Grants the listed actions.
    Allow,
    /// Denies the listed actions.
    Deny,
}

/// One policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    /// Optional statement identifier.
    pub sid: Option<String>,
    /// Allow or deny.
    pub effect: Effect,
    /// Actions, e.g. `logs:PutLogEvents` or `dynamodb:*`.
    pub actions: Vec<String>,
    /// Resources the actions apply to.
    pub resources: Vec<Value>,
}

impl PolicyStatement {
    /// Creates an allow statement.
    #[must_use]
    pub fn allow(actions: &[&str], resources: Vec<Value>) -> Self {
        Self {
            sid: None,
            effect: Effect::Allow,
            actions: actions.iter().map(ToString::to_string).collect(),
            resources,
        }
    }

    /// Sets the statement identifier.
    #[must_use]
    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }
}

/// A role assumable by a service principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Principal allowed to assume the role.
    pub assumed_by: String,
    /// Managed policy ARNs attached to the role.
    pub managed_policies: Vec<String>,
    /// Inline policy statements.
    pub statements: Vec<PolicyStatement>,
}

impl Role {
    /// Creates a role with no permissions.
    #[must_use]
    pub fn assumed_by(principal: impl Into<String>) -> Self {
        Self {
            assumed_by: principal.into(),
            managed_policies: Vec::new(),
            statements: Vec::new(),
        }
    }

    /// Attaches a managed policy.
    #[must_use]
    pub fn with_managed_policy(mut self, arn: impl Into<String>) -> Self {
        self.managed_policies.push(arn.into());
        self
    }

    /// Adds an inline statement.
    #[must_use]
    pub fn with_statement(mut self, statement: PolicyStatement) -> Self {
        self.statements.push(statement);
        self
    }

    /// Returns whether any allow statement grants an action in `prefix`'s
    /// namespace (e.g. `dynamodb:`), including `*` wildcards.
    #[must_use]
    pub fn allows_namespace(&self, prefix: &str) -> bool {
        self.statements
            .iter()
            .filter(|s| s.effect == Effect::Allow)
            .flat_map(|s| &s.actions)
            .any(|a| a == "*" || a.starts_with(prefix))
    }

    pub(crate) fn values(&self) -> Vec<&Value> {
        self.statements.iter().flat_map(|s| &s.resources).collect()
    }

    pub(crate) fn values_mut(&mut self) -> Vec<&mut Value> {
        self.statements
            .iter_mut()
            .flat_map(|s| &mut s.resources)
            .collect()
    }
}
