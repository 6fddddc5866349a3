//! Unified error types for the tierstack workspace.
//!
//! Errors fall into three families: declaration errors (detected while
//! validating a topology, before anything is realized), realization errors
//! (reported by the resource provider for one unit), and reference-resolution
//! errors (a unit is realized before the outputs it reads exist).

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Region, UnitId};

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum TierstackError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A textual value could not be parsed.
    #[error("cannot parse \"{input}\" as {expected}")]
    Parse {
        /// The rejected input.
        input: String,
        /// What the input was expected to be.
        expected: &'static str,
    },

    /// Two declarations share a name within the same scope.
    #[error("duplicate {kind} name \"{name}\" in {scope}")]
    DuplicateName {
        /// Kind of the duplicated declaration.
        kind: &'static str,
        /// The duplicated name.
        name: String,
        /// Where the duplicate was found.
        scope: String,
    },

    /// A reference targets a resource or input that is not declared.
    #[error("{unit}/{resource}: reference to undefined {target}")]
    UnknownReference {
        /// Unit owning the referencing resource.
        unit: UnitId,
        /// Logical name of the referencing resource (or output).
        resource: String,
        /// Description of the missing target.
        target: String,
    },

    /// A reference asks for an attribute the target resource does not produce.
    #[error("{unit}/{resource}: {target} has no attribute {attribute}")]
    InvalidAttribute {
        /// Unit owning the referencing resource.
        unit: UnitId,
        /// Logical name of the referencing resource (or output).
        resource: String,
        /// Logical name of the referenced resource.
        target: String,
        /// The requested attribute.
        attribute: String,
    },

    /// A unit is not part of the composition.
    #[error("unit not found: {id}")]
    UnknownUnit {
        /// Identifier of the missing unit.
        id: String,
    },

    /// A declared unit input has no binding in the composition.
    #[error("input \"{input}\" of unit \"{unit}\" is not bound to any output")]
    UnboundInput {
        /// Unit declaring the input.
        unit: UnitId,
        /// Name of the unbound input.
        input: String,
    },

    /// A binding names an output the producing unit does not declare.
    #[error("unit \"{unit}\" declares no output \"{output}\"")]
    UnknownOutput {
        /// Producing unit.
        unit: UnitId,
        /// Missing output name.
        output: String,
    },

    /// A unit reads outputs of a unit that cannot be realized before it.
    #[error("unit \"{from}\" references unit \"{to}\", which is not realized before it")]
    ForwardReference {
        /// The depending unit.
        from: UnitId,
        /// The unit that would have to be realized first.
        to: UnitId,
    },

    /// A resource declaration breaks an invariant of its kind.
    #[error("{unit}/{resource}: {message}")]
    InvalidResource {
        /// Unit owning the resource.
        unit: UnitId,
        /// Logical name of the resource.
        resource: String,
        /// Description of the violated invariant.
        message: String,
    },

    /// The dependency graph contains a cycle.
    #[error("cyclic dependency detected in {scope}: {}", members.join(", "))]
    CyclicDependency {
        /// Graph where the cycle was found (the composition or one unit).
        scope: String,
        /// Nodes that could not be ordered.
        members: Vec<String>,
    },

    /// The resource provider rejected or failed to realize a resource.
    #[error("provider error on {resource}: {message}")]
    Provider {
        /// Logical name of the failing resource.
        resource: String,
        /// Provider-reported reason.
        message: String,
    },

    /// Realizing a unit failed; the unit and its dependents stay unrealized.
    #[error("realization of unit \"{unit}\" failed: {source}")]
    Realization {
        /// The failing unit.
        unit: UnitId,
        /// Underlying provider error.
        source: Box<TierstackError>,
    },

    /// A unit reads an output that does not exist yet.
    #[error("unit \"{consumer}\" requires output \"{output}\" of unit \"{unit}\", which has not been realized")]
    MissingOutput {
        /// Unit that should have produced the output.
        unit: UnitId,
        /// Name of the missing output.
        output: String,
        /// Unit that tried to read it.
        consumer: UnitId,
    },

    /// A unit is realized before one of its dependencies has completed.
    #[error("unit \"{unit}\" cannot be realized before unit \"{dependency}\" has completed")]
    UnrealizedDependency {
        /// Unit being realized.
        unit: UnitId,
        /// Dependency that has not been realized.
        dependency: UnitId,
    },

    /// A unit reads outputs of a unit realized in another region.
    #[error("unit \"{consumer}\" targets {expected} but unit \"{unit}\" was realized in {found}")]
    RegionMismatch {
        /// Dependency realized in the other region.
        unit: UnitId,
        /// Unit being realized.
        consumer: UnitId,
        /// Region requested for the consumer.
        expected: Region,
        /// Region the dependency was realized in.
        found: Region,
    },

    /// A unit cannot be destroyed or changed while a dependent unit is
    /// still realized.
    #[error("unit \"{unit}\" is still referenced by realized unit \"{dependent}\"")]
    DependentStillRealized {
        /// Unit requested for destruction or re-realization.
        unit: UnitId,
        /// Realized unit depending on it.
        dependent: UnitId,
    },

    /// Realization was aborted between units.
    #[error("realization aborted after {} unit(s): [{}]", completed.len(), completed.iter().map(UnitId::as_str).collect::<Vec<_>>().join(", "))]
    Aborted {
        /// Units fully realized before the abort.
        completed: Vec<UnitId>,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML configuration could not be parsed.
    #[error("configuration parse error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl TierstackError {
    /// Returns the unit a realization or ordering error is attributed to.
    #[must_use]
    pub const fn failing_unit(&self) -> Option<&UnitId> {
        match self {
            Self::Realization { unit, .. } | Self::UnrealizedDependency { unit, .. } => Some(unit),
            Self::MissingOutput { consumer, .. } | Self::RegionMismatch { consumer, .. } => {
                Some(consumer)
            }
            _ => None,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TierstackError>;
