//! Resource provider abstraction.
//!
//! The provider is the only component that creates, updates or deletes
//! real resources. The engine hands it one unit at a time, with every
//! input already substituted, and records the outputs it returns.

pub mod local;

use std::collections::BTreeMap;

use tierstack_common::error::Result;
use tierstack_common::types::{Region, UnitId};
use tierstack_compose::resolver::ResolvedUnit;

use crate::store::OutputValue;

pub use local::LocalProvider;

/// Realizes and destroys units.
///
/// Implementors must be idempotent per unit (realizing an unchanged unit
/// twice yields the same outputs) and atomic per unit (a failed call
/// leaves nothing observable to dependents).
pub trait ResourceProvider {
    /// Short provider name recorded with every realized unit.
    fn name(&self) -> &str;

    /// Realizes every resource of `unit`, returning its declared outputs.
    ///
    /// # Errors
    ///
    /// Returns [`Provider`](tierstack_common::error::TierstackError::Provider)
    /// naming the failing resource.
    fn realize(
        &mut self,
        region: &Region,
        unit: &ResolvedUnit,
    ) -> Result<BTreeMap<String, OutputValue>>;

    /// Deletes every resource of `unit`. Destroying an unknown unit is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    fn destroy(&mut self, region: &Region, unit: &UnitId) -> Result<()>;
}
