//! Runtime engine that realizes topologies unit by unit.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tierstack_common::error::{Result, TierstackError};
use tierstack_common::types::{Region, UnitId};
use tierstack_compose::resolver::{ResolvedUnit, resolve_available, resolve_inputs};
use tierstack_compose::topology::Topology;
use tierstack_compose::validator::validate;

use crate::provider::ResourceProvider;
use crate::store::{OutputStore, RealizedUnit, fingerprint};

/// Coordinates the provider and the output store.
///
/// Units are realized one at a time, in dependency order. A unit is only
/// handed to the provider once every unit it depends on, through bindings
/// or explicit edges, has been fully realized.
pub struct Engine<P> {
    provider: P,
    store: OutputStore,
    abort: Option<Arc<AtomicBool>>,
}

impl<P: ResourceProvider> Engine<P> {
    /// Creates an engine with an empty output store.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self::with_store(provider, OutputStore::new())
    }

    /// Creates an engine over previously realized outputs.
    #[must_use]
    pub const fn with_store(provider: P, store: OutputStore) -> Self {
        Self {
            provider,
            store,
            abort: None,
        }
    }

    /// Installs a flag that stops realization between units once set.
    #[must_use]
    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort = Some(flag);
        self
    }

    /// The provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Mutable access to the provider.
    pub const fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Realized outputs.
    pub const fn store(&self) -> &OutputStore {
        &self.store
    }

    /// Consumes the engine, returning the output store.
    pub fn into_store(self) -> OutputStore {
        self.store
    }

    /// Validates and realizes every unit of `topology` in dependency order.
    ///
    /// Returns the realized units in order. Units realized before a failure
    /// stay realized.
    ///
    /// # Errors
    ///
    /// Returns a declaration error before anything is realized, the first
    /// unit's [`Realization`](TierstackError::Realization) error, or
    /// [`Aborted`](TierstackError::Aborted) if the abort flag was set.
    pub fn realize_topology(&mut self, topology: &Topology, region: &Region) -> Result<Vec<UnitId>> {
        validate(topology)?;
        let order = topology.realization_order()?;
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("realize", %run_id, %region);
        let _guard = span.enter();
        tracing::info!(?order, "realization order resolved");

        let mut completed = Vec::with_capacity(order.len());
        for id in order {
            if self.aborted() {
                tracing::warn!(completed = completed.len(), "realization aborted");
                return Err(TierstackError::Aborted { completed });
            }
            self.realize_validated(topology, &id, region)?;
            completed.push(id);
        }
        tracing::info!(units = completed.len(), "topology realized");
        Ok(completed)
    }

    /// Validates `topology` and realizes one unit of it.
    ///
    /// # Errors
    ///
    /// Returns [`MissingOutput`](TierstackError::MissingOutput) or
    /// [`UnrealizedDependency`](TierstackError::UnrealizedDependency) if a
    /// dependency has not been realized,
    /// [`RegionMismatch`](TierstackError::RegionMismatch) if a dependency
    /// lives in another region,
    /// [`DependentStillRealized`](TierstackError::DependentStillRealized) if
    /// the unit changed while a dependent is realized, or the provider's
    /// error wrapped in [`Realization`](TierstackError::Realization).
    pub fn realize_unit(&mut self, topology: &Topology, id: &UnitId, region: &Region) -> Result<()> {
        validate(topology)?;
        self.realize_validated(topology, id, region)
    }

    /// Resolves a unit's inputs against the output store.
    ///
    /// Every dependency must have been realized in `region`.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit is unknown, a dependency is not
    /// realized, or a dependency was realized in another region.
    pub fn resolve(&self, topology: &Topology, id: &UnitId, region: &Region) -> Result<ResolvedUnit> {
        let unit = topology
            .unit(id.as_str())
            .ok_or_else(|| TierstackError::UnknownUnit { id: id.to_string() })?;

        let mut values = BTreeMap::new();
        for binding in topology.bindings_for(id) {
            let value = self
                .store
                .output(&binding.producer, &binding.output)
                .ok_or_else(|| TierstackError::MissingOutput {
                    unit: binding.producer.clone(),
                    output: binding.output.clone(),
                    consumer: id.clone(),
                })?;
            let _ = values.insert(binding.input.clone(), value.value().to_string());
        }
        for dependency in topology.dependencies_of(id) {
            let Some(realized) = self.store.unit(&dependency) else {
                return Err(TierstackError::UnrealizedDependency {
                    unit: id.clone(),
                    dependency,
                });
            };
            if realized.region() != region {
                return Err(TierstackError::RegionMismatch {
                    unit: dependency,
                    consumer: id.clone(),
                    expected: region.clone(),
                    found: realized.region().clone(),
                });
            }
        }
        resolve_inputs(unit, &values)
    }

    /// Resolves whatever inputs the output store can already supply.
    ///
    /// Inputs whose producer is not realized stay as references.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownUnit`](TierstackError::UnknownUnit) if `id` is not in
    /// the topology.
    pub fn preview(&self, topology: &Topology, id: &UnitId) -> Result<ResolvedUnit> {
        let unit = topology
            .unit(id.as_str())
            .ok_or_else(|| TierstackError::UnknownUnit { id: id.to_string() })?;
        let values: BTreeMap<String, String> = topology
            .bindings_for(id)
            .filter_map(|b| {
                self.store
                    .output(&b.producer, &b.output)
                    .map(|v| (b.input.clone(), v.value().to_string()))
            })
            .collect();
        Ok(resolve_available(unit, &values))
    }

    fn realize_validated(&mut self, topology: &Topology, id: &UnitId, region: &Region) -> Result<()> {
        let resolved = self.resolve(topology, id, region)?;
        self.check_unchanged_while_depended_on(topology, &resolved, region)?;
        tracing::info!(unit = %id, resources = resolved.resources.len(), "realizing unit");

        let outputs = self
            .provider
            .realize(region, &resolved)
            .map_err(|e| realization_error(id, e))?;
        if let Some((name, _)) = resolved
            .outputs
            .iter()
            .find(|(name, _)| !outputs.contains_key(name))
        {
            return Err(realization_error(
                id,
                TierstackError::Provider {
                    resource: format!("output {name}"),
                    message: "provider returned no value".into(),
                },
            ));
        }

        let record = RealizedUnit::new(&resolved, region, self.provider.name(), outputs)?;
        tracing::info!(unit = %id, fingerprint = %record.fingerprint(), "unit realized");
        self.store.record(record);
        Ok(())
    }

    /// Refuses to re-realize a unit whose declaration or region changed
    /// while a unit reading its outputs is still realized.
    fn check_unchanged_while_depended_on(
        &self,
        topology: &Topology,
        resolved: &ResolvedUnit,
        region: &Region,
    ) -> Result<()> {
        let Some(previous) = self.store.unit(&resolved.id) else {
            return Ok(());
        };
        if previous.region() == region && previous.fingerprint() == fingerprint(resolved)? {
            return Ok(());
        }
        match topology
            .dependents_of(&resolved.id)
            .into_iter()
            .find(|d| self.store.is_realized(d))
        {
            Some(dependent) => {
                tracing::warn!(unit = %resolved.id, %dependent, "changed unit still has realized dependents");
                Err(TierstackError::DependentStillRealized {
                    unit: resolved.id.clone(),
                    dependent,
                })
            }
            None => Ok(()),
        }
    }

    /// Destroys every realized unit of `topology`, dependents first.
    ///
    /// Returns the destroyed units in order.
    ///
    /// # Errors
    ///
    /// Returns the first provider error; units destroyed before it stay
    /// destroyed.
    pub fn destroy_topology(&mut self, topology: &Topology, region: &Region) -> Result<Vec<UnitId>> {
        let mut order = topology.realization_order()?;
        order.reverse();
        let mut destroyed = Vec::new();
        for id in order {
            if self.store.is_realized(&id) {
                self.destroy_unit(topology, &id, region)?;
                destroyed.push(id);
            }
        }
        Ok(destroyed)
    }

    /// Destroys one unit.
    ///
    /// # Errors
    ///
    /// Returns [`DependentStillRealized`](TierstackError::DependentStillRealized)
    /// if a unit depending on it is still realized, or the provider's error.
    pub fn destroy_unit(&mut self, topology: &Topology, id: &UnitId, region: &Region) -> Result<()> {
        if topology.unit(id.as_str()).is_none() {
            return Err(TierstackError::UnknownUnit { id: id.to_string() });
        }
        if let Some(dependent) = topology
            .dependents_of(id)
            .into_iter()
            .find(|d| self.store.is_realized(d))
        {
            return Err(TierstackError::DependentStillRealized {
                unit: id.clone(),
                dependent,
            });
        }
        tracing::info!(unit = %id, "destroying unit");
        self.provider
            .destroy(region, id)
            .map_err(|e| realization_error(id, e))?;
        let _ = self.store.remove(id);
        Ok(())
    }

    fn aborted(&self) -> bool {
        self.abort
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

fn realization_error(unit: &UnitId, source: TierstackError) -> TierstackError {
    TierstackError::Realization {
        unit: unit.clone(),
        source: Box::new(source),
    }
}
