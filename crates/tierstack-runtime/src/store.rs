//! Realized outputs and their persistent state.
//!
//! Maintains a local JSON index of realized units so that separate CLI
//! invocations can realize one unit against units realized earlier.
//! A [`RealizedUnit`] is never edited in place: re-realizing a unit
//! replaces its whole record.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tierstack_common::error::{Result, TierstackError};
use tierstack_common::types::{Region, UnitId};
use tierstack_compose::reference::Attribute;
use tierstack_compose::resolver::ResolvedUnit;

/// A resolved output value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputValue {
    value: String,
    attribute: Option<Attribute>,
}

impl OutputValue {
    /// Creates an output value read from a resource attribute.
    #[must_use]
    pub fn from_attribute(value: impl Into<String>, attribute: Attribute) -> Self {
        Self {
            value: value.into(),
            attribute: Some(attribute),
        }
    }

    /// Creates an output value from a literal.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            attribute: None,
        }
    }

    /// The value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Attribute the value was read from, if any.
    #[must_use]
    pub const fn attribute(&self) -> Option<Attribute> {
        self.attribute
    }
}

/// Record of a fully realized unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealizedUnit {
    id: UnitId,
    region: Region,
    provider: String,
    realized_at: DateTime<Utc>,
    fingerprint: String,
    outputs: BTreeMap<String, OutputValue>,
}

impl RealizedUnit {
    pub(crate) fn new(
        resolved: &ResolvedUnit,
        region: &Region,
        provider: &str,
        outputs: BTreeMap<String, OutputValue>,
    ) -> Result<Self> {
        Ok(Self {
            id: resolved.id.clone(),
            region: region.clone(),
            provider: provider.to_string(),
            realized_at: Utc::now(),
            fingerprint: fingerprint(resolved)?,
            outputs,
        })
    }

    /// Unit identifier.
    #[must_use]
    pub const fn id(&self) -> &UnitId {
        &self.id
    }

    /// Region the unit was realized in.
    #[must_use]
    pub const fn region(&self) -> &Region {
        &self.region
    }

    /// Name of the provider that realized the unit.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// When realization completed.
    #[must_use]
    pub const fn realized_at(&self) -> DateTime<Utc> {
        self.realized_at
    }

    /// SHA-256 of the resolved declaration that was realized.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// All outputs.
    #[must_use]
    pub const fn outputs(&self) -> &BTreeMap<String, OutputValue> {
        &self.outputs
    }

    /// One output by name.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&OutputValue> {
        self.outputs.get(name)
    }
}

/// Computes the SHA-256 fingerprint of a resolved unit.
///
/// # Errors
///
/// Returns an error if the unit cannot be serialized.
pub fn fingerprint(resolved: &ResolvedUnit) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(resolved)?);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Realized units keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputStore {
    units: BTreeMap<UnitId, RealizedUnit>,
}

impl OutputStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the store from disk. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading state index");
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path).map_err(|e| TierstackError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persists the store to disk atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        tracing::debug!(path = %path.display(), units = self.units.len(), "saving state index");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TierstackError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?).map_err(|e| {
            TierstackError::Io {
                path: tmp.clone(),
                source: e,
            }
        })?;
        std::fs::rename(&tmp, path).map_err(|e| TierstackError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Returns whether `unit` has been realized.
    #[must_use]
    pub fn is_realized(&self, unit: &UnitId) -> bool {
        self.units.contains_key(unit)
    }

    /// Record of a realized unit.
    #[must_use]
    pub fn unit(&self, unit: &UnitId) -> Option<&RealizedUnit> {
        self.units.get(unit)
    }

    /// All realized units, ordered by identifier.
    pub fn units(&self) -> impl Iterator<Item = &RealizedUnit> {
        self.units.values()
    }

    /// One output of a realized unit.
    #[must_use]
    pub fn output(&self, unit: &UnitId, output: &str) -> Option<&OutputValue> {
        self.units.get(unit).and_then(|u| u.output(output))
    }

    /// Number of realized units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns whether nothing is realized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Stores a realization record, replacing any earlier one.
    pub(crate) fn record(&mut self, unit: RealizedUnit) {
        let _ = self.units.insert(unit.id.clone(), unit);
    }

    /// Forgets a unit.
    pub(crate) fn remove(&mut self, unit: &UnitId) -> Option<RealizedUnit> {
        self.units.remove(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierstack_compose::reference::Value;
    use tierstack_compose::resource::{LogSink, RemovalPolicy, ResourceBody};
    use tierstack_compose::resolver::resolve_inputs;
    use tierstack_compose::unit::UnitDecl;

    fn resolved() -> ResolvedUnit {
        let unit = UnitDecl::new("logs")
            .resource(
                "sink",
                ResourceBody::LogSink(LogSink {
                    group_name: "app".into(),
                    removal: RemovalPolicy::Destroy,
                }),
            )
            .output("sink", Value::attr("sink", Attribute::Name));
        resolve_inputs(&unit, &BTreeMap::new()).expect("resolve")
    }

    fn realized() -> RealizedUnit {
        let outputs = BTreeMap::from([(
            "sink".to_string(),
            OutputValue::from_attribute("app", Attribute::Name),
        )]);
        RealizedUnit::new(&resolved(), &Region::default(), "local", outputs).expect("record")
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = fingerprint(&resolved()).expect("fingerprint");
        let b = fingerprint(&resolved()).expect("fingerprint");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn record_replaces_whole_unit() {
        let mut store = OutputStore::new();
        store.record(realized());
        assert!(store.is_realized(&UnitId::new("logs")));
        assert_eq!(
            store.output(&UnitId::new("logs"), "sink").map(OutputValue::value),
            Some("app")
        );
        store.record(realized());
        assert_eq!(store.len(), 1);
        assert!(store.remove(&UnitId::new("logs")).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn missing_state_file_is_empty_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = OutputStore::load(&dir.path().join("absent.json")).expect("load");
        assert!(store.is_empty());
    }

    #[test]
    fn state_survives_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.json");
        let mut store = OutputStore::new();
        store.record(realized());
        store.save(&path).expect("save");

        let loaded = OutputStore::load(&path).expect("load");
        assert_eq!(loaded, store);
        let unit = loaded.unit(&UnitId::new("logs")).expect("unit");
        assert_eq!(unit.provider(), "local");
        assert_eq!(unit.region().as_str(), "ap-northeast-1");
        assert_eq!(
            unit.output("sink").and_then(OutputValue::attribute),
            Some(Attribute::Name)
        );
    }

    #[test]
    fn corrupt_state_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").expect("write");
        assert!(OutputStore::load(&path).is_err());
    }
}
