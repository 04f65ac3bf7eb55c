//! Modules: configurable, lockable, memoizing units of computation.
//!
//! A [`Module`] is a cheap, cloneable handle. Clones share one instance, so a
//! module bound as a submodule in several places is configured and cached in
//! one place. Every instance moves through two stages:
//!
//! * **configuring**: inputs and submodule bindings may change;
//! * **locked**: the configuration is frozen, and the module (with every
//!   module it transitively calls) can be run concurrently.
//!
//! Locking is one-way. [`Module::unlocked_copy`] is how a locked module gets
//! re-parameterized.
pub mod builder;
pub mod configuration;
pub mod context;
pub mod execution;
pub mod readiness;

pub use builder::ModuleBuilder;
pub use configuration::{ModuleInput, SubmoduleSlot};
pub use context::RunContext;
pub use readiness::{ModuleStatus, NotReadyReport, Requirement};

use crate::cache::{CacheStats, MemoCache};
use crate::error::{ContractViolation, ModuleError, Result};
use crate::graph::SubmoduleGraph;
use crate::property_type::{FieldList, PropertyTypeInfo};
use crate::value::IntoValue;
use builder::Implementation;
use configuration::{Configuration, LockedConfiguration, Snapshot, Stage};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

static NEXT_MODULE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a module instance. Clones of a handle share it;
/// unlocked copies get a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u64);

impl ModuleId {
    fn next() -> Self {
        ModuleId(NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct ModuleInner {
    id: ModuleId,
    implementation: Arc<Implementation>,
    stage: RwLock<Stage>,
    memoize: AtomicBool,
    cache: MemoCache,
}

#[derive(Clone)]
pub struct Module {
    inner: Arc<ModuleInner>,
}

impl Module {
    pub(crate) fn from_parts(implementation: Arc<Implementation>, config: Configuration, memoize: bool) -> Self {
        Self {
            inner: Arc::new(ModuleInner {
                id: ModuleId::next(),
                implementation,
                stage: RwLock::new(Stage::Configuring(config)),
                memoize: AtomicBool::new(memoize),
                cache: MemoCache::new(),
            }),
        }
    }

    // --- Accessors ---

    pub fn id(&self) -> ModuleId {
        self.inner.id
    }

    /// Name of the implementation, shared by all copies.
    pub fn name(&self) -> &str {
        &self.inner.implementation.name
    }

    pub fn description(&self) -> Option<&str> {
        self.inner.implementation.description.as_deref()
    }

    pub fn has_description(&self) -> bool {
        self.description().is_some()
    }

    pub fn locked(&self) -> bool {
        matches!(*self.read_stage(), Stage::Locked(_))
    }

    pub fn is_memoizable(&self) -> bool {
        self.inner.memoize.load(Ordering::SeqCst)
    }

    /// Current module-level inputs, by name. Call-time slots are not
    /// included; they belong to the property type (see [`PropertyTypeInfo::inputs`]).
    pub fn inputs(&self) -> BTreeMap<String, ModuleInput> {
        self.snapshot().inputs.clone()
    }

    /// Current submodule slots, by role.
    pub fn submods(&self) -> BTreeMap<String, SubmoduleSlot> {
        self.snapshot().submods.clone()
    }

    /// Property types this module can be run as, ordered by name.
    pub fn property_types(&self) -> Vec<PropertyTypeInfo> {
        self.inner.implementation.handlers.iter().map(|h| h.info.clone()).collect()
    }

    pub fn satisfies(&self, property_type: &PropertyTypeInfo) -> bool {
        self.inner.implementation.satisfies(property_type)
    }

    /// Result slots produced when run as `property_type`, if supported.
    /// These are exactly the property type's slots: results are conformed to
    /// them, so a module can not return extra entries.
    pub fn results(&self, property_type: &PropertyTypeInfo) -> Option<FieldList> {
        self.inner
            .implementation
            .handler(property_type)
            .map(|h| h.info.results().clone())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Citations of this module followed by those of its submodules, depth
    /// first in role order. Each module and each citation appears once.
    pub fn citations(&self) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut citations = Vec::new();
        self.collect_citations(&mut visited, &mut citations);
        citations
    }

    fn collect_citations(&self, visited: &mut HashSet<ModuleId>, citations: &mut Vec<String>) {
        if !visited.insert(self.id()) {
            return;
        }
        for citation in &self.inner.implementation.citations {
            if !citations.contains(citation) {
                citations.push(citation.clone());
            }
        }
        let config = self.snapshot();
        for (_, submodule) in config.bound_submodules() {
            submodule.collect_citations(visited, citations);
        }
    }

    // --- State machine ---

    /// Freezes this module and, transitively, every bound submodule.
    /// Idempotent. Fails only if the submodule graph contains a cycle.
    pub fn lock(&self) -> Result<()> {
        SubmoduleGraph::collect(self).check_acyclic()?;
        self.lock_unchecked();
        Ok(())
    }

    /// Callers must have ruled out cycles.
    pub(crate) fn lock_unchecked(&self) -> Arc<LockedConfiguration> {
        if let Snapshot::Frozen(frozen) = self.snapshot() {
            return frozen;
        }
        // Submodules first, so a frozen module never sees an unlocked child.
        for (_, submodule) in self.snapshot().bound_submodules() {
            submodule.lock_unchecked();
        }
        let frozen = {
            let mut stage = self.write_stage();
            let config = match &mut *stage {
                Stage::Locked(frozen) => return Arc::clone(frozen),
                Stage::Configuring(config) => std::mem::take(config),
            };
            let frozen = Arc::new(LockedConfiguration::new(config));
            *stage = Stage::Locked(Arc::clone(&frozen));
            frozen
        };
        debug!(module = %self.name(), id = %self.id(), "locked");
        for (_, submodule) in frozen.config.bound_submodules() {
            submodule.lock_unchecked();
        }
        frozen
    }

    /// Sets the explicit value of input `name`.
    pub fn change_input(&self, name: &str, value: impl IntoValue) -> Result<()> {
        let value = value.into_value();
        let mut stage = self.write_stage();
        let Stage::Configuring(config) = &mut *stage else {
            return Err(self.state_error());
        };
        let input = config.inputs.get_mut(name).ok_or_else(|| ContractViolation::UnknownInput {
            module: self.name().to_string(),
            input: name.to_string(),
        })?;
        if !input.kind().accepts(value.kind()) {
            return Err(ContractViolation::InputKindMismatch {
                module: self.name().to_string(),
                input: name.to_string(),
                expected: input.kind(),
                actual: value.kind(),
            }
            .into());
        }
        trace!(module = %self.name(), input = name, value = %value, "input changed");
        input.set(value);
        Ok(())
    }

    /// Binds `submodule` to `role`. The submodule must satisfy the role's
    /// property type and must not (even transitively) call back into `self`.
    pub fn change_submod(&self, role: &str, submodule: &Module) -> Result<()> {
        let required = {
            let stage = self.read_stage();
            let Stage::Configuring(config) = &*stage else {
                return Err(self.state_error());
            };
            let slot = config.submods.get(role).ok_or_else(|| ContractViolation::UnknownSubmodule {
                module: self.name().to_string(),
                role: role.to_string(),
            })?;
            slot.property_type().clone()
        };
        if !submodule.satisfies(&required) {
            return Err(ContractViolation::UnsupportedPropertyType {
                module: submodule.name().to_string(),
                property_type: required.name().to_string(),
            }
            .into());
        }
        self.check_binding(role, submodule)?;

        let mut stage = self.write_stage();
        let Stage::Configuring(config) = &mut *stage else {
            return Err(self.state_error());
        };
        if let Some(slot) = config.submods.get_mut(role) {
            slot.bind(submodule.clone());
        }
        debug!(module = %self.name(), role, submodule = %submodule.name(), id = %submodule.id(), "submodule bound");
        Ok(())
    }

    /// Rejects a binding of `role` to `candidate` that would close a cycle.
    fn check_binding(&self, role: &str, candidate: &Module) -> Result<()> {
        let mut path = vec![format!("{}.{}", self.name(), role)];
        if candidate.id() == self.id() {
            path.push(self.name().to_string());
            return Err(ModuleError::CyclicDependency { path });
        }
        let graph = SubmoduleGraph::collect(candidate);
        graph.check_acyclic()?;
        match graph.path_between(candidate.id(), self.id()) {
            Some(rest) => {
                path.extend(rest);
                Err(ModuleError::CyclicDependency { path })
            }
            None => Ok(()),
        }
    }

    /// A new, configuring instance of the same implementation with a copy of
    /// this module's inputs and bindings. Bound submodules are shared, not
    /// copied. The copy has its own (empty) cache.
    pub fn unlocked_copy(&self) -> Module {
        let config = Configuration::clone(&self.snapshot());
        Module::from_parts(Arc::clone(&self.inner.implementation), config, self.is_memoizable())
    }

    // --- Memoization ---

    pub fn turn_on_memoization(&self) {
        if !self.inner.memoize.swap(true, Ordering::SeqCst) {
            self.inner.cache.clear();
        }
    }

    pub fn turn_off_memoization(&self) {
        if self.inner.memoize.swap(false, Ordering::SeqCst) {
            self.inner.cache.clear();
        }
    }

    /// Drops every cached result of this instance. Submodule caches are untouched.
    pub fn reset_cache(&self) {
        debug!(module = %self.name(), id = %self.id(), "cache reset");
        self.inner.cache.clear();
    }

    // --- Internals ---

    pub(crate) fn cache(&self) -> &MemoCache {
        &self.inner.cache
    }

    pub(crate) fn implementation(&self) -> &Implementation {
        &self.inner.implementation
    }

    /// Copy of the current configuration that holds no lock.
    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot::of(&self.read_stage())
    }

    fn read_stage(&self) -> RwLockReadGuard<'_, Stage> {
        self.inner.stage.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_stage(&self) -> RwLockWriteGuard<'_, Stage> {
        self.inner.stage.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_error(&self) -> ModuleError {
        ModuleError::State { module: self.name().to_string() }
    }
}

/// Value comparison: lock state, implementation name, description, property
/// types, citations, effective inputs and submodule bindings (by fingerprint).
/// The memoization flag and the cache are not compared.
impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        if self.id() == other.id() {
            return true;
        }
        let (lhs, rhs) = (self.implementation(), other.implementation());
        if self.locked() != other.locked()
            || lhs.name != rhs.name
            || lhs.description != rhs.description
            || self.property_types() != other.property_types()
            || lhs.citations.iter().collect::<BTreeSet<_>>() != rhs.citations.iter().collect::<BTreeSet<_>>()
        {
            return false;
        }

        let (lhs, rhs) = (self.snapshot(), other.snapshot());
        let inputs_match = lhs.inputs.len() == rhs.inputs.len()
            && lhs
                .inputs
                .iter()
                .zip(&rhs.inputs)
                .all(|((a_name, a), (b_name, b))| a_name == b_name && a.value() == b.value());
        let submods_match = lhs.submods.len() == rhs.submods.len()
            && lhs.submods.iter().zip(&rhs.submods).all(|((a_role, a), (b_role, b))| {
                a_role == b_role && a.property_type() == b.property_type() && same_binding(a.bound(), b.bound())
            });
        inputs_match && submods_match
    }
}

fn same_binding(lhs: Option<&Module>, rhs: Option<&Module>) -> bool {
    match (lhs, rhs) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.id() == b.id() || matches!((a.fingerprint(), b.fingerprint()), (Ok(x), Ok(y)) if x == y)
        }
        _ => false,
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("locked", &self.locked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property_type::PropertyType;
    use crate::testing::{
        analysis, counting_energy, prism_volume, rectangle, scaled_rectangle, triangle, Area, EnergyCalc, PrismVolume,
        SomeAnalysis,
    };
    use crate::value::Value;

    #[test]
    fn test_lock_is_monotonic_and_idempotent() {
        let rect = rectangle();
        assert!(!rect.locked());
        rect.lock().unwrap();
        rect.lock().unwrap();
        assert!(rect.locked());
    }

    #[test]
    fn test_only_unlocked_copy_leaves_the_locked_state() {
        let rect = rectangle();
        rect.run_as::<Area>((1.0, 2.0)).unwrap();
        assert!(rect.locked());

        rect.turn_off_memoization();
        rect.turn_on_memoization();
        rect.reset_cache();
        assert!(rect.run_as_bag(&PrismVolume::info(), &crate::ValueBag::new()).is_err());
        assert!(rect.lock().is_ok());
        assert!(rect.locked());
        assert_eq!(rect.status(&Area::info()), ModuleStatus::Locked);

        let copy = rect.unlocked_copy();
        assert!(rect.locked());
        assert!(!copy.locked());
        assert!(matches!(rect.change_input("scale", 1.0), Err(ModuleError::State { .. })));
    }

    fn shape(name: &str) -> ModuleBuilder {
        ModuleBuilder::new(name)
            .description("Area of a shape")
            .citation("Euclid, Elements, Book I")
            .input_default::<f64>("scale", "Scale factor", 1.0)
            .satisfies::<Area, _>(|(b, h), ctx| Ok((b * h * ctx.input::<f64>("scale")?,)))
    }

    #[test]
    fn test_comparison_by_value() {
        let lhs = shape("Shape").build().unwrap();
        let rhs = shape("Shape").build().unwrap();
        assert_eq!(lhs, rhs);
        assert_eq!(lhs, lhs.clone());

        assert_ne!(lhs, shape("Other").build().unwrap());
        assert_ne!(lhs, shape("Shape").description("Something else").build().unwrap());
        assert_ne!(lhs, shape("Shape").citation("Archimedes").build().unwrap());
        assert_ne!(
            lhs,
            shape("Shape").satisfies::<PrismVolume, _>(|(b, h, w), _| Ok((b * h * w,))).build().unwrap()
        );

        lhs.change_input("scale", 2.0).unwrap();
        assert_ne!(lhs, rhs);
        rhs.change_input("scale", 2.0).unwrap();
        assert_eq!(lhs, rhs);

        // Memoization and cache contents do not take part.
        rhs.turn_off_memoization();
        lhs.lock().unwrap();
        assert_ne!(lhs, rhs);
        rhs.lock().unwrap();
        assert_eq!(lhs, rhs);
        lhs.run_as::<Area>((1.0, 1.0)).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_comparison_of_submodule_bindings() {
        let lhs = prism_volume();
        let rhs = prism_volume();
        assert_eq!(lhs, rhs);

        lhs.change_submod("area", &rectangle()).unwrap();
        assert_ne!(lhs, rhs);
        rhs.change_submod("area", &triangle()).unwrap();
        assert_ne!(lhs, rhs);
        rhs.change_submod("area", &rectangle()).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_inputs_and_results_follow_their_owners() {
        let prism = prism_volume();
        assert!(prism.inputs().is_empty());
        assert_eq!(PrismVolume::info().inputs().len(), 3);
        assert_eq!(prism.results(&PrismVolume::info()).as_ref(), Some(PrismVolume::info().results()));

        assert!(scaled_rectangle().inputs().contains_key("scale"));
    }

    #[test]
    fn test_locked_module_rejects_mutation() {
        let prism = prism_volume();
        let rect = rectangle();
        prism.lock().unwrap();
        assert_eq!(
            prism.change_submod("area", &rect).unwrap_err(),
            ModuleError::State { module: "PrismVolumeBySubmod".into() }
        );

        let scaled = scaled_rectangle();
        scaled.lock().unwrap();
        assert!(matches!(scaled.change_input("scale", 2.0), Err(ModuleError::State { .. })));
    }

    #[test]
    fn test_lock_reaches_bound_submodules() {
        let prism = prism_volume();
        let rect = rectangle();
        prism.change_submod("area", &rect).unwrap();
        prism.lock().unwrap();
        assert!(rect.locked());
    }

    #[test]
    fn test_change_input_validates_name_and_kind() {
        let sq = scaled_rectangle();
        assert!(matches!(
            sq.change_input("nope", 1.0),
            Err(ModuleError::Contract(ContractViolation::UnknownInput { .. }))
        ));
        assert!(matches!(
            sq.change_input("scale", "big"),
            Err(ModuleError::Contract(ContractViolation::InputKindMismatch { .. }))
        ));
        sq.change_input("scale", 3.0).unwrap();
        assert_eq!(sq.inputs()["scale"].value(), Some(&Value::Float(3.0)));
    }

    #[test]
    fn test_change_submod_checks_role_and_property_type() {
        let prism = prism_volume();
        assert!(matches!(
            prism.change_submod("volume", &rectangle()),
            Err(ModuleError::Contract(ContractViolation::UnknownSubmodule { .. }))
        ));
        assert!(matches!(
            prism.change_submod("area", &prism_volume()),
            Err(ModuleError::Contract(ContractViolation::UnsupportedPropertyType { .. }))
        ));
    }

    #[test]
    fn test_self_binding_is_a_cycle() {
        let a = analysis();
        let err = a.change_submod("energy", &a).unwrap_err();
        assert_eq!(
            err,
            ModuleError::CyclicDependency { path: vec!["Analysis.energy".into(), "Analysis".into()] }
        );
        assert!(a.submods()["energy"].bound().is_none());
    }

    #[test]
    fn test_transitive_cycle_is_rejected() {
        let outer = analysis();
        let inner = analysis();
        outer.change_submod("energy", &inner).unwrap();
        let err = inner.change_submod("energy", &outer).unwrap_err();
        assert_eq!(
            err,
            ModuleError::CyclicDependency {
                path: vec!["Analysis.energy".into(), "Analysis.energy".into(), "Analysis".into()]
            }
        );
    }

    #[test]
    fn test_unlocked_copy_is_a_fresh_configuring_instance() {
        let (energy, _) = counting_energy();
        let a = analysis();
        a.change_submod("energy", &energy).unwrap();
        a.lock().unwrap();

        let copy = a.unlocked_copy();
        assert!(!copy.locked());
        assert_ne!(copy.id(), a.id());
        assert_eq!(copy.name(), a.name());
        assert_eq!(copy.is_memoizable(), a.is_memoizable());
        assert_eq!(copy.submods()["energy"].bound().map(Module::id), Some(energy.id()));
        assert_eq!(copy.ready(&SomeAnalysis::info()), a.ready(&SomeAnalysis::info()));

        let (other, _) = counting_energy();
        copy.change_submod("energy", &other).unwrap();
        assert_eq!(a.submods()["energy"].bound().map(Module::id), Some(energy.id()));
    }

    #[test]
    fn test_memoization_toggles_clear_the_cache() {
        let rect = rectangle();
        rect.run_as::<Area>((1.0, 2.0)).unwrap();
        assert_eq!(rect.cache_stats().entries, 1);

        rect.turn_on_memoization();
        assert_eq!(rect.cache_stats().entries, 1);

        rect.turn_off_memoization();
        assert!(!rect.is_memoizable());
        assert_eq!(rect.cache_stats().entries, 0);
        rect.run_as::<Area>((1.0, 2.0)).unwrap();
        assert_eq!(rect.cache_stats().entries, 0);
    }

    #[test]
    fn test_accessors() {
        let prism = prism_volume();
        assert_eq!(prism.name(), "PrismVolumeBySubmod");
        assert!(prism.has_description());
        assert!(prism.satisfies(&PrismVolume::info()));
        assert!(!prism.satisfies(&EnergyCalc::info()));
        assert_eq!(
            prism.results(&PrismVolume::info()).map(|f| f.names().map(str::to_string).collect::<Vec<_>>()),
            Some(vec!["volume".to_string()])
        );
        assert!(prism.results(&Area::info()).is_none());
        assert!(format!("{:?}", prism).contains("PrismVolumeBySubmod"));
    }

    #[test]
    fn test_citations_are_collected_depth_first_without_duplicates() {
        let prism = prism_volume();
        let rect = rectangle();
        prism.change_submod("area", &rect).unwrap();
        assert_eq!(
            prism.citations(),
            vec!["Euclid, Elements, Book XI".to_string(), "Euclid, Elements, Book I".to_string()]
        );
    }
}
