//! Running modules: readiness gate, dispatch and memoization.
use super::builder::Handler;
use super::configuration::{Configuration, LockedConfiguration, Snapshot};
use super::context::RunContext;
use super::Module;
use crate::cache::fingerprint::{call_fingerprint, Fingerprinter};
use crate::cache::{CacheKey, Fingerprint};
use crate::error::{ContractViolation, ModuleError, Result};
use crate::graph::SubmoduleGraph;
use crate::property_type::{PropertyType, PropertyTypeInfo};
use crate::value::ValueBag;
use tracing::{debug, debug_span, trace};

impl Module {
    /// Runs the module as `P` with concrete inputs.
    pub fn run_as<P: PropertyType>(&self, inputs: P::Inputs) -> Result<P::Results> {
        let info = P::info();
        let results = self.run_as_bag(&info, &P::unwrap_inputs(inputs))?;
        P::unwrap_results(&results)
    }

    /// Runs the module as `property_type` with a generic input bag.
    ///
    /// The module (and its submodules) are locked by the first run. With
    /// memoization on, a repeated call with equal inputs on an equal
    /// configuration returns the cached result bag without executing.
    pub fn run_as_bag(&self, property_type: &PropertyTypeInfo, inputs: &ValueBag) -> Result<ValueBag> {
        let span = debug_span!("run", module = %self.name(), property_type = property_type.name());
        let _guard = span.enter();

        SubmoduleGraph::collect(self).check_acyclic()?;
        let report = self.not_ready_unchecked(property_type);
        if !report.is_empty() {
            return Err(ModuleError::NotReady {
                module: self.name().to_string(),
                property_type: property_type.name().to_string(),
                report,
            });
        }
        let handler = self.implementation().handler(property_type).ok_or_else(|| {
            ContractViolation::UnsupportedPropertyType {
                module: self.name().to_string(),
                property_type: property_type.name().to_string(),
            }
        })?;
        let conformed = property_type.conform_inputs(inputs)?;
        let frozen = self.lock_unchecked();
        self.dispatch(handler, &frozen, conformed)
    }

    /// Runs the module as its only property type.
    pub fn run(&self, inputs: &ValueBag) -> Result<ValueBag> {
        match self.implementation().handlers.as_slice() {
            [] => Err(ContractViolation::NoPropertyTypes { module: self.name().to_string() }.into()),
            [only] => self.run_as_bag(&only.info, inputs),
            many => Err(ModuleError::AmbiguousPropertyType {
                module: self.name().to_string(),
                candidates: many.iter().map(|h| h.info.name().to_string()).collect(),
            }),
        }
    }

    /// Content hash of the module's full transitive configuration: its
    /// implementation, effective inputs and bound submodules.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        SubmoduleGraph::collect(self).check_acyclic()?;
        Ok(self.fingerprint_unchecked())
    }

    fn fingerprint_unchecked(&self) -> Fingerprint {
        match self.snapshot() {
            Snapshot::Frozen(frozen) => *frozen.fingerprint.get_or_init(|| self.hash_configuration(&frozen.config)),
            Snapshot::Live(config) => self.hash_configuration(&config),
        }
    }

    fn hash_configuration(&self, config: &Configuration) -> Fingerprint {
        let mut fp = Fingerprinter::new("module");
        fp.write_str(self.name());
        for (name, input) in &config.inputs {
            fp.write_str(name);
            match input.value() {
                Some(value) => {
                    fp.write_tag(1);
                    fp.write_value(value);
                }
                None => fp.write_tag(0),
            }
        }
        for (role, slot) in &config.submods {
            fp.write_str(role);
            fp.write_str(slot.property_type().name());
            match slot.bound() {
                Some(submodule) => {
                    fp.write_tag(1);
                    fp.write_fingerprint(&submodule.fingerprint_unchecked());
                }
                None => fp.write_tag(0),
            }
        }
        fp.finish()
    }

    fn dispatch(&self, handler: &Handler, frozen: &LockedConfiguration, inputs: ValueBag) -> Result<ValueBag> {
        let property_type = &handler.info;
        let key = if self.is_memoizable() {
            let configuration = *frozen.fingerprint.get_or_init(|| self.hash_configuration(&frozen.config));
            let key = CacheKey {
                property_type: property_type.id(),
                fingerprint: call_fingerprint(&configuration, property_type.name(), &inputs),
            };
            if let Some(results) = self.cache().get(&key) {
                debug!(fingerprint = %key.fingerprint.short(), "cache hit");
                return Ok(results);
            }
            trace!(fingerprint = %key.fingerprint.short(), "cache miss");
            Some(key)
        } else {
            None
        };

        let ctx = RunContext::new(self, &frozen.config);
        let results = (handler.call)(&inputs, &ctx)?;
        let results = property_type.conform_results(&results)?;

        if let Some(key) = key {
            if self.is_memoizable() {
                self.cache().insert(key, results.clone());
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        analysis, counting_energy, prism_volume, rectangle, scaled_rectangle, triangle, Area, EnergyCalc, PrismVolume,
        SomeAnalysis,
    };
    use crate::value::Value;
    use crate::ModuleBuilder;
    use rstest::rstest;
    use std::sync::atomic::Ordering;
    use std::thread;

    fn geometry() -> ValueBag {
        ValueBag::new().with("geometry", Value::series(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.74]))
    }

    #[test]
    fn test_not_ready_module_reports_and_does_not_run() {
        let (energy, calls) = counting_energy();
        let a = analysis();
        let err = a.run_as_bag(&SomeAnalysis::info(), &geometry()).unwrap_err();
        match err {
            ModuleError::NotReady { report, .. } => assert_eq!(report, a.list_not_ready(&SomeAnalysis::info())),
            other => panic!("expected NotReady, got {other:?}"),
        }
        assert!(!a.locked());

        a.change_submod("energy", &energy).unwrap();
        assert!(a.ready(&SomeAnalysis::info()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsupported_property_type_is_not_ready() {
        let rect = rectangle();
        let err = rect.run_as_bag(&PrismVolume::info(), &ValueBag::new()).unwrap_err();
        assert!(err.is_recoverable());
        assert!(!rect.locked());
    }

    #[test]
    fn test_energy_scenario_memoizes_whole_call() {
        let (energy, calls) = counting_energy();
        let a = analysis();
        a.change_submod("energy", &energy).unwrap();

        let first = a.run_as_bag(&SomeAnalysis::info(), &geometry()).unwrap();
        assert_eq!(first.names().collect::<Vec<_>>(), vec!["energy"]);
        assert!(a.locked());
        assert!(energy.locked());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let second = a.run_as_bag(&SomeAnalysis::info(), &geometry()).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.cache_stats().hits, 1);
    }

    #[test]
    fn test_reset_cache_forces_one_recomputation() {
        let (energy, calls) = counting_energy();
        let inputs = (vec![0.0, 0.74],);

        let first = energy.run_as::<EnergyCalc>(inputs.clone()).unwrap();
        energy.reset_cache();
        let second = energy.run_as::<EnergyCalc>(inputs.clone()).unwrap();
        let third = energy.run_as::<EnergyCalc>(inputs).unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_memoization_off_always_executes() {
        let (energy, calls) = counting_energy();
        energy.turn_off_memoization();
        energy.run_as::<EnergyCalc>((vec![1.0],)).unwrap();
        energy.run_as::<EnergyCalc>((vec![1.0],)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_different_inputs_miss_the_cache() {
        let (energy, calls) = counting_energy();
        energy.run_as::<EnergyCalc>((vec![1.0],)).unwrap();
        energy.run_as::<EnergyCalc>((vec![2.0],)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(energy.cache_stats().entries, 2);
    }

    #[test]
    fn test_unlocked_copy_has_its_own_cache() {
        let (energy, calls) = counting_energy();
        energy.run_as::<EnergyCalc>((vec![1.0],)).unwrap();

        let copy = energy.unlocked_copy();
        assert_eq!(copy.ready(&EnergyCalc::info()), energy.ready(&EnergyCalc::info()));
        copy.run_as::<EnergyCalc>((vec![1.0],)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(energy.cache_stats().entries, 1);
        assert_eq!(copy.cache_stats().entries, 1);
    }

    #[rstest]
    #[case(1.2, 2.3, 3.4)]
    #[case(1.0, 1.0, 1.0)]
    #[case(0.0, 5.0, 2.0)]
    fn test_prism_volume_over_rectangle(#[case] base: f64, #[case] height: f64, #[case] width: f64) {
        let prism = prism_volume();
        prism.change_submod("area", &rectangle()).unwrap();
        let (volume,) = prism.run_as::<PrismVolume>((base, height, width)).unwrap();
        assert!((volume - base * height * width).abs() < 1e-12);
    }

    #[test]
    fn test_rebinding_a_copy_changes_the_result() {
        let prism = prism_volume();
        prism.change_submod("area", &rectangle()).unwrap();
        let (rect_volume,) = prism.run_as::<PrismVolume>((1.2, 2.3, 3.4)).unwrap();

        let copy = prism.unlocked_copy();
        copy.change_submod("area", &triangle()).unwrap();
        let (tri_volume,) = copy.run_as::<PrismVolume>((1.2, 2.3, 3.4)).unwrap();

        assert!((rect_volume - 1.2 * 2.3 * 3.4).abs() < 1e-12);
        assert!((tri_volume - 0.5 * 1.2 * 2.3 * 3.4).abs() < 1e-12);
        assert_ne!(prism.fingerprint().unwrap(), copy.fingerprint().unwrap());
    }

    #[test]
    fn test_generic_and_typed_runs_agree() {
        let rect = rectangle();
        let bag = rect
            .run_as_bag(&Area::info(), &ValueBag::new().with("base", 2.0).with("height", 3.0))
            .unwrap();
        assert_eq!(bag, ValueBag::new().with("area", 6.0));
        assert_eq!(rect.run_as::<Area>((2.0, 3.0)).unwrap(), (6.0,));
        assert_eq!(rect.cache_stats().hits, 1);
    }

    #[test]
    fn test_bad_call_inputs_are_a_contract_error() {
        let rect = rectangle();
        let err = rect
            .run_as_bag(&Area::info(), &ValueBag::new().with("base", 2.0).with("height", "tall"))
            .unwrap_err();
        assert!(matches!(err, ModuleError::Contract(ContractViolation::KindMismatch { .. })));
    }

    #[test]
    fn test_run_infers_single_property_type() {
        let rect = rectangle();
        let bag = rect.run(&ValueBag::new().with("base", 2.0).with("height", 3.0)).unwrap();
        assert_eq!(bag.get("area"), Some(&Value::Float(6.0)));

        let a = analysis();
        match a.run(&geometry()).unwrap_err() {
            ModuleError::AmbiguousPropertyType { candidates, .. } => {
                assert_eq!(candidates, vec!["EnergyCalc".to_string(), "SomeAnalysis".to_string()])
            }
            other => panic!("expected AmbiguousPropertyType, got {other:?}"),
        }
    }

    #[test]
    fn test_fingerprint_tracks_configuration_content() {
        let a = scaled_rectangle();
        let b = scaled_rectangle();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        b.change_input("scale", 2.0).unwrap();
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        a.change_input("scale", 2.0).unwrap();
        a.lock().unwrap();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_ne!(a.fingerprint().unwrap(), rectangle().fingerprint().unwrap());
    }

    #[test]
    fn test_submodule_inputs_are_part_of_the_fingerprint() {
        let small = scaled_rectangle();
        let large = scaled_rectangle();
        large.change_input("scale", 10.0).unwrap();

        let p = prism_volume();
        let q = prism_volume();
        p.change_submod("area", &small).unwrap();
        q.change_submod("area", &large).unwrap();
        assert_ne!(p.fingerprint().unwrap(), q.fingerprint().unwrap());
    }

    #[test]
    fn test_execution_errors_are_propagated_and_not_cached() {
        let flaky = ModuleBuilder::new("Flaky")
            .satisfies::<Area, _>(|(b, h), ctx| {
                if b < 0.0 {
                    return Err(ctx.fail("negative base"));
                }
                Ok((b * h,))
            })
            .build()
            .unwrap();
        let err = flaky.run_as::<Area>((-1.0, 2.0)).unwrap_err();
        assert_eq!(err, ModuleError::Execution { module: "Flaky".into(), message: "negative base".into() });
        assert!(flaky.cache_stats().entries == 0);
    }

    #[test]
    fn test_locked_module_runs_concurrently() {
        let (energy, calls) = counting_energy();
        let a = analysis();
        a.change_submod("energy", &energy).unwrap();
        a.lock().unwrap();

        let expected = a.run_as_bag(&SomeAnalysis::info(), &geometry()).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let a = a.clone();
                thread::spawn(move || a.run_as_bag(&SomeAnalysis::info(), &geometry()))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), expected);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
